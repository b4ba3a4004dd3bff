//! Permission dialog subsystem.
//!
//! Drains the platform's dialog queue, asks for a decision per capability,
//! records it in the grant store and delivers the response to the gate
//! through its single response channel.

use std::sync::{Arc, Mutex, PoisonError};

use dialoguer::Confirm;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use capgate_core::{CapabilityRequest, GrantResult, PermissionGate, RequestToken};

use super::HostError;
use super::grant_store::GrantStore;

/// A queued permission dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    pub token: RequestToken,
    pub capability_ids: Vec<String>,
}

/// How dialogs get answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPolicy {
    /// Ask on the terminal.
    Prompt,
    /// Answer every capability the same way.
    Fixed(bool),
    /// Close the dialog without answering; the response carries no results.
    Dismiss,
}

/// Shows queued dialogs and feeds answers back into the gate.
pub struct DialogHost {
    gate: Arc<PermissionGate>,
    store: Arc<Mutex<GrantStore>>,
    policy: AnswerPolicy,
    requests: mpsc::UnboundedReceiver<DialogRequest>,
}

impl DialogHost {
    pub fn new(
        gate: Arc<PermissionGate>,
        store: Arc<Mutex<GrantStore>>,
        policy: AnswerPolicy,
        requests: mpsc::UnboundedReceiver<DialogRequest>,
    ) -> Self {
        Self {
            gate,
            store,
            policy,
            requests,
        }
    }

    /// Wait for the next dialog and answer it.
    ///
    /// Returns `Ok(None)` when the queue closed, or when the gate ignored the
    /// response. A store write failure is returned after the gate has
    /// already been given the answer.
    pub async fn process_next(&mut self) -> Result<Option<CapabilityRequest>, HostError> {
        let Some(request) = self.requests.recv().await else {
            return Ok(None);
        };
        self.answer(request).await
    }

    /// Answer every dialog already queued, without waiting for new ones.
    pub async fn drain(&mut self) -> Result<Vec<CapabilityRequest>, HostError> {
        let mut resolved = Vec::new();
        loop {
            match self.requests.try_recv() {
                Ok(request) => {
                    if let Some(r) = self.answer(request).await? {
                        resolved.push(r);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(resolved)
    }

    async fn answer(
        &self,
        request: DialogRequest,
    ) -> Result<Option<CapabilityRequest>, HostError> {
        debug!(token = %request.token, capabilities = ?request.capability_ids, "Showing permission dialog");

        let mut results = Vec::with_capacity(request.capability_ids.len());
        if self.policy != AnswerPolicy::Dismiss {
            for capability_id in &request.capability_ids {
                let granted = self.decide(capability_id).await?;
                results.push(GrantResult::new(capability_id.clone(), granted));
            }
        }

        // The gate hears the answer even when it could not be persisted.
        let mut store_error = None;
        {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            for result in &results {
                if let Err(e) = store.set(&result.capability_id, result.granted) {
                    warn!(capability = %result.capability_id, error = %e, "Failed to persist grant decision");
                    store_error.get_or_insert(e);
                }
            }
        }

        if results.is_empty() {
            info!(token = %request.token, "Permission dialog dismissed");
        }
        let resolved = self.gate.handle_response(request.token, &results);
        match store_error {
            Some(e) => Err(e),
            None => Ok(resolved),
        }
    }

    async fn decide(&self, capability_id: &str) -> Result<bool, HostError> {
        match self.policy {
            AnswerPolicy::Fixed(granted) => Ok(granted),
            AnswerPolicy::Dismiss => Ok(false),
            AnswerPolicy::Prompt => {
                let label = self
                    .gate
                    .catalog()
                    .get(capability_id)
                    .map_or(capability_id, |spec| spec.display_label())
                    .to_string();
                let granted = tokio::task::spawn_blocking(move || {
                    Confirm::new()
                        .with_prompt(format!("Allow {label} access?"))
                        .default(false)
                        .interact()
                })
                .await??;
                Ok(granted)
            }
        }
    }
}
