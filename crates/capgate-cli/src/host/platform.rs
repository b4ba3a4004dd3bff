//! Host platform backed by the grant store and a dialog queue.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use capgate_core::{GrantStatus, PermissionPlatform, RequestToken};

use super::dialog::DialogRequest;
use super::grant_store::GrantStore;

/// Answers grant queries from the store and queues permission dialogs.
pub struct SimulatedPlatform {
    store: Arc<Mutex<GrantStore>>,
    dialogs: mpsc::UnboundedSender<DialogRequest>,
}

impl SimulatedPlatform {
    /// Create the platform and the receiving end of its dialog queue.
    pub fn new(store: Arc<Mutex<GrantStore>>) -> (Self, mpsc::UnboundedReceiver<DialogRequest>) {
        let (dialogs, rx) = mpsc::unbounded_channel();
        (Self { store, dialogs }, rx)
    }
}

impl PermissionPlatform for SimulatedPlatform {
    fn query_grant_status(&self, capability_id: &str) -> GrantStatus {
        let granted = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_granted(capability_id);
        debug!(capability_id, granted, "Grant status queried");
        GrantStatus::from(granted)
    }

    fn request_capabilities(&self, capability_ids: &[String], token: RequestToken) {
        let request = DialogRequest {
            token,
            capability_ids: capability_ids.to_vec(),
        };
        // No dialog subsystem left: the request stays unresolved.
        if self.dialogs.send(request).is_err() {
            warn!(%token, "Permission dialog queue closed; request will not be answered");
        }
    }
}
