//! Host platform collaborator.
//!
//! The platform owns the permission dialog and the persisted grant store.
//! Responses come back later through [`PermissionGate::handle_response`],
//! which is the single response channel for every request the host issues.
//!
//! [`PermissionGate::handle_response`]: crate::gate::PermissionGate::handle_response

use serde::{Deserialize, Serialize};

use crate::request::RequestToken;

/// Current platform-level grant for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Granted,
    NotGranted,
}

impl From<bool> for GrantStatus {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::NotGranted }
    }
}

/// Host platform permission primitives.
pub trait PermissionPlatform: Send + Sync {
    /// Synchronously read the persisted grant for `capability_id`.
    fn query_grant_status(&self, capability_id: &str) -> GrantStatus;

    /// Ask the user for `capability_ids`.
    ///
    /// Fire-and-forget: the host may answer later through the gate's response
    /// channel, or never.
    fn request_capabilities(&self, capability_ids: &[String], token: RequestToken);
}
