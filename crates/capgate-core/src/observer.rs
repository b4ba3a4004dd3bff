//! Outbound notification of resolved capability requests.

use crate::request::CapabilityState;

/// Receives the final state of a capability request.
pub trait CapabilityObserver: Send + Sync {
    fn on_capability_resolved(&self, capability_id: &str, state: CapabilityState);
}

impl<F> CapabilityObserver for F
where
    F: Fn(&str, CapabilityState) + Send + Sync,
{
    fn on_capability_resolved(&self, capability_id: &str, state: CapabilityState) {
        self(capability_id, state);
    }
}
