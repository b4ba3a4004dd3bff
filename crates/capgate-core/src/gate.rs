//! Permission gate.
//!
//! Decides whether a capability is available, requests it from the host
//! platform when it is not, and reports exactly one terminal state per
//! request to the observer. Outstanding requests are keyed by token so
//! several capabilities can be in flight at once; responses whose token is
//! not outstanding are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::catalog::CapabilityCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::observer::CapabilityObserver;
use crate::platform::{GrantStatus, PermissionPlatform};
use crate::request::{CapabilityRequest, CapabilityState, GrantResult, RequestToken};

/// Mutable gate state, guarded by one lock.
#[derive(Debug)]
struct GateState {
    /// Requests awaiting a platform response, keyed by token.
    outstanding: HashMap<RequestToken, CapabilityRequest>,
    /// Final state of every capability that reached GRANTED or DENIED.
    resolved: HashMap<String, CapabilityState>,
    /// Next token to try.
    next_token: RequestToken,
}

impl GateState {
    fn new() -> Self {
        Self {
            outstanding: HashMap::new(),
            resolved: HashMap::new(),
            next_token: RequestToken::FIRST,
        }
    }

    fn outstanding_for(&self, capability_id: &str) -> Option<&CapabilityRequest> {
        self.outstanding
            .values()
            .find(|r| r.capability_id == capability_id)
    }

    fn allocate_token(&mut self) -> Result<RequestToken> {
        if self.outstanding.len() >= RequestToken::SPACE {
            return Err(Error::TokensExhausted(RequestToken::SPACE));
        }
        let mut token = self.next_token;
        while self.outstanding.contains_key(&token) {
            token = token.next();
        }
        self.next_token = token.next();
        Ok(token)
    }
}

/// Tracks runtime capability requests against one host platform.
pub struct PermissionGate {
    catalog: CapabilityCatalog,
    platform: Arc<dyn PermissionPlatform>,
    observer: Arc<dyn CapabilityObserver>,
    notify_not_required: bool,
    state: Mutex<GateState>,
}

impl PermissionGate {
    /// Create a gate over the built-in catalog.
    pub fn new(
        platform: Arc<dyn PermissionPlatform>,
        observer: Arc<dyn CapabilityObserver>,
    ) -> Self {
        Self {
            catalog: CapabilityCatalog::new(),
            platform,
            observer,
            notify_not_required: false,
            state: Mutex::new(GateState::new()),
        }
    }

    /// Create a gate using the catalog and gate settings from `config`.
    pub fn from_config(
        config: &Config,
        platform: Arc<dyn PermissionPlatform>,
        observer: Arc<dyn CapabilityObserver>,
    ) -> Self {
        Self::new(platform, observer)
            .with_catalog(config.catalog())
            .notify_not_required(config.gate.notify_not_required)
    }

    /// Replace the capability catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: CapabilityCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Also notify the observer when a capability is implicitly available.
    #[must_use]
    pub fn notify_not_required(mut self, notify: bool) -> Self {
        self.notify_not_required = notify;
        self
    }

    pub const fn catalog(&self) -> &CapabilityCatalog {
        &self.catalog
    }

    /// Make sure `capability_id` is available, requesting it if needed.
    ///
    /// Returns a snapshot of the request. When a platform request was issued
    /// the snapshot is `Requested`; the terminal state arrives through
    /// [`handle_response`](Self::handle_response).
    pub fn ensure(&self, capability_id: &str, platform_version: u32) -> Result<CapabilityRequest> {
        let spec = self.catalog.resolve(capability_id)?;
        let mut request = CapabilityRequest::new(capability_id);

        if !spec.is_gated_on(platform_version) {
            request.advance(CapabilityState::NotRequired);
            debug!(
                capability_id,
                platform_version,
                gated_since = spec.gated_since,
                "Capability implicitly available"
            );
            if self.notify_not_required {
                self.notify(capability_id, CapabilityState::NotRequired);
            }
            return Ok(request);
        }

        {
            let state = self.lock();
            if let Some(pending) = state.outstanding_for(capability_id) {
                debug!(
                    capability_id,
                    token = ?pending.request_token,
                    "Capability request already outstanding"
                );
                return Ok(pending.clone());
            }
        }

        let status = self.platform.query_grant_status(capability_id);

        // The lock was released for the query: another caller may have issued
        // or resolved this capability meanwhile, so decide on fresh state.
        let token = {
            let mut state = self.lock();
            if let Some(pending) = state.outstanding_for(capability_id) {
                return Ok(pending.clone());
            }
            if let Some(recorded) = state.resolved.get(capability_id).copied() {
                drop(state);
                return Ok(self.recheck(capability_id, recorded, status));
            }
            if status == GrantStatus::Granted {
                request.advance(CapabilityState::Granted);
                state
                    .resolved
                    .insert(capability_id.to_string(), CapabilityState::Granted);
                drop(state);
                info!(capability_id, "Capability already granted");
                self.notify(capability_id, CapabilityState::Granted);
                return Ok(request);
            }
            let token = state.allocate_token()?;
            request.advance(CapabilityState::Requested);
            request.request_token = Some(token);
            state.outstanding.insert(token, request.clone());
            token
        };

        info!(capability_id, %token, "Requesting capability");
        self.platform
            .request_capabilities(&[capability_id.to_string()], token);

        Ok(request)
    }

    /// Deliver a platform response.
    ///
    /// Only the first result decides the outcome; an empty list means the
    /// dialog was dismissed and counts as a denial. Responses whose token is
    /// not outstanding are ignored and return `None`.
    pub fn handle_response(
        &self,
        token: RequestToken,
        results: &[GrantResult],
    ) -> Option<CapabilityRequest> {
        let request = {
            let mut state = self.lock();
            let Some(mut request) = state.outstanding.remove(&token) else {
                debug!(%token, "Ignoring stale permission response");
                return None;
            };

            if let Some(first) = results.first() {
                if first.capability_id != request.capability_id {
                    warn!(
                        %token,
                        expected = %request.capability_id,
                        received = %first.capability_id,
                        "Permission response names a different capability"
                    );
                }
            }

            let granted = results.first().is_some_and(|r| r.granted);
            let outcome = if granted {
                CapabilityState::Granted
            } else {
                CapabilityState::Denied
            };
            request.advance(outcome);
            state
                .resolved
                .insert(request.capability_id.clone(), request.state);
            drop(state);
            request
        };

        if request.state == CapabilityState::Granted {
            info!(capability_id = %request.capability_id, %token, "Capability granted by user");
        } else {
            warn!(capability_id = %request.capability_id, %token, "Capability denied by user");
        }
        self.notify(&request.capability_id, request.state);

        Some(request)
    }

    /// Current state of `capability_id` as far as this gate knows.
    pub fn state_of(&self, capability_id: &str) -> CapabilityState {
        let state = self.lock();
        if state.outstanding_for(capability_id).is_some() {
            return CapabilityState::Requested;
        }
        state
            .resolved
            .get(capability_id)
            .copied()
            .unwrap_or_default()
    }

    /// Snapshot of outstanding requests, ordered by token.
    pub fn outstanding(&self) -> Vec<CapabilityRequest> {
        let mut requests: Vec<_> = self.lock().outstanding.values().cloned().collect();
        requests.sort_by_key(|r| r.request_token);
        requests
    }

    /// Drop the recorded terminal state of `capability_id`.
    ///
    /// The next `ensure` starts from UNKNOWN again and may issue a new
    /// platform request. Outstanding requests are not affected.
    pub fn forget(&self, capability_id: &str) -> Option<CapabilityState> {
        let removed = self.lock().resolved.remove(capability_id);
        if removed.is_some() {
            debug!(capability_id, "Forgot resolved capability");
        }
        removed
    }

    /// Re-read the platform grant for a capability that already resolved.
    fn recheck(
        &self,
        capability_id: &str,
        recorded: CapabilityState,
        status: GrantStatus,
    ) -> CapabilityRequest {
        let current = match status {
            GrantStatus::Granted => CapabilityState::Granted,
            GrantStatus::NotGranted => CapabilityState::Denied,
        };

        if current != recorded {
            self.lock()
                .resolved
                .insert(capability_id.to_string(), current);
            info!(
                capability_id,
                %recorded,
                %current,
                "Platform grant changed since resolution"
            );
            self.notify(capability_id, current);
        } else {
            debug!(capability_id, %current, "Capability already resolved");
        }

        CapabilityRequest {
            capability_id: capability_id.to_string(),
            state: current,
            request_token: None,
        }
    }

    fn notify(&self, capability_id: &str, state: CapabilityState) {
        self.observer.on_capability_resolved(capability_id, state);
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePlatform {
        grants: Mutex<HashMap<String, bool>>,
        requests: Mutex<Vec<(Vec<String>, RequestToken)>>,
    }

    impl FakePlatform {
        fn grant(&self, capability_id: &str, granted: bool) {
            self.grants
                .lock()
                .unwrap()
                .insert(capability_id.to_string(), granted);
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl PermissionPlatform for FakePlatform {
        fn query_grant_status(&self, capability_id: &str) -> GrantStatus {
            let granted = self
                .grants
                .lock()
                .unwrap()
                .get(capability_id)
                .copied()
                .unwrap_or(false);
            GrantStatus::from(granted)
        }

        fn request_capabilities(&self, capability_ids: &[String], token: RequestToken) {
            self.requests
                .lock()
                .unwrap()
                .push((capability_ids.to_vec(), token));
        }
    }

    type Calls = Arc<Mutex<Vec<(String, CapabilityState)>>>;

    fn test_gate() -> (PermissionGate, Arc<FakePlatform>, Calls) {
        let platform = Arc::new(FakePlatform::default());
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let observer = move |id: &str, state: CapabilityState| {
            sink.lock().unwrap().push((id.to_string(), state));
        };
        let gate = PermissionGate::new(platform.clone(), Arc::new(observer));
        (gate, platform, calls)
    }

    #[test]
    fn not_required_below_gating_version() {
        let (gate, platform, calls) = test_gate();

        let request = gate.ensure("activity-recognition", 28).unwrap();

        assert_eq!(request.state, CapabilityState::NotRequired);
        assert!(request.request_token.is_none());
        assert_eq!(platform.request_count(), 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn repeated_ensure_does_not_duplicate_request() {
        let (gate, platform, _calls) = test_gate();

        let first = gate.ensure("activity-recognition", 29).unwrap();
        let second = gate.ensure("activity-recognition", 29).unwrap();

        assert_eq!(first, second);
        assert_eq!(platform.request_count(), 1);
        assert_eq!(gate.state_of("activity-recognition"), CapabilityState::Requested);
    }

    #[test]
    fn tokens_skip_outstanding_and_wrap() {
        let (gate, _platform, _calls) = test_gate();
        gate.lock().next_token = RequestToken::new(u16::MAX).unwrap();

        let a = gate.ensure("camera", 30).unwrap();
        let b = gate.ensure("body-sensors", 30).unwrap();

        assert_eq!(a.request_token, RequestToken::new(u16::MAX));
        assert_eq!(b.request_token, Some(RequestToken::FIRST));

        // Force the counter onto a token that is still outstanding.
        gate.lock().next_token = RequestToken::FIRST;
        let c = gate.ensure("fine-location", 30).unwrap();
        assert_eq!(c.request_token, RequestToken::new(2));
    }

    #[test]
    fn empty_response_counts_as_denial() {
        let (gate, _platform, calls) = test_gate();
        let request = gate.ensure("camera", 30).unwrap();

        let resolved = gate
            .handle_response(request.request_token.unwrap(), &[])
            .unwrap();

        assert_eq!(resolved.state, CapabilityState::Denied);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![("camera".to_string(), CapabilityState::Denied)]
        );
    }

    #[test]
    fn denied_capability_is_not_requested_again() {
        let (gate, platform, calls) = test_gate();
        let request = gate.ensure("camera", 30).unwrap();
        gate.handle_response(
            request.request_token.unwrap(),
            &[GrantResult::new("camera", false)],
        );

        let again = gate.ensure("camera", 30).unwrap();

        assert_eq!(again.state, CapabilityState::Denied);
        assert_eq!(platform.request_count(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn recheck_picks_up_grant_changed_outside_gate() {
        let (gate, platform, calls) = test_gate();
        let request = gate.ensure("camera", 30).unwrap();
        gate.handle_response(
            request.request_token.unwrap(),
            &[GrantResult::new("camera", false)],
        );

        platform.grant("camera", true);
        let again = gate.ensure("camera", 30).unwrap();

        assert_eq!(again.state, CapabilityState::Granted);
        assert_eq!(platform.request_count(), 1);
        assert_eq!(
            calls.lock().unwrap().last(),
            Some(&("camera".to_string(), CapabilityState::Granted))
        );
    }

    #[test]
    fn forget_allows_a_fresh_request() {
        let (gate, platform, _calls) = test_gate();
        let request = gate.ensure("camera", 30).unwrap();
        gate.handle_response(
            request.request_token.unwrap(),
            &[GrantResult::new("camera", false)],
        );

        assert_eq!(gate.forget("camera"), Some(CapabilityState::Denied));
        let again = gate.ensure("camera", 30).unwrap();

        assert_eq!(again.state, CapabilityState::Requested);
        assert_eq!(platform.request_count(), 2);
        assert_ne!(again.request_token, request.request_token);
    }

    #[test]
    fn outstanding_is_ordered_by_token() {
        let (gate, _platform, _calls) = test_gate();
        gate.ensure("camera", 30).unwrap();
        gate.ensure("body-sensors", 30).unwrap();

        let ids: Vec<_> = gate
            .outstanding()
            .into_iter()
            .map(|r| r.capability_id)
            .collect();
        assert_eq!(ids, vec!["camera", "body-sensors"]);
    }

    #[test]
    fn unknown_capability_is_rejected_before_platform_call() {
        let (gate, platform, _calls) = test_gate();

        assert!(matches!(
            gate.ensure("", 30),
            Err(Error::InvalidCapability(_))
        ));
        assert!(matches!(
            gate.ensure("x-ray-vision", 30),
            Err(Error::InvalidCapability(_))
        ));
        assert_eq!(platform.request_count(), 0);
    }
}
