//! Toast-style presentation of resolved capabilities.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use capgate_core::{CapabilityCatalog, CapabilityObserver, CapabilitySpec, CapabilityState};

/// User-facing message for a resolved capability, if the state warrants one.
pub fn toast_message(
    spec: Option<&CapabilitySpec>,
    capability_id: &str,
    state: CapabilityState,
) -> Option<String> {
    let label = spec.map_or(capability_id, CapabilitySpec::display_label);
    match state {
        CapabilityState::Granted => Some(format!("{label} permission granted!")),
        CapabilityState::Denied => {
            let consequence = spec
                .and_then(|s| s.feature.as_deref())
                .map_or_else(
                    || "Some features may not work.".to_string(),
                    |feature| format!("{feature} may not work."),
                );
            Some(format!("{label} permission denied. {consequence}"))
        }
        CapabilityState::NotRequired => Some(format!(
            "{label} permission is implicitly granted on this platform version."
        )),
        CapabilityState::Unknown | CapabilityState::Requested => None,
    }
}

/// Observer that writes a toast line per resolution.
pub struct ToastObserver {
    catalog: CapabilityCatalog,
    out: Mutex<Box<dyn Write + Send>>,
    last: Mutex<Option<CapabilityState>>,
}

impl ToastObserver {
    pub fn stdout(catalog: CapabilityCatalog) -> Self {
        Self::with_writer(catalog, Box::new(std::io::stdout()))
    }

    pub fn with_writer(catalog: CapabilityCatalog, out: Box<dyn Write + Send>) -> Self {
        Self {
            catalog,
            out: Mutex::new(out),
            last: Mutex::new(None),
        }
    }

    /// Most recent state reported to this observer.
    pub fn last_state(&self) -> Option<CapabilityState> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CapabilityObserver for ToastObserver {
    fn on_capability_resolved(&self, capability_id: &str, state: CapabilityState) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);

        let Some(message) = toast_message(self.catalog.get(capability_id), capability_id, state)
        else {
            return;
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            warn!(?e, capability_id, "Failed to show toast");
        }
    }
}
