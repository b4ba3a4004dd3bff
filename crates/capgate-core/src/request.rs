//! Capability request data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a capability request.
///
/// States only move forward:
/// `Unknown -> {NotRequired | Requested} -> {Granted | Denied}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    /// Nothing checked yet.
    #[default]
    Unknown,
    /// The platform predates runtime gating; the capability is implicitly available.
    NotRequired,
    /// A platform request is in flight.
    Requested,
    /// The capability is available.
    Granted,
    /// The user refused the capability.
    Denied,
}

impl CapabilityState {
    /// Whether no further transition can happen from this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::NotRequired | Self::Granted | Self::Denied)
    }

    /// Whether the capability may be used in this state.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::NotRequired | Self::Granted)
    }

    /// Position along the lifecycle, used to reject backward transitions.
    const fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::NotRequired | Self::Requested => 1,
            Self::Granted | Self::Denied => 2,
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::NotRequired => "not_required",
            Self::Requested => "requested",
            Self::Granted => "granted",
            Self::Denied => "denied",
        };
        f.write_str(s)
    }
}

/// Correlation code matching an asynchronous platform response to its request.
///
/// Host platforms only honour the lower 16 bits of a request code, so tokens
/// are non-zero `u16` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(u16);

impl RequestToken {
    /// Lowest token the gate hands out.
    pub const FIRST: Self = Self(1);

    /// Number of distinct tokens.
    pub const SPACE: usize = u16::MAX as usize;

    /// Wrap a raw request code. Returns `None` for zero.
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// The raw request code.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The token after this one, wrapping from `u16::MAX` back to 1.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.0 == u16::MAX {
            Self::FIRST
        } else {
            Self(self.0 + 1)
        }
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One capability's outcome inside a platform response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResult {
    pub capability_id: String,
    pub granted: bool,
}

impl GrantResult {
    pub fn new(capability_id: impl Into<String>, granted: bool) -> Self {
        Self {
            capability_id: capability_id.into(),
            granted,
        }
    }
}

/// A snapshot of one capability request tracked by a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Opaque capability identifier (e.g. a platform permission name).
    pub capability_id: String,
    /// Current lifecycle state.
    pub state: CapabilityState,
    /// Token of the issued platform request, if one was issued.
    pub request_token: Option<RequestToken>,
}

impl CapabilityRequest {
    pub(crate) fn new(capability_id: &str) -> Self {
        Self {
            capability_id: capability_id.to_string(),
            state: CapabilityState::Unknown,
            request_token: None,
        }
    }

    /// Move to `next`, refusing backward or post-terminal transitions.
    pub(crate) fn advance(&mut self, next: CapabilityState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        use CapabilityState::{Denied, Granted, NotRequired, Requested, Unknown};

        assert!(Unknown.can_advance_to(Requested));
        assert!(Unknown.can_advance_to(NotRequired));
        assert!(Unknown.can_advance_to(Granted));
        assert!(Requested.can_advance_to(Granted));
        assert!(Requested.can_advance_to(Denied));

        assert!(!Requested.can_advance_to(Unknown));
        assert!(!Requested.can_advance_to(NotRequired));
        assert!(!Granted.can_advance_to(Denied));
        assert!(!Denied.can_advance_to(Granted));
        assert!(!NotRequired.can_advance_to(Requested));
    }

    #[test]
    fn only_granted_and_not_required_are_available() {
        use CapabilityState::{Denied, Granted, NotRequired, Requested, Unknown};
        let available: Vec<_> = [Unknown, Requested, Granted, Denied, NotRequired]
            .into_iter()
            .filter(|s| s.is_available())
            .collect();
        assert_eq!(available, vec![Granted, NotRequired]);
    }

    #[test]
    fn advance_rejects_leaving_terminal_state() {
        let mut request = CapabilityRequest::new("activity-recognition");
        assert!(request.advance(CapabilityState::Requested));
        assert!(request.advance(CapabilityState::Denied));
        assert!(!request.advance(CapabilityState::Granted));
        assert_eq!(request.state, CapabilityState::Denied);
    }

    #[test]
    fn token_wraps_past_max_and_skips_zero() {
        let last = RequestToken::new(u16::MAX).unwrap();
        assert_eq!(last.next(), RequestToken::FIRST);
        assert!(RequestToken::new(0).is_none());
        assert_eq!(RequestToken::FIRST.next().get(), 2);
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&CapabilityState::NotRequired).unwrap();
        assert_eq!(json, r#""not_required""#);
    }
}
