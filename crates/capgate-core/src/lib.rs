//! `capgate` Core Library
//!
//! Runtime capability ("permission") request tracking:
//! - Permission gate state machine with token-correlated responses
//! - Capability catalog with runtime-gating versions
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod observer;
pub mod platform;
pub mod request;
pub mod tracing_init;

pub use catalog::{CapabilityCatalog, CapabilitySpec};
pub use config::Config;
pub use error::{Error, Result};
pub use gate::PermissionGate;
pub use observer::CapabilityObserver;
pub use platform::{GrantStatus, PermissionPlatform};
pub use request::{CapabilityRequest, CapabilityState, GrantResult, RequestToken};
