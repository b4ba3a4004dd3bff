//! Simulated host platform.
//!
//! Stands in for the operating system side of runtime permissions:
//! [`GrantStore`] persists decisions across runs, [`SimulatedPlatform`]
//! answers grant queries and queues dialog requests, and [`DialogHost`]
//! shows the dialogs and feeds the answers back into the gate.

mod dialog;
mod grant_store;
mod platform;

pub use dialog::{AnswerPolicy, DialogHost, DialogRequest};
pub use grant_store::GrantStore;
pub use platform::SimulatedPlatform;

use std::path::PathBuf;

/// Host-side errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to read grant store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse grant store {path}: {source}")]
    StoreParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write grant store {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Permission prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Permission prompt task failed: {0}")]
    PromptTask(#[from] tokio::task::JoinError),
}
