//! Persisted grant decisions.
//!
//! The host owns persistence of the user's answers across restarts. The file
//! is a JSON object `{"grants": {"<capability>": true|false}}`; a missing file
//! is an empty store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::HostError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantFile {
    #[serde(default)]
    grants: BTreeMap<String, bool>,
}

/// Grant decisions keyed by capability id.
#[derive(Debug)]
pub struct GrantStore {
    path: PathBuf,
    grants: BTreeMap<String, bool>,
}

impl GrantStore {
    /// Load the store at `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HostError> {
        let path = path.into();
        let grants = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|source| HostError::StoreRead {
                    path: path.clone(),
                    source,
                })?;
            let file: GrantFile =
                serde_json::from_str(&content).map_err(|source| HostError::StoreParse {
                    path: path.clone(),
                    source,
                })?;
            file.grants
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = grants.len(), "Opened grant store");
        Ok(Self { path, grants })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded decision for `capability_id`, if the user was ever asked.
    pub fn get(&self, capability_id: &str) -> Option<bool> {
        self.grants.get(capability_id).copied()
    }

    pub fn is_granted(&self, capability_id: &str) -> bool {
        self.get(capability_id).unwrap_or(false)
    }

    /// Record a decision and persist it.
    pub fn set(&mut self, capability_id: &str, granted: bool) -> Result<(), HostError> {
        self.grants.insert(capability_id.to_string(), granted);
        self.save()
    }

    /// Forget a decision and persist the change.
    pub fn remove(&mut self, capability_id: &str) -> Result<Option<bool>, HostError> {
        let removed = self.grants.remove(capability_id);
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.grants.iter().map(|(id, granted)| (id.as_str(), *granted))
    }

    fn save(&self) -> Result<(), HostError> {
        let path = &self.path;
        let write_err = |source| HostError::StoreWrite {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = GrantFile {
            grants: self.grants.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| HostError::StoreWrite {
            path: path.clone(),
            source: e.into(),
        })?;

        // Write-then-rename so a crash never leaves a truncated store.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;
        debug!(path = %path.display(), "Saved grant store");
        Ok(())
    }
}
