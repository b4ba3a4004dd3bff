//! Grant store subcommands.
//!
//! `status`, `revoke` and `list` write their report to any `Write` so the
//! binary can pass stdout and tests can pass a buffer.

use std::io::Write;
use std::path::{Path, PathBuf};

use capgate_core::Config;

use crate::host::GrantStore;

/// Pick the grant store location: the `--store` flag (or
/// `CAPGATE_GRANT_STORE`, which clap folds into it) wins, then the
/// configured path, then `default`.
pub fn resolve_store_path(
    flag: Option<PathBuf>,
    config: &Config,
    default: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    flag.or_else(|| config.host.grant_store_path.clone())
        .or_else(default)
}

const fn decision_label(decision: Option<bool>) -> &'static str {
    match decision {
        Some(true) => "granted",
        Some(false) => "denied",
        None => "not requested",
    }
}

/// Report the persisted decision for `capability`, or every recorded
/// decision when no capability is given.
pub fn status(
    config: &Config,
    store_path: &Path,
    capability: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let store = GrantStore::open(store_path)?;
    match capability {
        Some(capability) => {
            config.catalog().resolve(capability)?;
            writeln!(out, "{capability}: {}", decision_label(store.get(capability)))?;
        }
        None => {
            if store.iter().next().is_none() {
                writeln!(out, "no decisions recorded in {}", store.path().display())?;
            }
            for (capability, granted) in store.iter() {
                writeln!(out, "{capability}: {}", decision_label(Some(granted)))?;
            }
        }
    }
    Ok(())
}

/// Clear the persisted decision for `capability`.
pub fn revoke(
    config: &Config,
    store_path: &Path,
    capability: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    config.catalog().resolve(capability)?;
    let mut store = GrantStore::open(store_path)?;
    if store.remove(capability)?.is_some() {
        writeln!(out, "{capability}: revoked")?;
    } else {
        writeln!(out, "{capability}: nothing to revoke")?;
    }
    Ok(())
}

/// List recognised capabilities with their gating version.
pub fn list(config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    for spec in config.catalog().iter() {
        writeln!(
            out,
            "{:<24} gated since {:<4} {}",
            spec.id,
            spec.gated_since,
            spec.display_label()
        )?;
    }
    Ok(())
}
