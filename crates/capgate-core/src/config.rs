//! Configuration resolution for capgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/capgate/settings.json)
//! 3. Project config (.capgate/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{CapabilityCatalog, CapabilitySpec, CatalogSource};
use crate::error::{Error, Result};

/// Complete capgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub host: HostConfig,
    /// Extra capabilities, or overrides of built-in ones.
    #[serde(default)]
    pub capabilities: Vec<CapabilitySpec>,
}

impl Config {
    /// Built-in catalog extended with configured capabilities.
    pub fn catalog(&self) -> CapabilityCatalog {
        let mut catalog = CapabilityCatalog::new();
        catalog.extend(
            self.capabilities
                .iter()
                .cloned()
                .map(|spec| CapabilitySpec {
                    source: CatalogSource::Config,
                    ..spec
                })
                .collect(),
        );
        catalog
    }
}

/// Permission gate behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GateConfig {
    /// Notify the observer when a capability is implicitly available.
    #[serde(default)]
    pub notify_not_required: bool,
}

/// Simulated host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Grant store file. Defaults to the platform config directory.
    #[serde(default)]
    pub grant_store_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            grant_store_path: None,
            log_level: default_log_level(),
        }
    }
}

/// One settings file. Only keys present in the file override lower layers.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigLayer {
    #[serde(default)]
    pub gate: GateLayer,
    #[serde(default)]
    pub host: HostLayer,
    #[serde(default)]
    pub capabilities: Vec<CapabilitySpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GateLayer {
    pub notify_not_required: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HostLayer {
    pub grant_store_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".capgate").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Directory holding capgate's global files.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".capgate"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/capgate"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("capgate"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("settings.json"))
}

/// Default location of the simulated host's grant store.
pub fn default_grant_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("grants.json"))
}

pub fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigLayer) {
    if let Some(notify) = overlay.gate.notify_not_required {
        base.gate.notify_not_required = notify;
    }
    if let Some(path) = overlay.host.grant_store_path {
        base.host.grant_store_path = Some(path);
    }
    if let Some(level) = overlay.host.log_level {
        base.host.log_level = level;
    }

    // Later sources win per capability id once the catalog is built.
    base.capabilities.extend(overlay.capabilities);
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("CAPGATE_LOG_LEVEL") {
        config.host.log_level = val;
    }
    if let Some(val) = var("CAPGATE_NOTIFY_NOT_REQUIRED") {
        if let Ok(b) = val.parse() {
            config.gate.notify_not_required = b;
        }
    }
    if let Some(val) = var("CAPGATE_GRANT_STORE") {
        config.host.grant_store_path = Some(PathBuf::from(val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_does_not_notify_not_required() {
        let config = Config::default();
        assert!(!config.gate.notify_not_required);
        assert_eq!(config.host.log_level, "info");
    }

    #[test]
    fn project_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings_dir = dir.path().join(".capgate");
        std::fs::create_dir_all(&settings_dir).unwrap();
        std::fs::write(
            settings_dir.join("settings.json"),
            r#"{
                "gate": {"notify_not_required": true},
                "capabilities": [{"id": "nfc", "gated_since": 30, "label": "NFC"}]
            }"#,
        )
        .unwrap();

        let overlay = load_config_file(&settings_dir.join("settings.json")).unwrap();
        let mut config = Config::default();
        merge_config(&mut config, overlay);

        assert!(config.gate.notify_not_required);
        let catalog = config.catalog();
        let nfc = catalog.get("nfc").unwrap();
        assert_eq!(nfc.gated_since, 30);
        assert_eq!(nfc.source, CatalogSource::Config);
        assert!(catalog.get("activity-recognition").is_some());
    }

    #[test]
    fn later_layer_keeps_keys_it_does_not_set() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let project = dir.path().join("project.json");
        std::fs::write(
            &global,
            r#"{
                "gate": {"notify_not_required": true},
                "host": {"log_level": "debug", "grant_store_path": "/var/lib/capgate/grants.json"}
            }"#,
        )
        .unwrap();
        std::fs::write(
            &project,
            r#"{"capabilities": [{"id": "nfc", "gated_since": 30}]}"#,
        )
        .unwrap();

        let mut config = Config::default();
        merge_config(&mut config, load_config_file(&global).unwrap());
        merge_config(&mut config, load_config_file(&project).unwrap());

        assert!(config.gate.notify_not_required);
        assert_eq!(config.host.log_level, "debug");
        assert_eq!(
            config.host.grant_store_path.as_deref(),
            Some(Path::new("/var/lib/capgate/grants.json"))
        );
        assert!(config.catalog().get("nfc").is_some());
    }

    #[test]
    fn later_layer_can_switch_a_key_back_off() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let project = dir.path().join("project.json");
        std::fs::write(&global, r#"{"gate": {"notify_not_required": true}}"#).unwrap();
        std::fs::write(&project, r#"{"gate": {"notify_not_required": false}}"#).unwrap();

        let mut config = Config::default();
        merge_config(&mut config, load_config_file(&global).unwrap());
        merge_config(&mut config, load_config_file(&project).unwrap());

        assert!(!config.gate.notify_not_required);
        assert_eq!(config.host.log_level, "info");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CAPGATE_LOG_LEVEL", "debug"),
            ("CAPGATE_NOTIFY_NOT_REQUIRED", "true"),
            ("CAPGATE_GRANT_STORE", "/tmp/grants.json"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.host.log_level, "debug");
        assert!(config.gate.notify_not_required);
        assert_eq!(
            config.host.grant_store_path.as_deref(),
            Some(Path::new("/tmp/grants.json"))
        );
    }

    #[test]
    fn unparsable_bool_env_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "CAPGATE_NOTIFY_NOT_REQUIRED").then(|| "maybe".to_string())
        });
        assert!(!config.gate.notify_not_required);
    }
}
