//! Capability catalog.
//!
//! Lists the capabilities the platform shim recognises and the platform
//! version at which each one became runtime-gated. Below that version the
//! capability is granted at install time and never needs a request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A recognised capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// Capability identifier.
    pub id: String,
    /// First platform version where the capability needs user consent.
    pub gated_since: u32,
    /// Human-readable name used in user-facing messages.
    #[serde(default)]
    pub label: Option<String>,
    /// Feature that degrades when the capability is refused.
    #[serde(default)]
    pub feature: Option<String>,
    /// Where this entry came from.
    #[serde(default)]
    pub source: CatalogSource,
}

impl CapabilitySpec {
    /// Whether `platform_version` requires a runtime request.
    pub const fn is_gated_on(&self, platform_version: u32) -> bool {
        platform_version >= self.gated_since
    }

    /// Label for messages, falling back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Origin of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Shipped with the library.
    #[default]
    Builtin,
    /// Added through configuration.
    Config,
}

/// Set of recognised capabilities keyed by id.
#[derive(Debug, Clone)]
pub struct CapabilityCatalog {
    entries: BTreeMap<String, CapabilitySpec>,
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityCatalog {
    /// Create a catalog with the built-in capabilities.
    pub fn new() -> Self {
        Self::with_specs(builtin_specs())
    }

    /// Create a catalog holding only `specs`.
    pub fn with_specs(specs: Vec<CapabilitySpec>) -> Self {
        let mut catalog = Self {
            entries: BTreeMap::new(),
        };
        catalog.extend(specs);
        catalog
    }

    /// Add entries, replacing any existing entry with the same id.
    pub fn extend(&mut self, specs: Vec<CapabilitySpec>) {
        for spec in specs {
            self.entries.insert(spec.id.clone(), spec);
        }
    }

    /// Look up a capability.
    pub fn get(&self, capability_id: &str) -> Option<&CapabilitySpec> {
        self.entries.get(capability_id)
    }

    /// Look up a capability, failing with `InvalidCapability` if it is empty
    /// or unknown.
    pub fn resolve(&self, capability_id: &str) -> Result<&CapabilitySpec> {
        if capability_id.trim().is_empty() {
            return Err(Error::InvalidCapability(capability_id.to_string()));
        }
        self.get(capability_id)
            .ok_or_else(|| Error::InvalidCapability(capability_id.to_string()))
    }

    /// All entries, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySpec> {
        self.entries.values()
    }
}

fn builtin(id: &str, gated_since: u32, label: &str, feature: &str) -> CapabilitySpec {
    CapabilitySpec {
        id: id.to_string(),
        gated_since,
        label: Some(label.to_string()),
        feature: Some(feature.to_string()),
        source: CatalogSource::Builtin,
    }
}

/// Built-in capabilities with the platform version that introduced runtime consent.
fn builtin_specs() -> Vec<CapabilitySpec> {
    vec![
        builtin(
            "activity-recognition",
            29,
            "Activity Recognition",
            "Step counter",
        ),
        builtin("body-sensors", 23, "Body Sensors", "Heart rate tracking"),
        builtin("camera", 23, "Camera", "Photo capture"),
        builtin("fine-location", 23, "Location", "Route tracking"),
        builtin(
            "background-location",
            29,
            "Background Location",
            "Route tracking while the app is closed",
        ),
        builtin("bluetooth-scan", 31, "Bluetooth", "Wearable pairing"),
        builtin("post-notifications", 33, "Notifications", "Reminders"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_recognition_gated_since_29() {
        let catalog = CapabilityCatalog::new();
        let spec = catalog.resolve("activity-recognition").unwrap();
        assert!(!spec.is_gated_on(28));
        assert!(spec.is_gated_on(29));
        assert!(spec.is_gated_on(34));
    }

    #[test]
    fn empty_and_unknown_ids_are_invalid() {
        let catalog = CapabilityCatalog::new();
        assert!(matches!(
            catalog.resolve(""),
            Err(Error::InvalidCapability(_))
        ));
        assert!(matches!(
            catalog.resolve("   "),
            Err(Error::InvalidCapability(_))
        ));
        assert!(matches!(
            catalog.resolve("teleportation"),
            Err(Error::InvalidCapability(_))
        ));
    }

    #[test]
    fn extend_overrides_builtin_entry() {
        let mut catalog = CapabilityCatalog::new();
        let before = catalog.iter().count();
        catalog.extend(vec![CapabilitySpec {
            id: "camera".to_string(),
            gated_since: 40,
            label: None,
            feature: None,
            source: CatalogSource::Config,
        }]);

        let spec = catalog.get("camera").unwrap();
        assert_eq!(spec.gated_since, 40);
        assert_eq!(spec.display_label(), "camera");
        assert_eq!(spec.source, CatalogSource::Config);
        assert_eq!(catalog.iter().count(), before);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: CapabilitySpec =
            serde_json::from_str(r#"{"id": "nfc", "gated_since": 30}"#).unwrap();
        assert_eq!(spec.source, CatalogSource::Builtin);
        assert!(spec.label.is_none());
    }
}
