//! Wizard tuning knobs
//!
//! Persisted separately from form data in LocalStorage.

use serde::{Deserialize, Serialize};

/// Timing, storage and expiry parameters for a wizard session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardConfig {
    // === Timing ===
    /// Inactivity window before a debounced auto-save fires (ms)
    pub debounce_ms: u64,
    /// Suppression window after restoring saved data (ms)
    pub restore_settle_ms: u64,
    /// Delay between reference data becoming ready and the restore run (ms)
    pub startup_settle_ms: u64,

    // === Persistence ===
    /// Days until a saved document expires
    pub expiry_days: u32,
    /// Version tag written into every saved document
    pub schema_version: String,
    /// Key of the saved form document in both backing stores
    pub document_key: String,
    /// Key of the pending-submission queue in the secondary store
    pub pending_key: String,
    /// Largest cookie (name + encoded value) the primary store accepts
    pub cookie_capacity: usize,

    // === Submission ===
    /// Remote submission endpoint; local queue only when unset
    pub submit_endpoint: Option<String>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            restore_settle_ms: 1500,
            startup_settle_ms: 300,

            expiry_days: 30,
            schema_version: crate::consts::SCHEMA_VERSION.to_string(),
            document_key: "visaFormData".to_string(),
            pending_key: "visaSubmissions".to_string(),
            cookie_capacity: 4096,

            submit_endpoint: None,
        }
    }
}

impl WizardConfig {
    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "visa_wizard_config";

    /// Parse a JSON config, filling missing keys with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Expiry window as a chrono duration
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(config) = Self::from_json(&json) {
                    log::info!("Loaded wizard config from LocalStorage");
                    return config;
                }
            }
        }

        log::info!("Using default wizard config");
        Self::default()
    }

    /// Save config to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Wizard config saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_source_timings() {
        let config = WizardConfig::default();
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.restore_settle_ms, 1500);
        assert_eq!(config.schema_version, "2.0");
        assert_eq!(config.expiry(), chrono::Duration::days(30));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = WizardConfig::from_json(r#"{"debounceMs": 250, "expiryDays": 7}"#).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.expiry_days, 7);
        assert_eq!(config.restore_settle_ms, 1500);
        assert_eq!(config.document_key, "visaFormData");
    }

    #[test]
    fn test_native_load_uses_defaults() {
        let config = WizardConfig::load();
        config.save();
        assert_eq!(WizardConfig::load(), WizardConfig::default());
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(WizardConfig::from_json("not json").is_err());
    }
}
