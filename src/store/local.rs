//! LocalStorage-backed store (WASM only)

use chrono::{DateTime, Utc};

use crate::error::StoreError;

use super::BackingStore;

/// `window.localStorage`, looked up on every call so a store disabled
/// mid-session degrades to errors instead of a stale handle
#[derive(Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .ok_or(StoreError::Unavailable {
                store: "localStorage",
            })?
            .local_storage()
            .map_err(|_| StoreError::Disabled {
                store: "localStorage",
            })?
            .ok_or(StoreError::Unavailable {
                store: "localStorage",
            })
    }
}

impl BackingStore for LocalStorage {
    fn name(&self) -> &'static str {
        "localStorage"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Backend {
                store: "localStorage",
                message: format!("{:?}", e),
            })
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        // Throws QuotaExceededError when full
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Backend {
                store: "localStorage",
                message: format!("{:?}", e),
            })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Backend {
                store: "localStorage",
                message: format!("{:?}", e),
            })
    }
}
