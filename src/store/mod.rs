//! Key-value backing stores
//!
//! A backing store is one place a serialized document can live: the cookie
//! jar (small, expiring) or LocalStorage (larger, no expiry). Stores only move
//! strings; document shape, filtering and fallback live in `persistence`.

mod cookie;
#[cfg(target_arch = "wasm32")]
mod local;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use cookie::{CookieJar, decode_component, encode_component, find_cookie, format_set_cookie};
#[cfg(target_arch = "wasm32")]
pub use cookie::DocumentCookies;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

/// A string-keyed store with optional per-entry expiry
pub trait BackingStore {
    /// Short name for logs and errors
    fn name(&self) -> &'static str;

    /// Read a value; `Ok(None)` when the key is absent or expired
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value. Stores without expiry support ignore `expires_at`.
    fn set(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>)
    -> Result<(), StoreError>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    enabled: bool,
    writes: usize,
}

/// Unbounded in-memory store.
///
/// Cloning shares the underlying map, so a test can keep a handle while the
/// persistence layer owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryInner {
                enabled: true,
                ..Default::default()
            })),
        }
    }

    /// Simulate the user (or a privacy mode) disabling storage
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.borrow_mut().enabled = enabled;
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Raw value, bypassing the enabled flag
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Raw write, bypassing the enabled flag and the write counter
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    fn check_enabled(&self) -> Result<(), StoreError> {
        if self.inner.borrow().enabled {
            Ok(())
        } else {
            Err(StoreError::Disabled { store: "memory" })
        }
    }
}

impl BackingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_enabled()?;
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.check_enabled()?;
        let mut inner = self.inner.borrow_mut();
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        self.inner.borrow_mut().entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_shares_state_across_clones() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("k", "v", None).unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_memory_store_disabled() {
        let store = MemoryStore::new();
        store.set_enabled(false);
        assert!(matches!(
            store.set("k", "v", None),
            Err(StoreError::Disabled { .. })
        ));
        assert!(store.get("k").is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("missing").is_ok());
    }
}
