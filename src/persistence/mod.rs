//! Layered save/load of the form document
//!
//! Features:
//! - Versioned flat JSON envelope with expiry
//! - Primary (cookie) store with transparent fallback to the secondary store
//! - Invalid-value filtering before every write
//! - Lazy expiry and corrupted-entry purge on load
//! - Migration of documents written by older versions

pub mod envelope;
pub mod info;
pub mod migration;
pub mod pending;
pub mod validation;

use std::rc::Rc;

use crate::config::WizardConfig;
use crate::form::FieldMap;
use crate::platform::Clock;
use crate::store::BackingStore;

pub use envelope::{PersistedDocument, step_index, step_key};
pub use info::{SaveInfo, format_relative};
pub use migration::StoredShape;
pub use pending::{PendingQueue, PendingSubmission};
pub use validation::filter_invalid;

/// Result of [`PersistenceStore::save_step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The step held no value worth keeping; nothing was written
    NothingToSave,
    /// Neither store accepted the write
    Unavailable,
}

impl SaveOutcome {
    pub fn is_saved(self) -> bool {
        self == SaveOutcome::Saved
    }
}

/// The form document over a primary and a secondary backing store.
///
/// Store errors never leave this type: they are logged and turned into
/// `false` / `None`.
pub struct PersistenceStore {
    primary: Box<dyn BackingStore>,
    secondary: Box<dyn BackingStore>,
    clock: Rc<dyn Clock>,
    key: String,
    pending_key: String,
    ttl: chrono::Duration,
    schema_version: String,
}

impl PersistenceStore {
    pub fn new(
        primary: Box<dyn BackingStore>,
        secondary: Box<dyn BackingStore>,
        clock: Rc<dyn Clock>,
        config: &WizardConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            clock,
            key: config.document_key.clone(),
            pending_key: config.pending_key.clone(),
            ttl: config.expiry(),
            schema_version: config.schema_version.clone(),
        }
    }

    fn stores(&self) -> [&dyn BackingStore; 2] {
        [self.primary.as_ref(), self.secondary.as_ref()]
    }

    fn remove_from(&self, store: &dyn BackingStore) {
        if let Err(e) = store.remove(&self.key) {
            log::warn!("Could not remove saved data from {}: {}", store.name(), e);
        }
    }

    /// Write the document (filtered) to the primary store, falling back to
    /// the secondary one. True iff some store accepted it.
    pub fn save(&self, doc: &PersistedDocument) -> bool {
        let doc = doc.filtered();
        let json = match doc.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Could not serialize form data: {}", e);
                return false;
            }
        };

        match self.primary.set(&self.key, &json, Some(doc.expires_at)) {
            Ok(()) => {
                log::debug!("Saved {} bytes to {}", json.len(), self.primary.name());
                // A stale fallback copy must not outlive a newer primary save
                self.remove_from(self.secondary.as_ref());
                true
            }
            Err(e) => {
                log::warn!("{}, falling back to {}", e, self.secondary.name());
                match self.secondary.set(&self.key, &json, Some(doc.expires_at)) {
                    Ok(()) => {
                        self.remove_from(self.primary.as_ref());
                        true
                    }
                    Err(e) => {
                        log::error!("Could not save form data anywhere: {}", e);
                        false
                    }
                }
            }
        }
    }

    /// Merge one step into the stored document and save it
    pub fn save_step(&self, index: usize, fields: &FieldMap) -> SaveOutcome {
        let fields = filter_invalid(fields);
        if fields.is_empty() {
            log::debug!("Step {} has no values to save", index + 1);
            return SaveOutcome::NothingToSave;
        }

        let now = self.clock.now();
        let mut doc = self
            .load()
            .unwrap_or_else(|| PersistedDocument::new(now, self.ttl, &self.schema_version));
        doc.set_step(index, fields);
        doc.touch(now, self.ttl);
        doc.schema_version = self.schema_version.clone();
        if self.save(&doc) {
            SaveOutcome::Saved
        } else {
            SaveOutcome::Unavailable
        }
    }

    /// Read one store. Expired, unreadable and all-empty entries are removed
    /// from it; legacy documents are left alone for [`Self::load_legacy`].
    fn load_from(&self, store: &dyn BackingStore) -> Option<PersistedDocument> {
        let raw = match store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("{} unavailable: {}", store.name(), e);
                return None;
            }
        };

        let now = self.clock.now();
        match migration::decode(&raw, now, self.ttl) {
            Ok((_, StoredShape::Legacy)) => {
                log::debug!("Legacy document in {}, skipping", store.name());
                None
            }
            Ok((doc, _)) if doc.is_expired(now) => {
                log::info!("Saved data in {} expired, removing", store.name());
                self.remove_from(store);
                None
            }
            Ok((doc, _)) => {
                let doc = doc.filtered();
                if doc.is_empty() {
                    log::warn!("Saved data in {} holds no values, removing", store.name());
                    self.remove_from(store);
                    None
                } else {
                    Some(doc)
                }
            }
            Err(e) => {
                log::warn!("Corrupted data in {} ({}), removing", store.name(), e);
                self.remove_from(store);
                None
            }
        }
    }

    /// The saved document, primary store first. `None` when both stores are
    /// empty, unreadable or expired.
    pub fn load(&self) -> Option<PersistedDocument> {
        self.stores().into_iter().find_map(|s| self.load_from(s))
    }

    /// Legacy documents (no expiry) from the secondary store, migrated to the
    /// current shape and saved back.
    pub fn load_legacy(&self) -> Option<PersistedDocument> {
        let raw = match self.secondary.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("{} unavailable: {}", self.secondary.name(), e);
                return None;
            }
        };

        let now = self.clock.now();
        let doc = match migration::decode(&raw, now, self.ttl) {
            Ok((doc, StoredShape::Legacy)) => doc,
            Ok(_) => return None,
            Err(e) => {
                log::warn!("Legacy data unreadable: {}", e);
                return None;
            }
        };

        let migrated = migration::migrate(&doc, now, self.ttl, &self.schema_version);
        if migrated.is_empty() {
            return None;
        }
        log::info!(
            "Migrated {} legacy steps from {}",
            migrated.steps.len(),
            self.secondary.name()
        );
        self.save(&migrated);
        Some(migrated)
    }

    /// Remove the document from both stores. Never fails.
    pub fn clear(&self) {
        for store in self.stores() {
            self.remove_from(store);
        }
        log::info!("Saved form data cleared");
    }

    pub fn has_saved_data(&self) -> bool {
        self.load().is_some()
    }

    pub fn info(&self) -> Option<SaveInfo> {
        self.load().map(|doc| SaveInfo::from_document(&doc))
    }

    /// Remove any stored document holding sentinel or `null` values (left by
    /// older versions) from both stores. True when something was purged.
    pub fn purge_corrupted(&self) -> bool {
        let now = self.clock.now();
        let corrupted = self.stores().into_iter().any(|store| {
            matches!(store.get(&self.key), Ok(Some(raw))
                if migration::decode(&raw, now, self.ttl)
                    .is_ok_and(|(doc, _)| doc.has_sentinels()))
        });
        if corrupted {
            log::warn!("Saved data contains invalid values, purging");
            self.clear();
        }
        corrupted
    }

    /// Queue of submissions waiting for a retry
    pub fn pending(&self) -> PendingQueue<'_> {
        PendingQueue::new(self.secondary.as_ref(), &self.pending_key)
    }
}
