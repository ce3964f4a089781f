//! Local queue of submissions the remote service did not accept
//!
//! Stored as a JSON array in the secondary (unbounded) store so the user can
//! resubmit later.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::form::FormObject;
use crate::store::BackingStore;

pub const REFERENCE_PREFIX: &str = "VH-";
const REFERENCE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
}

/// One queued submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub reference: String,
    pub form: FormObject,
    pub submission_date: DateTime<Utc>,
    pub status: PendingStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// Random `VH-XXXXXXXX` reference
pub fn generate_reference<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..REFERENCE_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
        .collect();
    format!("{}{}", REFERENCE_PREFIX, suffix)
}

/// Append-only list view over one key of a backing store
pub struct PendingQueue<'a> {
    store: &'a dyn BackingStore,
    key: &'a str,
}

impl<'a> PendingQueue<'a> {
    pub fn new(store: &'a dyn BackingStore, key: &'a str) -> Self {
        Self { store, key }
    }

    /// Every queued entry. An unreadable queue reads as empty.
    pub fn entries(&self) -> Vec<PendingSubmission> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Pending queue unreadable: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Pending queue corrupted, ignoring: {}", e);
                Vec::new()
            }
        }
    }

    fn write(&self, entries: &[PendingSubmission]) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries).map_err(|e| StoreError::Backend {
            store: self.store.name(),
            message: e.to_string(),
        })?;
        self.store.set(self.key, &json, None)
    }

    /// Queue a submission and return the stored entry
    pub fn push<R: Rng + ?Sized>(
        &self,
        form: FormObject,
        error: Option<String>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<PendingSubmission, StoreError> {
        let entry = PendingSubmission {
            reference: generate_reference(rng),
            form,
            submission_date: now,
            status: PendingStatus::Pending,
            error,
        };
        let mut entries = self.entries();
        entries.push(entry.clone());
        self.write(&entries)?;
        log::info!(
            "Queued submission {} ({} pending)",
            entry.reference,
            entries.len()
        );
        Ok(entry)
    }

    /// Drop one entry; false when no entry has that reference
    pub fn remove(&self, reference: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e.reference != reference);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn form() -> FormObject {
        let mut form = FormObject::new();
        form.insert("firstName".into(), FieldValue::from("Ana"));
        form
    }

    #[test]
    fn test_reference_shape() {
        let mut rng = Pcg32::seed_from_u64(7);
        let reference = generate_reference(&mut rng);
        assert!(reference.starts_with(REFERENCE_PREFIX));
        assert_eq!(reference.len(), REFERENCE_PREFIX.len() + REFERENCE_LEN);
        assert!(
            reference[REFERENCE_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_push_and_remove() {
        let store = MemoryStore::new();
        let queue = PendingQueue::new(&store, "visaSubmissions");
        let mut rng = Pcg32::seed_from_u64(1);
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let first = queue
            .push(form(), Some("HTTP 500".into()), now, &mut rng)
            .unwrap();
        queue.push(form(), None, now, &mut rng).unwrap();
        assert_eq!(queue.entries().len(), 2);

        let raw: serde_json::Value =
            serde_json::from_str(&store.peek("visaSubmissions").unwrap()).unwrap();
        assert_eq!(raw[0]["status"], "pending");
        assert_eq!(raw[0]["error"], "HTTP 500");
        assert_eq!(raw[0]["form"]["firstName"], "Ana");
        assert!(raw[0]["submissionDate"].is_string());

        assert!(queue.remove(&first.reference).unwrap());
        assert!(!queue.remove(&first.reference).unwrap());
        assert_eq!(queue.entries().len(), 1);
    }

    #[test]
    fn test_corrupted_queue_reads_empty() {
        let store = MemoryStore::new();
        store.insert_raw("visaSubmissions", "{oops");
        let queue = PendingQueue::new(&store, "visaSubmissions");
        assert!(queue.entries().is_empty());
    }
}
