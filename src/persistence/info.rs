//! Summary of what is saved, for the "last saved" badge and diagnostics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::envelope::PersistedDocument;

/// What the stored document holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInfo {
    pub steps_saved: usize,
    pub fields_saved: usize,
    pub saved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub schema_version: String,
}

impl SaveInfo {
    pub fn from_document(doc: &PersistedDocument) -> Self {
        Self {
            steps_saved: doc.indexed_steps().count(),
            fields_saved: doc.field_count(),
            saved_at: doc.saved_at,
            expires_at: doc.expires_at,
            schema_version: doc.schema_version.clone(),
        }
    }

    pub fn last_saved(&self, now: DateTime<Utc>) -> String {
        format_relative(self.saved_at, now)
    }
}

/// Format a timestamp relative to `now`
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - then;
    let mins = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if days >= 1 {
        if days == 1 {
            "Yesterday".to_string()
        } else if days < 7 {
            format!("{} days ago", days)
        } else {
            then.format("%-m/%-d/%y").to_string()
        }
    } else if hours >= 1 {
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if mins >= 1 {
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}
