//! Saved document envelope
//!
//! On disk the document is a flat JSON object: one `step_<n>` entry per saved
//! step (1-based) next to `savedAt`, `expiresAt` and `schemaVersion`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::validation::{filter_invalid, has_sentinels, has_valid_values};
use crate::error::DocumentError;
use crate::form::{FieldMap, FieldValue};

pub const STEP_PREFIX: &str = "step_";

/// Storage key of the step at `index`
pub fn step_key(index: usize) -> String {
    format!("{}{}", STEP_PREFIX, index + 1)
}

/// Inverse of [`step_key`]; `None` for anything that is not `step_<n>`, n >= 1
pub fn step_index(key: &str) -> Option<usize> {
    let n: usize = key.strip_prefix(STEP_PREFIX)?.parse().ok()?;
    n.checked_sub(1)
}

/// The whole saved form
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedDocument {
    /// Keyed by `step_<n>`
    pub steps: BTreeMap<String, FieldMap>,
    pub saved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub schema_version: String,
}

impl PersistedDocument {
    pub fn new(now: DateTime<Utc>, ttl: chrono::Duration, schema_version: &str) -> Self {
        Self {
            steps: BTreeMap::new(),
            saved_at: now,
            expires_at: now + ttl,
            schema_version: schema_version.to_string(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Refresh both timestamps
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) {
        self.saved_at = now;
        self.expires_at = now + ttl;
    }

    pub fn step(&self, index: usize) -> Option<&FieldMap> {
        self.steps.get(&step_key(index))
    }

    /// Replace one step's entry (assignment, not merge)
    pub fn set_step(&mut self, index: usize, fields: FieldMap) {
        self.steps.insert(step_key(index), fields);
    }

    /// Steps in index order, skipping keys that are not `step_<n>`
    pub fn indexed_steps(&self) -> impl Iterator<Item = (usize, &FieldMap)> {
        let mut steps: Vec<_> = self
            .steps
            .iter()
            .filter_map(|(k, v)| step_index(k).map(|i| (i, v)))
            .collect();
        steps.sort_by_key(|(i, _)| *i);
        steps.into_iter()
    }

    /// No step has a single persistable value
    pub fn is_empty(&self) -> bool {
        !self.steps.values().any(has_valid_values)
    }

    pub fn has_sentinels(&self) -> bool {
        self.steps.values().any(has_sentinels)
    }

    /// Copy with invalid values and emptied steps removed
    pub fn filtered(&self) -> Self {
        let steps = self
            .steps
            .iter()
            .map(|(k, v)| (k.clone(), filter_invalid(v)))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self {
            steps,
            ..self.clone()
        }
    }

    /// Number of persistable values across every step
    pub fn field_count(&self) -> usize {
        self.steps
            .values()
            .map(|s| s.values().filter(|v| v.is_meaningful()).count())
            .sum()
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        let mut object = Map::new();
        for (key, fields) in &self.steps {
            object.insert(key.clone(), serde_json::to_value(fields)?);
        }
        object.insert("savedAt".into(), Value::String(iso(self.saved_at)));
        object.insert("expiresAt".into(), Value::String(iso(self.expires_at)));
        object.insert(
            "schemaVersion".into(),
            Value::String(self.schema_version.clone()),
        );
        Ok(serde_json::to_string(&Value::Object(object))?)
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a JSON object, rejecting anything else
pub(crate) fn parse_object(json: &str) -> Result<Map<String, Value>, DocumentError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(object) => Ok(object),
        _ => Err(DocumentError::NotAnObject),
    }
}

/// One stored field map. Numbers are kept as their text form.
pub(crate) fn decode_fields(key: &str, value: &Value) -> Result<FieldMap, DocumentError> {
    let Value::Object(entries) = value else {
        return Err(DocumentError::MalformedStep(key.to_string()));
    };
    entries
        .iter()
        .map(|(name, v)| {
            let value = match v {
                Value::String(s) => FieldValue::Text(s.clone()),
                Value::Bool(b) => FieldValue::Flag(*b),
                Value::Null => FieldValue::Absent,
                Value::Number(n) => FieldValue::Text(n.to_string()),
                _ => return Err(DocumentError::MalformedStep(key.to_string())),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

/// Every `step_<n>` entry of an object
pub(crate) fn decode_steps(
    object: &Map<String, Value>,
) -> Result<BTreeMap<String, FieldMap>, DocumentError> {
    object
        .iter()
        .filter(|(k, _)| step_index(k).is_some())
        .map(|(k, v)| Ok((k.clone(), decode_fields(k, v)?)))
        .collect()
}

/// ISO-8601 string or epoch milliseconds
pub(crate) fn decode_timestamp(
    field: &'static str,
    value: &Value,
) -> Result<DateTime<Utc>, DocumentError> {
    let bad = || DocumentError::BadTimestamp {
        field,
        value: value.to_string(),
    };
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| bad()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(bad),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_step_keys_are_one_based() {
        assert_eq!(step_key(0), "step_1");
        assert_eq!(step_index("step_1"), Some(0));
        assert_eq!(step_index("step_9"), Some(8));
        assert_eq!(step_index("step_0"), None);
        assert_eq!(step_index("savedAt"), None);
        assert_eq!(step_index("step_x"), None);
    }

    #[test]
    fn test_json_shape() {
        let mut doc = PersistedDocument::new(now(), chrono::Duration::days(30), "2.0");
        let mut fields = FieldMap::new();
        fields.insert("firstName".into(), "Ana".into());
        doc.set_step(0, fields);

        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["step_1"]["firstName"], "Ana");
        assert_eq!(json["savedAt"], "2025-03-01T12:00:00.000Z");
        assert_eq!(json["expiresAt"], "2025-03-31T12:00:00.000Z");
        assert_eq!(json["schemaVersion"], "2.0");
    }

    #[test]
    fn test_expiry_is_strict() {
        let doc = PersistedDocument::new(now(), chrono::Duration::days(1), "2.0");
        assert!(!doc.is_expired(doc.expires_at));
        assert!(doc.is_expired(doc.expires_at + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_decode_fields_coerces_numbers() {
        let value: Value = serde_json::from_str(r#"{"age":42,"ok":true,"x":null}"#).unwrap();
        let fields = decode_fields("step_1", &value).unwrap();
        assert_eq!(fields["age"], FieldValue::from("42"));
        assert_eq!(fields["ok"], FieldValue::Flag(true));
        assert_eq!(fields["x"], FieldValue::Absent);

        let nested: Value = serde_json::from_str(r#"{"a":[1]}"#).unwrap();
        assert!(matches!(
            decode_fields("step_2", &nested),
            Err(DocumentError::MalformedStep(_))
        ));
    }

    #[test]
    fn test_decode_timestamp_accepts_millis() {
        let ts = decode_timestamp("savedAt", &Value::from(now().timestamp_millis())).unwrap();
        assert_eq!(ts, now());
        assert!(decode_timestamp("savedAt", &Value::from("yesterday")).is_err());
    }

    #[test]
    fn test_filtered_drops_empty_steps() {
        let mut doc = PersistedDocument::new(now(), chrono::Duration::days(30), "2.0");
        let mut junk = FieldMap::new();
        junk.insert("a".into(), "undefined".into());
        doc.set_step(1, junk);
        assert!(doc.is_empty());
        assert!(doc.has_sentinels());
        assert!(doc.filtered().steps.is_empty());
    }
}
