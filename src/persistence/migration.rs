//! Reading documents written by older versions of the form
//!
//! Three shapes have been written over time:
//! - current: `{step_N..., savedAt, expiresAt, schemaVersion}`
//! - envelope: `{formData: {step_N...}, timestamp, expires, version}`
//! - legacy: bare `{step_N..., lastSave | timestamp}` without expiry
//!
//! Legacy documents carry no expiry, so they are only picked up by the
//! explicit legacy load path and rewritten in the current shape.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::envelope::{PersistedDocument, decode_steps, decode_timestamp, parse_object};
use crate::error::DocumentError;

/// Which shape a stored document had
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredShape {
    Current,
    Envelope,
    Legacy,
}

/// Version assumed for documents that never recorded one
pub const LEGACY_VERSION: &str = "1.0";

/// Decode any known shape.
///
/// `now` and `ttl` stamp legacy documents, which have no expiry of their own.
pub fn decode(
    json: &str,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<(PersistedDocument, StoredShape), DocumentError> {
    let object = parse_object(json)?;

    if let Some(form_data) = object.get("formData") {
        let Value::Object(inner) = form_data else {
            return Err(DocumentError::MalformedStep("formData".to_string()));
        };
        let saved_at = match object.get("timestamp") {
            Some(v) => decode_timestamp("timestamp", v)?,
            None => now,
        };
        let expires_at = match object.get("expires") {
            Some(v) => decode_timestamp("expires", v)?,
            None => saved_at + ttl,
        };
        let doc = PersistedDocument {
            steps: decode_steps(inner)?,
            saved_at,
            expires_at,
            schema_version: version(object.get("version")),
        };
        return Ok((doc, StoredShape::Envelope));
    }

    if let Some(expires) = object.get("expiresAt") {
        let expires_at = decode_timestamp("expiresAt", expires)?;
        let saved_at = match object.get("savedAt") {
            Some(v) => decode_timestamp("savedAt", v)?,
            None => now,
        };
        let doc = PersistedDocument {
            steps: decode_steps(&object)?,
            saved_at,
            expires_at,
            schema_version: version(object.get("schemaVersion")),
        };
        return Ok((doc, StoredShape::Current));
    }

    // A malformed legacy timestamp is not worth losing the data over
    let saved_at = object
        .get("lastSave")
        .or_else(|| object.get("timestamp"))
        .and_then(|v| decode_timestamp("lastSave", v).ok())
        .unwrap_or(now);
    let doc = PersistedDocument {
        steps: decode_steps(&object)?,
        saved_at,
        expires_at: now + ttl,
        schema_version: LEGACY_VERSION.to_string(),
    };
    Ok((doc, StoredShape::Legacy))
}

fn version(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_VERSION)
        .to_string()
}

/// Bring a decoded document up to the current shape: filtered values, the
/// current schema version and a fresh expiry.
pub fn migrate(
    doc: &PersistedDocument,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
    schema_version: &str,
) -> PersistedDocument {
    let mut migrated = doc.filtered();
    migrated.expires_at = now + ttl;
    migrated.schema_version = schema_version.to_string();
    migrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn ttl() -> chrono::Duration {
        chrono::Duration::days(30)
    }

    #[test]
    fn test_decode_current() {
        let json = r#"{"step_1":{"firstName":"Ana"},"savedAt":"2025-02-28T10:00:00.000Z",
            "expiresAt":"2025-03-30T10:00:00.000Z","schemaVersion":"2.0"}"#;
        let (doc, shape) = decode(json, now(), ttl()).unwrap();
        assert_eq!(shape, StoredShape::Current);
        assert_eq!(doc.step(0).unwrap()["firstName"], FieldValue::from("Ana"));
        assert_eq!(doc.schema_version, "2.0");
    }

    #[test]
    fn test_decode_envelope() {
        let json = r#"{"formData":{"step_2":{"passportNumber":"G1234567"}},
            "timestamp":"2025-02-01T00:00:00.000Z","expires":"2025-03-03T00:00:00.000Z",
            "version":"2.0"}"#;
        let (doc, shape) = decode(json, now(), ttl()).unwrap();
        assert_eq!(shape, StoredShape::Envelope);
        assert!(doc.step(1).is_some());
        assert!(!doc.is_expired(now()));
    }

    #[test]
    fn test_decode_legacy_gets_fresh_expiry() {
        let json = r#"{"step_1":{"firstName":"Ana","lastName":"undefined"},
            "lastSave":"2024-12-01T08:00:00.000Z"}"#;
        let (doc, shape) = decode(json, now(), ttl()).unwrap();
        assert_eq!(shape, StoredShape::Legacy);
        assert_eq!(doc.schema_version, LEGACY_VERSION);
        assert_eq!(doc.expires_at, now() + ttl());
        assert_eq!(doc.saved_at, Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap());

        let migrated = migrate(&doc, now(), ttl(), "2.0");
        assert_eq!(migrated.schema_version, "2.0");
        assert_eq!(migrated.step(0).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not json", now(), ttl()),
            Err(DocumentError::Json(_))
        ));
        assert_eq!(
            decode("[1,2]", now(), ttl()).unwrap_err(),
            DocumentError::NotAnObject
        );
        assert!(matches!(
            decode(r#"{"expiresAt":"soon"}"#, now(), ttl()),
            Err(DocumentError::BadTimestamp { .. })
        ));
    }
}
