//! Error types for the wizard.
//!
//! Every error here is caught at the boundary where it happens; none of them
//! propagate far enough to take the page down.

/// Failures reported by a single backing store (cookie jar, LocalStorage, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{store} is not available")]
    Unavailable { store: &'static str },

    #[error("{store} is disabled by the browser")]
    Disabled { store: &'static str },

    #[error("{store} capacity exceeded: {size} bytes > {capacity} bytes")]
    CapacityExceeded {
        store: &'static str,
        size: usize,
        capacity: usize,
    },

    #[error("{store} did not keep the written value for key {key}")]
    VerificationFailed { store: &'static str, key: String },

    #[error("{store} rejected operation: {message}")]
    Backend { store: &'static str, message: String },
}

/// A stored document that cannot be turned back into form data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("stored value is not valid JSON: {0}")]
    Json(String),

    #[error("stored value is not a JSON object")]
    NotAnObject,

    #[error("step entry {0} is not a field map")]
    MalformedStep(String),

    #[error("invalid timestamp in {field}: {value}")]
    BadTimestamp { field: &'static str, value: String },
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        DocumentError::Json(err.to_string())
    }
}

/// A field failing its validation rule. The display text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field required")]
    Required,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("please enter a valid phone number")]
    InvalidPhone,

    #[error("please enter a valid date")]
    InvalidDate,

    #[error("passport must be valid for more than six months")]
    PassportExpiresTooSoon,

    #[error("birth date cannot be in the future")]
    BirthDateInFuture,

    #[error("passport number must be 6-9 uppercase letters or digits")]
    InvalidPassportNumber,
}

/// Remote submission failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("submission service returned HTTP {0}")]
    Http(u16),

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("a submission is already in progress")]
    InFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::Required.to_string(), "field required");
        assert!(ValidationError::InvalidEmail.to_string().contains("email"));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::CapacityExceeded {
            store: "cookie",
            size: 5000,
            capacity: 4096,
        };
        assert_eq!(
            err.to_string(),
            "cookie capacity exceeded: 5000 bytes > 4096 bytes"
        );
    }
}
