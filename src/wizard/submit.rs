//! Remote submission seam

use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::form::FormObject;

/// What the submission service answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmissionResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// Collapse `{success: false}` into an error
    pub fn into_result(self) -> Result<(), SubmissionError> {
        if self.success {
            Ok(())
        } else {
            Err(SubmissionError::Rejected(
                self.error.unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }
}

/// Sends a finished form somewhere
pub trait Submitter {
    fn submit(&mut self, form: &FormObject) -> Result<SubmissionResponse, SubmissionError>;
}

/// Used when no endpoint is configured: every form goes to the local queue
#[derive(Debug, Default)]
pub struct QueueOnly;

impl Submitter for QueueOnly {
    fn submit(&mut self, _form: &FormObject) -> Result<SubmissionResponse, SubmissionError> {
        Ok(SubmissionResponse::rejected("no submission endpoint configured"))
    }
}

/// How a submit attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Guard failed (certifications, validation or already in flight)
    Blocked,
    /// Accepted remotely; saved data cleared, wizard back at step 0
    Submitted,
    /// Failed remotely, kept in the pending queue under this reference
    Queued { reference: String },
    /// Failed remotely and could not be queued either
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json() {
        let ok: SubmissionResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(ok.into_result(), Ok(()));

        let err: SubmissionResponse =
            serde_json::from_str(r#"{"success":false,"error":"quota"}"#).unwrap();
        assert_eq!(
            err.into_result(),
            Err(SubmissionError::Rejected("quota".to_string()))
        );
    }
}
