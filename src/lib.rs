//! Visa Wizard - A multi-step visa application form with auto-save
//!
//! Core modules:
//! - `schema`: Declarative step/field layout of the form
//! - `form`: Field values and live form state
//! - `validation`: Per-field and per-step rules
//! - `store`: Cookie / LocalStorage / in-memory backing stores
//! - `persistence`: Saved document, fallback, expiry and migration
//! - `wizard`: Step state machine, auto-save and restore controllers
//! - `platform`: Browser/native platform abstraction
//! - `ui`: Presentation boundary (DOM renderer on wasm)

pub mod config;
pub mod countries;
pub mod error;
pub mod form;
pub mod persistence;
pub mod platform;
pub mod schema;
pub mod store;
pub mod ui;
pub mod validation;
pub mod wizard;

pub use config::WizardConfig;
pub use error::{DocumentError, StoreError, SubmissionError, ValidationError};
pub use form::{FieldMap, FieldValue, FormObject, FormState};
pub use persistence::{PersistedDocument, PersistenceStore, SaveInfo, SaveOutcome};
pub use schema::FormSchema;
pub use wizard::{AutoSaveController, FieldChanged, RestoreController, Wizard};

/// Form-wide constants
pub mod consts {
    /// Version tag written into saved documents
    pub const SCHEMA_VERSION: &str = "2.0";
}
