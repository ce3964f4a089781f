//! Field and step validation
//!
//! Rules run in a fixed order: an empty optional field is always valid, an
//! empty required field is always invalid, and only non-empty values reach
//! the kind/rule checks.

use std::rc::Rc;
use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;

use crate::error::ValidationError;
use crate::form::{FieldValue, FormState};
use crate::platform::Clock;
use crate::schema::{FieldKind, FieldRule, FieldSpec, FormSchema};
use crate::ui::{FormRenderer, Indicator, Severity};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern"));
static PASSPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{6,9}$").expect("passport pattern"));

/// Aggregate message shown when any field in a step fails
pub const STEP_INVALID_MESSAGE: &str = "Please complete all required fields correctly";

/// HTML date inputs always submit `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Digits with an optional leading `+`, spaces ignored, 1-16 digits
pub fn is_valid_phone(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE.is_match(&compact)
}

pub fn is_valid_passport_number(value: &str) -> bool {
    PASSPORT.is_match(value)
}

/// The value as the validator sees it: trimmed text, or "" when empty
fn effective_text(kind: FieldKind, value: Option<&FieldValue>) -> String {
    match (kind, value) {
        (FieldKind::Checkbox, Some(v)) if v.is_checked() => "true".to_string(),
        (FieldKind::Checkbox, _) => String::new(),
        (_, Some(FieldValue::Text(s))) if s != crate::form::UNDEFINED_SENTINEL => {
            s.trim().to_string()
        }
        (_, Some(FieldValue::Flag(true))) => "true".to_string(),
        _ => String::new(),
    }
}

/// Stateless rule engine; only "today" comes from outside
pub struct FieldValidator {
    clock: Rc<dyn Clock>,
}

impl FieldValidator {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Pure check, no UI side effects
    pub fn check(
        &self,
        spec: &FieldSpec,
        value: Option<&FieldValue>,
        required: bool,
    ) -> Result<(), ValidationError> {
        let text = effective_text(spec.kind, value);
        if text.is_empty() {
            return if required {
                Err(ValidationError::Required)
            } else {
                Ok(())
            };
        }

        match spec.kind {
            FieldKind::Email if !is_valid_email(&text) => {
                return Err(ValidationError::InvalidEmail);
            }
            FieldKind::Tel if !is_valid_phone(&text) => {
                return Err(ValidationError::InvalidPhone);
            }
            FieldKind::Date => self.check_date(spec.rule, &text)?,
            _ => {}
        }

        if spec.rule == FieldRule::PassportNumber && !is_valid_passport_number(&text) {
            return Err(ValidationError::InvalidPassportNumber);
        }

        Ok(())
    }

    fn check_date(&self, rule: FieldRule, text: &str) -> Result<(), ValidationError> {
        let date = parse_date(text).ok_or(ValidationError::InvalidDate)?;
        let today = self.clock.today();
        match rule {
            FieldRule::PassportExpiry => {
                let limit = today
                    .checked_add_months(Months::new(6))
                    .ok_or(ValidationError::InvalidDate)?;
                if date <= limit {
                    return Err(ValidationError::PassportExpiresTooSoon);
                }
            }
            FieldRule::BirthDate => {
                if date > today {
                    return Err(ValidationError::BirthDateInFuture);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Validate one field and paint its indicator
    pub fn validate_field(
        &self,
        spec: &FieldSpec,
        form: &FormState,
        ui: &mut dyn FormRenderer,
    ) -> bool {
        let value = form.value(&spec.name);
        let required = form.is_required(&spec.name);
        match self.check(spec, value, required) {
            Ok(()) => {
                let empty = effective_text(spec.kind, value).is_empty();
                let indicator = if empty { Indicator::Neutral } else { Indicator::Ok };
                ui.set_indicator(&spec.name, indicator, None);
                true
            }
            Err(e) => {
                ui.set_indicator(&spec.name, Indicator::Error, Some(&e.to_string()));
                false
            }
        }
    }

    /// Validate every field of a step. All fields are visited so every
    /// indicator is painted; one aggregate toast on failure.
    pub fn validate_step(
        &self,
        schema: &FormSchema,
        step_index: usize,
        form: &FormState,
        ui: &mut dyn FormRenderer,
    ) -> bool {
        let Some(step) = schema.step(step_index) else {
            return false;
        };

        let mut valid = true;
        for field in &step.fields {
            valid &= self.validate_field(field, form, ui);
        }

        if !valid {
            ui.notify(STEP_INVALID_MESSAGE, Severity::Error);
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualClock;
    use crate::ui::RecordingRenderer;
    use chrono::{TimeZone, Utc};

    fn validator() -> FieldValidator {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();
        FieldValidator::new(Rc::new(ManualClock::new(now)))
    }

    fn spec(kind: FieldKind) -> FieldSpec {
        FieldSpec::new("f", kind)
    }

    #[test]
    fn test_required_and_optional_empty() {
        let v = validator();
        for kind in [
            FieldKind::Text,
            FieldKind::Email,
            FieldKind::Tel,
            FieldKind::Date,
            FieldKind::Select,
            FieldKind::Radio,
            FieldKind::Checkbox,
        ] {
            let empty = FieldValue::from("  ");
            assert_eq!(v.check(&spec(kind), None, true), Err(ValidationError::Required));
            assert_eq!(
                v.check(&spec(kind), Some(&empty), true),
                Err(ValidationError::Required)
            );
            assert_eq!(v.check(&spec(kind), None, false), Ok(()));
            assert_eq!(v.check(&spec(kind), Some(&empty), false), Ok(()));
        }
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("+52 55 1234 5678"));
        assert!(is_valid_phone("5"));
        assert!(is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("12345678901234567"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("+"));
    }

    #[test]
    fn test_passport_number() {
        assert!(is_valid_passport_number("G1234567"));
        assert!(is_valid_passport_number("AB1234"));
        assert!(!is_valid_passport_number("ab1234"));
        assert!(!is_valid_passport_number("AB123"));
        assert!(!is_valid_passport_number("AB12345678"));

        let v = validator();
        let field = spec(FieldKind::Text).rule(FieldRule::PassportNumber);
        assert_eq!(
            v.check(&field, Some(&"x-1".into()), true),
            Err(ValidationError::InvalidPassportNumber)
        );
    }

    #[test]
    fn test_passport_expiry_needs_six_months() {
        let v = validator();
        let field = spec(FieldKind::Date).rule(FieldRule::PassportExpiry);
        assert_eq!(
            v.check(&field, Some(&"2025-03-15".into()), true),
            Err(ValidationError::PassportExpiresTooSoon)
        );
        assert_eq!(
            v.check(&field, Some(&"2025-09-15".into()), true),
            Err(ValidationError::PassportExpiresTooSoon)
        );
        assert_eq!(v.check(&field, Some(&"2025-09-16".into()), true), Ok(()));
        assert_eq!(v.check(&field, Some(&"2025-10-15".into()), true), Ok(()));
    }

    #[test]
    fn test_birth_date_not_in_future() {
        let v = validator();
        let field = spec(FieldKind::Date).rule(FieldRule::BirthDate);
        assert_eq!(v.check(&field, Some(&"2025-03-15".into()), true), Ok(()));
        assert_eq!(
            v.check(&field, Some(&"2025-03-16".into()), true),
            Err(ValidationError::BirthDateInFuture)
        );
        assert_eq!(
            v.check(&field, Some(&"15/03/1990".into()), true),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn test_validate_field_paints_indicator() {
        let v = validator();
        let schema = FormSchema::visa_application();
        let mut form = FormState::new(&schema);
        let mut ui = RecordingRenderer::default();
        let (_, email) = schema.field("email").unwrap();

        form.set("email", "nope".into());
        assert!(!v.validate_field(email, &form, &mut ui));
        assert_eq!(ui.indicator("email"), Some(Indicator::Error));

        form.set("email", "ana@example.com".into());
        assert!(v.validate_field(email, &form, &mut ui));
        assert_eq!(ui.indicator("email"), Some(Indicator::Ok));

        let (_, optional) = schema.field("secondaryPhone").unwrap();
        assert!(v.validate_field(optional, &form, &mut ui));
        assert_eq!(ui.indicator("secondaryPhone"), Some(Indicator::Neutral));
    }

    #[test]
    fn test_validate_step_visits_every_field() {
        let v = validator();
        let schema = FormSchema::visa_application();
        let form = FormState::new(&schema);
        let mut ui = RecordingRenderer::default();

        assert!(!v.validate_step(&schema, 0, &form, &mut ui));
        assert_eq!(ui.indicators.len(), schema.steps[0].fields.len());
        assert_eq!(ui.errors().collect::<Vec<_>>(), vec![STEP_INVALID_MESSAGE]);
    }

    #[test]
    fn test_validate_step_out_of_range() {
        let v = validator();
        let schema = FormSchema::visa_application();
        let form = FormState::new(&schema);
        let mut ui = RecordingRenderer::default();
        assert!(!v.validate_step(&schema, 99, &form, &mut ui));
    }

    #[test]
    fn test_conditional_requirement_is_enforced() {
        let v = validator();
        let schema = FormSchema::visa_application();
        let mut form = FormState::new(&schema);
        let (_, name) = schema.field("usRelativeName").unwrap();
        assert_eq!(v.check(name, None, form.is_required("usRelativeName")), Ok(()));

        form.check_radio("usRelative", "yes");
        form.apply_conditionals(&schema, "usRelative");
        assert_eq!(
            v.check(name, None, form.is_required("usRelativeName")),
            Err(ValidationError::Required)
        );
    }
}
