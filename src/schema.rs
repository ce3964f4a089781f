//! Declarative form layout
//!
//! Each wizard step lists its fields up front (name, input kind, required
//! flag, extra rule). Validation, auto-save and restore all read this schema
//! instead of walking a live DOM.

use serde::{Deserialize, Serialize};

/// Input element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Date,
    Number,
    TextArea,
    Select,
    Radio,
    Checkbox,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::TextArea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
        }
    }

    /// Kinds that fire a `change` event on pick rather than per keystroke
    pub fn is_selection(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio | FieldKind::Checkbox)
    }
}

/// Extra per-field rule on top of the kind check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRule {
    #[default]
    None,
    /// Date must be later than today + 6 months
    PassportExpiry,
    /// Date must not be in the future
    BirthDate,
    /// 6-9 chars of `[A-Z0-9]`
    PassportNumber,
}

/// One `<option>` (or radio button)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Where a select/radio gets its options from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Choices {
    #[default]
    None,
    Fixed(Vec<SelectOption>),
    /// Filled at runtime from the country reference data
    Countries,
}

/// One input in the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub rule: FieldRule,
    #[serde(default)]
    pub choices: Choices,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            rule: FieldRule::None,
            choices: Choices::None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn choices(mut self, choices: &[(&str, &str)]) -> Self {
        self.choices = Choices::Fixed(
            choices
                .iter()
                .map(|(value, label)| SelectOption::new(*value, *label))
                .collect(),
        );
        self
    }

    pub fn countries(mut self) -> Self {
        self.choices = Choices::Countries;
        self
    }
}

/// One page of the wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSchema {
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

/// A radio answer that makes other fields required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub trigger: String,
    pub value: String,
    pub dependents: Vec<String>,
}

/// The whole form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub steps: Vec<StepSchema>,
    #[serde(default)]
    pub conditionals: Vec<ConditionalRule>,
    /// Checkboxes that must all be ticked before submitting
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl FormSchema {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&StepSchema> {
        self.steps.get(index)
    }

    /// Look up a field and the index of the step that holds it
    pub fn field(&self, name: &str) -> Option<(usize, &FieldSpec)> {
        self.steps.iter().enumerate().find_map(|(i, step)| {
            step.fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| (i, f))
        })
    }

    /// All fields in step order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps.iter().flat_map(|s| s.fields.iter())
    }

    /// Rules triggered by a given radio group
    pub fn conditionals_for<'a>(
        &'a self,
        trigger: &'a str,
    ) -> impl Iterator<Item = &'a ConditionalRule> + 'a {
        self.conditionals.iter().filter(move |r| r.trigger == trigger)
    }

    /// The nine-step visa application
    pub fn visa_application() -> Self {
        use FieldKind::*;

        let yes_no = [("yes", "Yes"), ("no", "No")];

        let personal = StepSchema {
            title: "Personal information".to_string(),
            fields: vec![
                FieldSpec::new("firstName", Text).required(),
                FieldSpec::new("lastName", Text).required(),
                FieldSpec::new("fullNameNative", Text),
                FieldSpec::new("birthDate", Date)
                    .required()
                    .rule(FieldRule::BirthDate),
                FieldSpec::new("birthCity", Text).required(),
                FieldSpec::new("birthCountry", Select).required().countries(),
                FieldSpec::new("nationality", Select).required().countries(),
                FieldSpec::new("gender", Radio)
                    .required()
                    .choices(&[("male", "Male"), ("female", "Female")]),
                FieldSpec::new("maritalStatus", Select).required().choices(&[
                    ("single", "Single"),
                    ("married", "Married"),
                    ("divorced", "Divorced"),
                    ("widowed", "Widowed"),
                ]),
            ],
        };

        let passport = StepSchema {
            title: "Passport".to_string(),
            fields: vec![
                FieldSpec::new("passportNumber", Text)
                    .required()
                    .rule(FieldRule::PassportNumber),
                FieldSpec::new("passportIssuanceDate", Date).required(),
                FieldSpec::new("passportExpiryDate", Date)
                    .required()
                    .rule(FieldRule::PassportExpiry),
                FieldSpec::new("passportIssuingCountry", Select)
                    .required()
                    .countries(),
                FieldSpec::new("passportIssuingAuthority", Text).required(),
                FieldSpec::new("lostPassport", Radio).required().choices(&yes_no),
            ],
        };

        let contact = StepSchema {
            title: "Contact information".to_string(),
            fields: vec![
                FieldSpec::new("homeAddress", Text).required(),
                FieldSpec::new("city", Text).required(),
                FieldSpec::new("state", Text).required(),
                FieldSpec::new("zipCode", Text).required(),
                FieldSpec::new("country", Select).required().countries(),
                FieldSpec::new("phone", Tel).required(),
                FieldSpec::new("secondaryPhone", Tel),
                FieldSpec::new("email", Email).required(),
            ],
        };

        let travel = StepSchema {
            title: "Travel details".to_string(),
            fields: vec![
                FieldSpec::new("visaType", Select).required().choices(&[
                    ("B1/B2", "Business / Tourism (B1/B2)"),
                    ("F1", "Student (F1)"),
                    ("J1", "Exchange visitor (J1)"),
                    ("H1B", "Specialty occupation (H1B)"),
                ]),
                FieldSpec::new("purpose", TextArea).required(),
                FieldSpec::new("intendedArrivalDate", Date).required(),
                FieldSpec::new("intendedDepartureDate", Date),
                FieldSpec::new("duration", Text).required(),
                FieldSpec::new("usAddress", Text).required(),
                FieldSpec::new("visitedUS", Radio).required().choices(&yes_no),
            ],
        };

        let us_contact = StepSchema {
            title: "Contact in the United States".to_string(),
            fields: vec![
                FieldSpec::new("usContactName", Text),
                FieldSpec::new("usContactOrganization", Text),
                FieldSpec::new("usContactRelationship", Text),
                FieldSpec::new("usContactAddress", Text),
                FieldSpec::new("usContactPhone", Tel),
                FieldSpec::new("usContactEmail", Email),
            ],
        };

        let family = StepSchema {
            title: "Family".to_string(),
            fields: vec![
                FieldSpec::new("fatherName", Text),
                FieldSpec::new("motherName", Text),
                FieldSpec::new("usRelative", Radio).required().choices(&yes_no),
                FieldSpec::new("usRelativeName", Text),
                FieldSpec::new("usRelativeRelationship", Text),
                FieldSpec::new("usRelativeStatus", Select).choices(&[
                    ("citizen", "U.S. citizen"),
                    ("lpr", "Permanent resident"),
                    ("nonimmigrant", "Nonimmigrant"),
                    ("other", "Other"),
                ]),
            ],
        };

        let work = StepSchema {
            title: "Work and education".to_string(),
            fields: vec![
                FieldSpec::new("occupation", Text).required(),
                FieldSpec::new("employerName", Text).required(),
                FieldSpec::new("employerAddress", Text).required(),
                FieldSpec::new("employerCity", Text).required(),
                FieldSpec::new("employerPhone", Tel).required(),
                FieldSpec::new("monthlyIncome", Number).required(),
                FieldSpec::new("educationLevel", Select).required().choices(&[
                    ("secondary", "Secondary"),
                    ("bachelor", "Bachelor"),
                    ("master", "Master"),
                    ("doctorate", "Doctorate"),
                ]),
            ],
        };

        let security = StepSchema {
            title: "Security and background".to_string(),
            fields: vec![
                FieldSpec::new("healthDisorder", Radio).required().choices(&yes_no),
                FieldSpec::new("drugAddiction", Radio).required().choices(&yes_no),
                FieldSpec::new("criminal", Radio).required().choices(&yes_no),
                FieldSpec::new("immigrationViolation", Radio)
                    .required()
                    .choices(&yes_no),
                FieldSpec::new("terrorism", Radio).required().choices(&yes_no),
                FieldSpec::new("visaFraud", Radio).required().choices(&yes_no),
                FieldSpec::new("additionalSecurityInfo", TextArea),
            ],
        };

        let review = StepSchema {
            title: "Review and certification".to_string(),
            fields: vec![
                FieldSpec::new("certifyTruthful", Checkbox),
                FieldSpec::new("understandPenalties", Checkbox),
                FieldSpec::new("authorizeUse", Checkbox),
            ],
        };

        Self {
            steps: vec![
                personal, passport, contact, travel, us_contact, family, work, security, review,
            ],
            conditionals: vec![
                ConditionalRule {
                    trigger: "usRelative".to_string(),
                    value: "yes".to_string(),
                    dependents: vec![
                        "usRelativeName".to_string(),
                        "usRelativeRelationship".to_string(),
                        "usRelativeStatus".to_string(),
                    ],
                },
                ConditionalRule {
                    trigger: "criminal".to_string(),
                    value: "yes".to_string(),
                    dependents: vec!["additionalSecurityInfo".to_string()],
                },
            ],
            certifications: vec![
                "certifyTruthful".to_string(),
                "understandPenalties".to_string(),
                "authorizeUse".to_string(),
            ],
        }
    }
}
