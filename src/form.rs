//! Field values and the in-memory form
//!
//! `FormState` stands in for the live inputs: current values, which fields are
//! required right now, and the options each select/radio group offers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::countries::strip_flag;
use crate::schema::{Choices, FieldKind, FormSchema, SelectOption, StepSchema};

/// Literal left behind by `String(undefined)` in old saves
pub const UNDEFINED_SENTINEL: &str = "undefined";

/// A single field value as stored and restored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    /// JSON `null`
    Absent,
}

impl FieldValue {
    /// False for absent, sentinel, empty and whitespace-only values
    pub fn is_meaningful(&self) -> bool {
        match self {
            FieldValue::Flag(_) => true,
            FieldValue::Text(s) => s != UNDEFINED_SENTINEL && !s.trim().is_empty(),
            FieldValue::Absent => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Checkbox semantics: `true` or the string `"true"`
    pub fn is_checked(&self) -> bool {
        match self {
            FieldValue::Flag(b) => *b,
            FieldValue::Text(s) => s == "true",
            FieldValue::Absent => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Absent => Ok(()),
        }
    }
}

/// Field name -> value for one step
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Every filled field across all steps, as sent for review and submission
pub type FormObject = FieldMap;

/// Current input values plus the dynamic bits of the form
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: BTreeMap<String, FieldValue>,
    required: BTreeSet<String>,
    options: BTreeMap<String, Vec<SelectOption>>,
}

impl FormState {
    pub fn new(schema: &FormSchema) -> Self {
        let mut state = Self::default();
        for field in schema.fields() {
            if let Choices::Fixed(options) = &field.choices {
                state.options.insert(field.name.clone(), options.clone());
            }
        }
        state.reset(schema);
        state
    }

    /// Clear every value and restore the schema's required flags.
    /// Options stay: they come from reference data, not the user.
    pub fn reset(&mut self, schema: &FormSchema) {
        self.values.clear();
        self.required = schema
            .fields()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect();
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Text value, or "" when unset or not text
    pub fn text(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn clear(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    pub fn set_required(&mut self, name: &str, required: bool) {
        if required {
            self.required.insert(name.to_string());
        } else {
            self.required.remove(name);
        }
    }

    pub fn options(&self, name: &str) -> &[SelectOption] {
        self.options.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_options(&mut self, name: &str, options: Vec<SelectOption>) {
        self.options.insert(name.to_string(), options);
    }

    /// Check the radio button `[name, value]`; false when no such button exists
    pub fn check_radio(&mut self, name: &str, value: &str) -> bool {
        if self.options(name).iter().any(|o| o.value == value) {
            self.set(name, FieldValue::from(value));
            true
        } else {
            false
        }
    }

    /// Assign a select by option value, falling back to the option whose
    /// label (minus any flag emoji) equals `value`. False when nothing matches.
    pub fn assign_select(&mut self, name: &str, value: &str) -> bool {
        let matched = self
            .options(name)
            .iter()
            .find(|o| o.value == value)
            .or_else(|| self.options(name).iter().find(|o| strip_flag(&o.label) == value))
            .map(|o| o.value.clone());

        match matched {
            Some(v) => {
                self.set(name, FieldValue::Text(v));
                true
            }
            None => false,
        }
    }

    /// Re-evaluate the required flags driven by radio group `trigger`
    pub fn apply_conditionals(&mut self, schema: &FormSchema, trigger: &str) {
        let answer = self.text(trigger).to_string();
        for rule in schema.conditionals_for(trigger) {
            let on = answer == rule.value;
            for dependent in &rule.dependents {
                self.set_required(dependent, on);
            }
        }
    }

    /// Values for one step as a user would submit them: the checked value per
    /// radio group, `true` for ticked checkboxes, raw text otherwise.
    pub fn collect_step(&self, step: &StepSchema) -> FieldMap {
        let mut out = FieldMap::new();
        for field in &step.fields {
            let Some(value) = self.values.get(&field.name) else {
                continue;
            };
            match field.kind {
                FieldKind::Checkbox => {
                    if value.is_checked() {
                        out.insert(field.name.clone(), FieldValue::Flag(true));
                    }
                }
                _ => {
                    out.insert(field.name.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Every meaningful value across the form
    pub fn form_object(&self, schema: &FormSchema) -> FormObject {
        schema
            .steps
            .iter()
            .flat_map(|step| self.collect_step(step))
            .filter(|(_, v)| v.is_meaningful())
            .collect()
    }
}
