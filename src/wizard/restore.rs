//! One-time restore of saved data at startup
//!
//! Phases, driven by the host's timer:
//! 1. `Waiting` for reference data (country options) to load
//! 2. `Settling` for a short delay so dependent options exist
//! 3. run the restore, then `Suppressing` auto-save for a settle window
//! 4. `Done`

use super::Wizard;
use crate::config::WizardConfig;
use crate::form::FieldValue;
use crate::persistence::PersistedDocument;
use crate::persistence::validation::is_valid_value;
use crate::schema::FieldKind;
use crate::ui::{FormRenderer, Severity};

pub const RESTORED_MESSAGE: &str = "Your saved data has been restored";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Waiting,
    Settling { run_at: u64 },
    Suppressing { until: u64 },
    Done,
}

#[derive(Debug, Clone)]
pub struct RestoreController {
    phase: RestorePhase,
    startup_settle_ms: u64,
    restore_settle_ms: u64,
}

impl RestoreController {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            phase: RestorePhase::Waiting,
            startup_settle_ms: config.startup_settle_ms,
            restore_settle_ms: config.restore_settle_ms,
        }
    }

    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RestorePhase::Done
    }

    /// Reference data has loaded; start the settling delay
    pub fn reference_data_ready(&mut self, now_ms: u64) {
        if self.phase == RestorePhase::Waiting {
            self.phase = RestorePhase::Settling {
                run_at: now_ms + self.startup_settle_ms,
            };
        }
    }

    /// Advance the phase machine. Returns the number of fields restored when
    /// this call ran the restore.
    pub fn poll<R: FormRenderer>(
        &mut self,
        wizard: &mut Wizard<R>,
        now_ms: u64,
    ) -> Option<usize> {
        match self.phase {
            RestorePhase::Settling { run_at } if now_ms >= run_at => {
                Some(self.run(wizard, now_ms))
            }
            RestorePhase::Suppressing { until } if now_ms >= until => {
                wizard.session.set_restoring(false);
                self.phase = RestorePhase::Done;
                log::info!("Restore finished, auto-save enabled");
                None
            }
            _ => None,
        }
    }

    /// Load and apply saved data, opening the suppression window when there
    /// is anything to apply
    fn run<R: FormRenderer>(&mut self, wizard: &mut Wizard<R>, now_ms: u64) -> usize {
        wizard.store.purge_corrupted();

        let doc = wizard
            .store
            .load()
            .or_else(|| wizard.store.load_legacy());
        let Some(doc) = doc else {
            log::info!("No saved data to restore");
            self.phase = RestorePhase::Done;
            return 0;
        };

        wizard.session.set_restoring(true);
        let restored = Self::restore_from(wizard, &doc);
        wizard.ui.notify(RESTORED_MESSAGE, Severity::Info);
        wizard.refresh_status();
        log::info!("Restored {} fields", restored);

        self.phase = RestorePhase::Suppressing {
            until: now_ms + self.restore_settle_ms,
        };
        restored
    }

    /// Assign every valid saved value to its input. Fields the form does not
    /// know, or whose value matches no option, are skipped. Assignment only,
    /// so applying the same document twice gives the same form.
    pub fn restore_from<R: FormRenderer>(
        wizard: &mut Wizard<R>,
        doc: &PersistedDocument,
    ) -> usize {
        let mut restored = 0;
        for (_, fields) in doc.indexed_steps() {
            for (name, value) in fields {
                if !is_valid_value(value) {
                    continue;
                }
                let Some((_, spec)) = wizard.schema.field(name) else {
                    log::debug!("No input named {}, skipping", name);
                    continue;
                };

                let text = value.to_string();
                let applied = match spec.kind {
                    FieldKind::Radio => {
                        let checked = wizard.form.check_radio(name, &text);
                        if checked {
                            // Same as the change event a click would fire
                            wizard.form.apply_conditionals(&wizard.schema, name);
                        }
                        checked
                    }
                    FieldKind::Checkbox => {
                        wizard.form.set(name, FieldValue::Flag(value.is_checked()));
                        true
                    }
                    FieldKind::Select => wizard.form.assign_select(name, &text),
                    _ => {
                        wizard.form.set(name, FieldValue::Text(text));
                        true
                    }
                };

                if applied {
                    let current = wizard.form.value(name).map(FieldValue::to_string);
                    wizard.ui.field_updated(name, current.as_deref());
                    restored += 1;
                } else {
                    log::debug!("No option matching {} for {}", value, name);
                }
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldMap;
    use crate::platform::Clock;
    use crate::wizard::AutoSaveController;
    use crate::wizard::tests::{Fixture, fill_personal};

    fn controller() -> RestoreController {
        RestoreController::new(&WizardConfig::default())
    }

    #[test]
    fn test_restore_after_reload_with_suppression() {
        let fx = Fixture::new();
        {
            let first = fx.wizard();
            let mut fields = FieldMap::new();
            fields.insert("firstName".into(), "Ana".into());
            assert!(first.store().save_step(0, &fields).is_saved());
        }
        let writes_before = fx.writes();

        let mut wizard = fx.wizard();
        let mut restore = controller();
        let mut autosave = AutoSaveController::new(1000);

        assert_eq!(restore.poll(&mut wizard, 10_000), None);
        restore.reference_data_ready(0);
        assert_eq!(restore.poll(&mut wizard, 299), None);
        assert_eq!(restore.poll(&mut wizard, 300), Some(1));
        assert_eq!(wizard.form().text("firstName"), "Ana");
        assert!(wizard.session().is_restoring());
        assert_eq!(wizard.ui().notifications.len(), 1);

        // Edits inside the window never reach storage
        for t in [400, 900, 1400] {
            let event = wizard.set_field("lastName", "Ruiz".into()).unwrap();
            autosave.on_event(&mut wizard, &event, t);
            let picked = wizard.set_field("gender", "female".into()).unwrap();
            autosave.on_event(&mut wizard, &picked, t);
            autosave.poll(&mut wizard, t + 1000);
        }
        assert!(wizard.go_to(1));
        assert_eq!(fx.writes(), writes_before);

        assert_eq!(restore.poll(&mut wizard, 1800), None);
        assert!(restore.is_finished());
        assert!(!wizard.session().is_restoring());

        let event = wizard.set_field("passportNumber", "G1234567".into()).unwrap();
        autosave.on_event(&mut wizard, &event, 2000);
        assert!(autosave.poll(&mut wizard, 3000));
        assert!(fx.writes() > writes_before);
    }

    #[test]
    fn test_nothing_saved_finishes_quietly() {
        let fx = Fixture::new();
        let mut wizard = fx.wizard();
        let mut restore = controller();
        restore.reference_data_ready(0);
        assert_eq!(restore.poll(&mut wizard, 300), Some(0));
        assert!(restore.is_finished());
        assert!(!wizard.session().is_restoring());
        assert!(wizard.ui().notifications.is_empty());
    }

    #[test]
    fn test_restore_is_idempotent() {
        let fx = Fixture::new();
        let mut first = fx.wizard();
        fill_personal(&mut first);
        first.set_field("usRelative", "yes".into());
        first.set_field("certifyTruthful", true.into());
        first.set_field("country", "Perú".into());
        for step in 0..first.schema().total_steps() {
            let Some(fields) = first.schema().step(step).map(|s| first.form().collect_step(s))
            else {
                continue;
            };
            first.store().save_step(step, &fields);
        }
        let doc = first.store().load().unwrap();

        let mut wizard = fx.wizard();
        let once = RestoreController::restore_from(&mut wizard, &doc);
        let after_once = wizard.form().form_object(wizard.schema());
        let twice = RestoreController::restore_from(&mut wizard, &doc);
        assert_eq!(once, twice);
        assert_eq!(wizard.form().form_object(wizard.schema()), after_once);

        assert_eq!(wizard.form().text("gender"), "female");
        assert_eq!(wizard.form().text("country"), "PER");
        assert!(wizard.form().is_required("usRelativeName"));
        assert!(wizard.form().value("certifyTruthful").unwrap().is_checked());
    }

    #[test]
    fn test_unmatched_values_are_skipped() {
        let fx = Fixture::new();
        fx.local.insert_raw(
            "visaFormData",
            r#"{"step_1":{"firstName":"Ana","gender":"other","ghost":"x","birthCountry":"Atlantis","lastName":"undefined"},
                "savedAt":"2025-03-01T00:00:00Z","expiresAt":"2025-03-31T00:00:00Z","schemaVersion":"2.0"}"#,
        );
        let mut wizard = fx.wizard();
        wizard.form.set("lastName", "Kept".into());
        let doc = crate::persistence::migration::decode(
            &fx.local.peek("visaFormData").unwrap(),
            fx.clock.now(),
            chrono::Duration::days(30),
        )
        .unwrap()
        .0;

        assert_eq!(RestoreController::restore_from(&mut wizard, &doc), 1);
        assert_eq!(wizard.form().text("firstName"), "Ana");
        assert_eq!(wizard.form().text("lastName"), "Kept");
        assert!(wizard.form().value("gender").is_none());
        assert!(wizard.form().value("birthCountry").is_none());
    }

    #[test]
    fn test_legacy_fallback() {
        let fx = Fixture::new();
        fx.local.insert_raw(
            "visaFormData",
            r#"{"step_3":{"city":"Lima"},"lastSave":"2025-02-20T10:00:00Z"}"#,
        );
        let mut wizard = fx.wizard();
        let mut restore = controller();
        restore.reference_data_ready(0);
        assert_eq!(restore.poll(&mut wizard, 300), Some(1));
        assert_eq!(wizard.form().text("city"), "Lima");
        assert_eq!(wizard.store().load().unwrap().schema_version, "2.0");
    }

    #[test]
    fn test_expired_data_is_first_visit() {
        let fx = Fixture::new();
        {
            let first = fx.wizard();
            let mut fields = FieldMap::new();
            fields.insert("firstName".into(), "Ana".into());
            first.store().save_step(0, &fields);
        }
        fx.clock.advance_ms(31 * 24 * 3600 * 1000);

        let mut wizard = fx.wizard();
        let mut restore = controller();
        restore.reference_data_ready(0);
        assert_eq!(restore.poll(&mut wizard, 300), Some(0));
        assert!(wizard.form().value("firstName").is_none());
        assert!(!wizard.has_saved_data());
    }
}
