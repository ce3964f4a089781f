//! Step state machine
//!
//! `Wizard` owns everything one form session needs (schema, live values,
//! session flags, persistence, validator, renderer) and is passed by
//! reference to the auto-save and restore controllers.

pub mod autosave;
pub mod restore;
pub mod session;
pub mod submit;

use std::rc::Rc;

use rand::Rng;

use crate::countries::{Country, country_selects};
use crate::error::SubmissionError;
use crate::form::{FieldValue, FormObject, FormState};
use crate::persistence::{PendingSubmission, PersistenceStore, SaveOutcome, format_relative};
use crate::platform::Clock;
use crate::schema::{FieldKind, FormSchema, SelectOption};
use crate::ui::{FormRenderer, Severity, StepView};
use crate::validation::FieldValidator;

pub use autosave::{AutoSaveController, FieldChanged};
pub use restore::{RestoreController, RestorePhase};
pub use session::WizardSession;
pub use submit::{QueueOnly, SubmissionResponse, SubmitOutcome, Submitter};

const CERTIFICATIONS_MESSAGE: &str = "You must accept all certifications to submit the application";
pub(crate) const SAVE_FAILED_MESSAGE: &str = "Your progress could not be saved on this device";

pub struct Wizard<R: FormRenderer> {
    schema: FormSchema,
    form: FormState,
    session: WizardSession,
    store: PersistenceStore,
    validator: FieldValidator,
    clock: Rc<dyn Clock>,
    ui: R,
}

impl<R: FormRenderer> Wizard<R> {
    pub fn new(schema: FormSchema, store: PersistenceStore, clock: Rc<dyn Clock>, ui: R) -> Self {
        let form = FormState::new(&schema);
        let session = WizardSession::new(schema.total_steps());
        Self {
            validator: FieldValidator::new(clock.clone()),
            schema,
            form,
            session,
            store,
            clock,
            ui,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    pub fn ui(&self) -> &R {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut R {
        &mut self.ui
    }

    pub fn current_step(&self) -> usize {
        self.session.current_step()
    }

    fn view(&self) -> StepView {
        StepView {
            current: self.session.current_step(),
            total: self.session.total_steps(),
        }
    }

    /// Paint the first step
    pub fn start(&mut self) {
        self.ui.show_step(self.view());
        self.refresh_status();
    }

    /// Record a user edit. Radio changes re-evaluate conditional
    /// requirements. Returns the event auto-save consumes, or `None` for a
    /// field the schema does not know.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Option<FieldChanged> {
        let (step, spec) = self.schema.field(name)?;
        let kind = spec.kind;

        match kind {
            FieldKind::Checkbox => self.form.set(name, FieldValue::Flag(value.is_checked())),
            FieldKind::Radio => {
                if !self.form.check_radio(name, &value.to_string()) {
                    log::debug!("No radio {}={}", name, value);
                    return None;
                }
                self.form.apply_conditionals(&self.schema, name);
            }
            _ => self.form.set(name, value),
        }

        Some(FieldChanged {
            field: name.to_string(),
            kind,
            step,
        })
    }

    /// Validate one field and paint its indicator (blur handler)
    pub fn validate_field(&mut self, name: &str) -> bool {
        match self.schema.field(name) {
            Some((_, spec)) => self.validator.validate_field(spec, &self.form, &mut self.ui),
            None => false,
        }
    }

    pub fn validate_current_step(&mut self) -> bool {
        self.validator.validate_step(
            &self.schema,
            self.session.current_step(),
            &self.form,
            &mut self.ui,
        )
    }

    /// Persist the current step's values.
    ///
    /// No-op while a restore is in progress: nothing may be written until the
    /// suppression window closes.
    pub fn save_current_step(&mut self) -> bool {
        if self.session.is_restoring() {
            log::debug!("Restore in progress, skipping save");
            return false;
        }
        let index = self.session.current_step();
        let Some(step) = self.schema.step(index) else {
            return false;
        };
        let fields = self.form.collect_step(step);
        match self.store.save_step(index, &fields) {
            SaveOutcome::Saved => {
                self.ui.saved_ack();
                self.refresh_status();
                true
            }
            SaveOutcome::NothingToSave => false,
            SaveOutcome::Unavailable => {
                self.ui.notify(SAVE_FAILED_MESSAGE, Severity::Error);
                false
            }
        }
    }

    /// Show `index` without saving anything
    fn show(&mut self, index: usize) -> bool {
        if !self.session.move_to(index) {
            log::warn!("Step {} out of range", index + 1);
            return false;
        }
        self.ui.show_step(self.view());
        if self.session.is_last() {
            let review = self.form.form_object(&self.schema);
            self.ui.render_review(&review);
        }
        true
    }

    /// Jump to a step. The step being left is saved first, whichever
    /// direction the move goes.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.session.total_steps() {
            log::warn!("Step {} out of range", index + 1);
            return false;
        }
        self.save_current_step();
        self.show(index)
    }

    /// Advance if the current step validates
    pub fn next(&mut self) -> bool {
        if self.session.is_last() {
            return false;
        }
        if !self.validate_current_step() {
            return false;
        }
        self.save_current_step();
        self.go_to(self.session.current_step() + 1)
    }

    pub fn previous(&mut self) -> bool {
        if self.session.is_first() {
            return false;
        }
        self.save_current_step();
        self.go_to(self.session.current_step() - 1)
    }

    pub fn certifications_accepted(&self) -> bool {
        self.schema
            .certifications
            .iter()
            .all(|name| self.form.value(name).is_some_and(FieldValue::is_checked))
    }

    /// Guards of a submit. On success the submit control is disabled and the
    /// form object to send is returned.
    pub fn begin_submit(&mut self) -> Option<FormObject> {
        if self.session.is_submitting() {
            self.ui
                .notify(&SubmissionError::InFlight.to_string(), Severity::Error);
            return None;
        }
        if !self.certifications_accepted() {
            self.ui.notify(CERTIFICATIONS_MESSAGE, Severity::Error);
            return None;
        }
        if !self.validate_current_step() {
            return None;
        }

        self.session.set_submitting(true);
        self.ui.set_submit_enabled(false);
        self.ui
            .notify("Submitting visa application...", Severity::Info);
        Some(self.form.form_object(&self.schema))
    }

    /// Apply the service's answer. The submit control is re-enabled on every
    /// path.
    pub fn complete_submit<G: Rng + ?Sized>(
        &mut self,
        form: FormObject,
        result: Result<SubmissionResponse, SubmissionError>,
        rng: &mut G,
    ) -> SubmitOutcome {
        self.session.set_submitting(false);
        self.ui.set_submit_enabled(true);

        let error = match result.and_then(SubmissionResponse::into_result) {
            Ok(()) => {
                log::info!("Application submitted ({} fields)", form.len());
                self.store.clear();
                self.reset_form();
                self.show(0);
                self.ui
                    .notify("Visa application submitted successfully!", Severity::Success);
                self.refresh_status();
                return SubmitOutcome::Submitted;
            }
            Err(e) => e,
        };

        log::warn!("Submission failed: {}", error);
        let now = self.clock.now();
        let outcome = match self
            .store
            .pending()
            .push(form, Some(error.to_string()), now, rng)
        {
            Ok(entry) => {
                self.ui.notify(
                    &format!(
                        "Submission failed ({}). Your application was saved locally with reference {}",
                        error, entry.reference
                    ),
                    Severity::Error,
                );
                SubmitOutcome::Queued {
                    reference: entry.reference,
                }
            }
            Err(e) => {
                log::error!("Could not queue submission: {}", e);
                self.ui.notify(
                    &format!("Submission failed ({}). Please try again", error),
                    Severity::Error,
                );
                SubmitOutcome::Failed
            }
        };
        self.refresh_status();
        outcome
    }

    /// Guard, send and settle in one go (for synchronous submitters)
    pub fn submit<G: Rng + ?Sized>(
        &mut self,
        submitter: &mut dyn Submitter,
        rng: &mut G,
    ) -> SubmitOutcome {
        let Some(form) = self.begin_submit() else {
            return SubmitOutcome::Blocked;
        };
        let result = submitter.submit(&form);
        self.complete_submit(form, result, rng)
    }

    fn reset_form(&mut self) {
        self.form.reset(&self.schema);
        let names: Vec<String> = self.schema.fields().map(|f| f.name.clone()).collect();
        for name in names {
            self.ui.field_updated(&name, None);
        }
    }

    /// "Clear saved data" action: wipe both stores, empty the form and go
    /// back to the first step
    pub fn clear_saved_data(&mut self) {
        self.store.clear();
        self.reset_form();
        self.show(0);
        self.ui.notify("Saved data cleared", Severity::Info);
        self.refresh_status();
    }

    pub fn has_saved_data(&self) -> bool {
        self.store.has_saved_data()
    }

    /// "Last saved 5 mins ago" text, when anything is saved
    pub fn last_saved(&self) -> Option<String> {
        let info = self.store.info()?;
        Some(format_relative(info.saved_at, self.clock.now()))
    }

    pub fn pending_submissions(&self) -> Vec<PendingSubmission> {
        self.store.pending().entries()
    }

    /// Redraw the "last saved" line and the pending queue. The relative
    /// time goes stale, so hosts also call this from their timer.
    pub fn refresh_status(&mut self) {
        let last_saved = self.last_saved();
        let pending = self.pending_submissions();
        self.ui.save_status(last_saved.as_deref(), &pending);
    }

    /// Fill every country select with flag-decorated options
    pub fn populate_countries(&mut self, countries: &[Country]) {
        let options: Vec<SelectOption> = countries.iter().map(Country::to_option).collect();
        let names: Vec<String> = country_selects(&self.schema).map(str::to_string).collect();
        for name in names {
            self.form.set_options(&name, options.clone());
        }
        log::info!("Loaded {} countries", countries.len());
    }
}
