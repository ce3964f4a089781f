//! Debounced auto-save
//!
//! Field edits arrive as [`FieldChanged`] events. Selection changes save at
//! once; typing schedules a trailing save that each new keystroke pushes
//! back. The host calls [`AutoSaveController::poll`] from its timer.

use super::Wizard;
use crate::schema::FieldKind;
use crate::ui::FormRenderer;

/// A user edit the auto-saver should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChanged {
    pub field: String,
    pub kind: FieldKind,
    /// Index of the step holding the field
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct AutoSaveController {
    debounce_ms: u64,
    /// When the pending trailing save fires
    deadline: Option<u64>,
}

impl AutoSaveController {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            deadline: None,
        }
    }

    /// Deadline of the scheduled save, if any
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Handle one edit. Returns true when it caused an immediate save.
    pub fn on_event<R: FormRenderer>(
        &mut self,
        wizard: &mut Wizard<R>,
        event: &FieldChanged,
        now_ms: u64,
    ) -> bool {
        if wizard.session().is_restoring() {
            log::debug!("Ignoring change to {} during restore", event.field);
            return false;
        }

        if event.kind.is_selection() {
            // The immediate save covers whatever the timer was waiting for
            self.deadline = None;
            return wizard.save_current_step();
        }

        self.deadline = Some(now_ms + self.debounce_ms);
        false
    }

    /// Fire the trailing save once its deadline has passed
    pub fn poll<R: FormRenderer>(&mut self, wizard: &mut Wizard<R>, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                if wizard.session().is_restoring() {
                    log::debug!("Debounced save dropped, restore in progress");
                    return false;
                }
                wizard.save_current_step()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Severity;
    use crate::wizard::SAVE_FAILED_MESSAGE;
    use crate::wizard::tests::Fixture;

    #[test]
    fn test_typing_collapses_into_one_save() {
        let fx = Fixture::new();
        let mut wizard = fx.wizard();
        let mut autosave = AutoSaveController::new(1000);

        for (t, value) in [(0, "A"), (300, "An"), (900, "Ana")] {
            let event = wizard.set_field("firstName", value.into()).unwrap();
            assert!(!autosave.on_event(&mut wizard, &event, t));
        }
        assert_eq!(autosave.deadline(), Some(1900));

        assert!(!autosave.poll(&mut wizard, 1899));
        assert_eq!(fx.writes(), 0);
        assert!(autosave.poll(&mut wizard, 1900));
        assert_eq!(fx.writes(), 1);
        assert!(!autosave.poll(&mut wizard, 5000));
        assert_eq!(fx.writes(), 1);
    }

    #[test]
    fn test_selection_saves_immediately() {
        let fx = Fixture::new();
        let mut wizard = fx.wizard();
        let mut autosave = AutoSaveController::new(1000);

        let typed = wizard.set_field("firstName", "Ana".into()).unwrap();
        autosave.on_event(&mut wizard, &typed, 0);
        let picked = wizard.set_field("gender", "female".into()).unwrap();
        assert!(autosave.on_event(&mut wizard, &picked, 10));
        assert_eq!(autosave.deadline(), None);

        let doc = wizard.store().load().unwrap();
        assert_eq!(doc.step(0).unwrap().len(), 2);
        assert_eq!(wizard.ui().acks, 1);
    }

    #[test]
    fn test_empty_step_writes_nothing() {
        let fx = Fixture::new();
        let mut wizard = fx.wizard();
        let mut autosave = AutoSaveController::new(1000);

        let event = wizard.set_field("firstName", "   ".into()).unwrap();
        autosave.on_event(&mut wizard, &event, 0);
        assert!(!autosave.poll(&mut wizard, 1000));
        assert_eq!(fx.writes(), 0);
        assert_eq!(wizard.ui().acks, 0);
        assert!(wizard.ui().notifications.is_empty());
    }

    #[test]
    fn test_both_stores_down_notifies() {
        let fx = Fixture::new();
        fx.cookies.set_enabled(false);
        fx.local.set_enabled(false);
        let mut wizard = fx.wizard();
        let mut autosave = AutoSaveController::new(1000);

        let picked = wizard.set_field("gender", "female".into()).unwrap();
        assert!(!autosave.on_event(&mut wizard, &picked, 0));
        assert_eq!(wizard.ui().acks, 0);
        assert_eq!(
            wizard.ui().notifications,
            vec![(SAVE_FAILED_MESSAGE.to_string(), Severity::Error)]
        );
    }
}
