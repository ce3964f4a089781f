//! In-memory navigation and suppression flags

/// Where the user is and what the wizard is allowed to do right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardSession {
    current_step: usize,
    total_steps: usize,
    /// Blocks every persistence write while a restore is populating fields
    is_restoring: bool,
    is_suppressing_auto_save: bool,
    /// A submission is in flight
    submitting: bool,
}

impl WizardSession {
    pub fn new(total_steps: usize) -> Self {
        Self {
            current_step: 0,
            total_steps,
            is_restoring: false,
            is_suppressing_auto_save: false,
            submitting: false,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_first(&self) -> bool {
        self.current_step == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_step + 1 >= self.total_steps
    }

    pub fn is_restoring(&self) -> bool {
        self.is_restoring
    }

    pub fn is_suppressing_auto_save(&self) -> bool {
        self.is_suppressing_auto_save
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Move to `index`; false (and no change) when out of range
    pub(crate) fn move_to(&mut self, index: usize) -> bool {
        if index >= self.total_steps {
            return false;
        }
        self.current_step = index;
        true
    }

    /// Open or close the restore suppression window
    pub(crate) fn set_restoring(&mut self, restoring: bool) {
        self.is_restoring = restoring;
        self.is_suppressing_auto_save = restoring;
    }

    pub(crate) fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_bounds() {
        let mut session = WizardSession::new(3);
        assert!(session.is_first());
        assert!(session.move_to(2));
        assert!(session.is_last());
        assert!(!session.move_to(3));
        assert_eq!(session.current_step(), 2);
    }

    #[test]
    fn test_restoring_sets_both_flags() {
        let mut session = WizardSession::new(9);
        session.set_restoring(true);
        assert!(session.is_restoring());
        assert!(session.is_suppressing_auto_save());
        session.set_restoring(false);
        assert!(!session.is_suppressing_auto_save());
    }
}
