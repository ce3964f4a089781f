//! Presentation boundary
//!
//! The wizard never touches the page directly. It reports what should be
//! shown through [`FormRenderer`]; the browser build draws it into the DOM,
//! the native build logs it.

#[cfg(target_arch = "wasm32")]
pub mod dom;

use crate::form::FormObject;
use crate::persistence::PendingSubmission;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

/// Per-field validation marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Optional and empty: no colour
    Neutral,
    Ok,
    Error,
}

/// Which steps are done/active and which buttons are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepView {
    pub current: usize,
    pub total: usize,
}

impl StepView {
    pub fn is_completed(&self, index: usize) -> bool {
        index < self.current
    }

    pub fn show_previous(&self) -> bool {
        self.current > 0
    }

    pub fn is_review(&self) -> bool {
        self.total > 0 && self.current == self.total - 1
    }

    /// Next is replaced by Submit on the review step
    pub fn show_next(&self) -> bool {
        !self.is_review()
    }

    pub fn show_submit(&self) -> bool {
        self.is_review()
    }
}

/// Everything the wizard asks the page to display
pub trait FormRenderer {
    /// Toast notification
    fn notify(&mut self, message: &str, severity: Severity);

    /// Field border colour plus optional inline message
    fn set_indicator(&mut self, field: &str, indicator: Indicator, message: Option<&str>);

    /// Step visibility, progress bar and navigation buttons
    fn show_step(&mut self, view: StepView);

    /// Summary on the review step
    fn render_review(&mut self, form: &FormObject);

    /// Brief "saved" badge after an auto-save
    fn saved_ack(&mut self);

    fn set_submit_enabled(&mut self, enabled: bool);

    /// Push a (restored or reset) value back into an input
    fn field_updated(&mut self, _field: &str, _value: Option<&str>) {}

    /// "Last saved" line plus the submissions waiting for a retry
    fn save_status(&mut self, _last_saved: Option<&str>, _pending: &[PendingSubmission]) {}
}

/// Renderer for headless runs: everything goes to the log
#[derive(Debug, Default)]
pub struct LogRenderer;

impl FormRenderer for LogRenderer {
    fn notify(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => log::warn!("[{}] {}", severity.as_str(), message),
            _ => log::info!("[{}] {}", severity.as_str(), message),
        }
    }

    fn set_indicator(&mut self, field: &str, indicator: Indicator, message: Option<&str>) {
        if indicator == Indicator::Error {
            log::debug!("{}: {}", field, message.unwrap_or("invalid"));
        }
    }

    fn show_step(&mut self, view: StepView) {
        log::info!("Step {}/{}", view.current + 1, view.total);
    }

    fn render_review(&mut self, form: &FormObject) {
        log::info!("Review: {} fields filled", form.len());
    }

    fn saved_ack(&mut self) {
        log::debug!("Progress saved");
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        log::debug!("Submit {}", if enabled { "enabled" } else { "disabled" });
    }

    fn save_status(&mut self, last_saved: Option<&str>, pending: &[PendingSubmission]) {
        if let Some(when) = last_saved {
            log::info!("Last saved {}", when);
        }
        for entry in pending {
            log::info!("Pending submission {} ({})", entry.reference, entry.submission_date);
        }
    }
}

/// Renderer that remembers what it was asked to show
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub notifications: Vec<(String, Severity)>,
    pub indicators: Vec<(String, Indicator, Option<String>)>,
    pub steps: Vec<StepView>,
    pub reviews: Vec<FormObject>,
    pub acks: usize,
    pub submit_enabled: Vec<bool>,
    pub updates: Vec<(String, Option<String>)>,
    /// (last saved text, pending references)
    pub statuses: Vec<(Option<String>, Vec<String>)>,
}

impl RecordingRenderer {
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.notifications
            .iter()
            .filter(|(_, s)| *s == Severity::Error)
            .map(|(m, _)| m.as_str())
    }

    /// Most recent indicator set on `field`
    pub fn indicator(&self, field: &str) -> Option<Indicator> {
        self.indicators
            .iter()
            .rev()
            .find(|(f, _, _)| f == field)
            .map(|(_, i, _)| *i)
    }
}

impl FormRenderer for RecordingRenderer {
    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifications.push((message.to_string(), severity));
    }

    fn set_indicator(&mut self, field: &str, indicator: Indicator, message: Option<&str>) {
        self.indicators
            .push((field.to_string(), indicator, message.map(str::to_string)));
    }

    fn show_step(&mut self, view: StepView) {
        self.steps.push(view);
    }

    fn render_review(&mut self, form: &FormObject) {
        self.reviews.push(form.clone());
    }

    fn saved_ack(&mut self) {
        self.acks += 1;
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled.push(enabled);
    }

    fn field_updated(&mut self, field: &str, value: Option<&str>) {
        self.updates
            .push((field.to_string(), value.map(str::to_string)));
    }

    fn save_status(&mut self, last_saved: Option<&str>, pending: &[PendingSubmission]) {
        self.statuses.push((
            last_saved.map(str::to_string),
            pending.iter().map(|p| p.reference.clone()).collect(),
        ));
    }
}
