//! Renderer that draws into the page (WASM only)
//!
//! Expected markup: `#visa-form` holding one `.form-step` per step,
//! `.progress-step` markers, `#prev-btn` / `#next-btn` / `#submit-btn`, a
//! `#form-review` container on the last step, and optionally `#save-status`
//! and `#pending-submissions`.

use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlElement, HtmlInputElement, HtmlOptionElement, HtmlSelectElement,
    HtmlTextAreaElement,
};

use super::{FormRenderer, Indicator, Severity, StepView};
use crate::form::{FieldValue, FormObject};
use crate::persistence::PendingSubmission;
use crate::schema::SelectOption;

const NOTIFICATION_MS: i32 = 5000;
const SAVED_BADGE_MS: i32 = 2000;

pub struct DomRenderer {
    document: Document,
}

impl DomRenderer {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn inputs(&self, name: &str) -> Vec<Element> {
        let Ok(list) = self
            .document
            .query_selector_all(&format!("#visa-form [name=\"{}\"]", name))
        else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn all(&self, selector: &str) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn set_display(&self, id: &str, visible: bool) {
        if let Some(el) = self
            .document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
        {
            let display = if visible { "inline-block" } else { "none" };
            let _ = el.style().set_property("display", display);
        }
    }

    /// Append `el` to the body and drop it again after `ms`
    fn flash(&self, el: Element, ms: i32) {
        let Some(body) = self.document.body() else {
            return;
        };
        let _ = body.append_child(&el);
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move || el.remove());
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ms,
        );
        closure.forget();
    }

    /// Current value of a named input as the user left it
    pub fn read_value(&self, name: &str) -> Option<FieldValue> {
        for el in self.inputs(name) {
            if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
                match input.type_().as_str() {
                    "radio" => {
                        if input.checked() {
                            return Some(FieldValue::Text(input.value()));
                        }
                    }
                    "checkbox" => return Some(FieldValue::Flag(input.checked())),
                    _ => return Some(FieldValue::Text(input.value())),
                }
            } else if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
                return Some(FieldValue::Text(select.value()));
            } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
                return Some(FieldValue::Text(area.value()));
            }
        }
        None
    }

    /// Replace a select's options (keeps the placeholder in slot 0)
    pub fn populate_select(&self, name: &str, options: &[SelectOption]) {
        for el in self.inputs(name) {
            let Some(select) = el.dyn_ref::<HtmlSelectElement>() else {
                continue;
            };
            select.set_length(select.length().min(1));
            for option in options {
                let Ok(node) = self.document.create_element("option") else {
                    continue;
                };
                if let Ok(opt) = node.dyn_into::<HtmlOptionElement>() {
                    opt.set_value(&option.value);
                    opt.set_text(&option.label);
                    let _ = select.append_child(&opt);
                }
            }
        }
    }
}

impl FormRenderer for DomRenderer {
    fn notify(&mut self, message: &str, severity: Severity) {
        for old in self.all(".notification") {
            old.remove();
        }
        let Ok(el) = self.document.create_element("div") else {
            return;
        };
        el.set_class_name(&format!("notification notification-{}", severity.as_str()));
        el.set_text_content(Some(message));
        self.flash(el, NOTIFICATION_MS);
    }

    fn set_indicator(&mut self, field: &str, indicator: Indicator, message: Option<&str>) {
        for el in self.inputs(field) {
            let classes = el.class_list();
            let _ = classes.remove_2("error", "valid");
            match indicator {
                Indicator::Error => {
                    let _ = classes.add_1("error");
                }
                Indicator::Ok => {
                    let _ = classes.add_1("valid");
                }
                Indicator::Neutral => {}
            }

            let Some(parent) = el.parent_element() else {
                continue;
            };
            if let Ok(Some(existing)) = parent.query_selector(".field-error") {
                existing.remove();
            }
            if let (Indicator::Error, Some(text)) = (indicator, message) {
                if let Ok(err) = self.document.create_element("div") {
                    err.set_class_name("field-error");
                    err.set_text_content(Some(text));
                    let _ = parent.append_child(&err);
                }
            }
        }
    }

    fn show_step(&mut self, view: StepView) {
        for (i, step) in self.all(".form-step").iter().enumerate() {
            let _ = step.class_list().toggle_with_force("active", i == view.current);
        }
        for (i, marker) in self.all(".progress-step").iter().enumerate() {
            let classes = marker.class_list();
            let _ = classes.toggle_with_force("completed", view.is_completed(i));
            let _ = classes.toggle_with_force("active", i == view.current);
        }
        self.set_display("prev-btn", view.show_previous());
        self.set_display("next-btn", view.show_next());
        self.set_display("submit-btn", view.show_submit());
    }

    fn render_review(&mut self, form: &FormObject) {
        let Some(container) = self.document.get_element_by_id("form-review") else {
            return;
        };
        container.set_text_content(None);
        for (name, value) in form {
            let (Ok(row), Ok(label), Ok(text)) = (
                self.document.create_element("div"),
                self.document.create_element("strong"),
                self.document.create_element("span"),
            ) else {
                continue;
            };
            row.set_class_name("review-item");
            label.set_text_content(Some(name));
            text.set_text_content(Some(&value.to_string()));
            let _ = row.append_child(&label);
            let _ = row.append_child(&text);
            let _ = container.append_child(&row);
        }
    }

    fn saved_ack(&mut self) {
        for old in self.all(".auto-save-indicator") {
            old.remove();
        }
        if let Ok(el) = self.document.create_element("div") {
            el.set_class_name("auto-save-indicator");
            el.set_text_content(Some("Progress saved"));
            self.flash(el, SAVED_BADGE_MS);
        }
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        if let Some(btn) = self.document.get_element_by_id("submit-btn") {
            if enabled {
                let _ = btn.remove_attribute("disabled");
            } else {
                let _ = btn.set_attribute("disabled", "");
            }
        }
    }

    fn save_status(&mut self, last_saved: Option<&str>, pending: &[PendingSubmission]) {
        if let Some(status) = self.document.get_element_by_id("save-status") {
            let text = last_saved.map(|when| format!("Last saved {}", when));
            status.set_text_content(text.as_deref());
        }

        let Some(list) = self.document.get_element_by_id("pending-submissions") else {
            return;
        };
        list.set_text_content(None);
        for entry in pending {
            let Ok(row) = self.document.create_element("div") else {
                continue;
            };
            row.set_class_name("pending-item");
            row.set_text_content(Some(&format!(
                "{}: saved {}, not yet sent",
                entry.reference,
                entry.submission_date.format("%-m/%-d/%y %H:%M")
            )));
            let _ = list.append_child(&row);
        }
    }

    fn field_updated(&mut self, field: &str, value: Option<&str>) {
        let value = value.unwrap_or("");
        for el in self.inputs(field) {
            if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
                match input.type_().as_str() {
                    "radio" => input.set_checked(input.value() == value),
                    "checkbox" => input.set_checked(value == "true"),
                    _ => input.set_value(value),
                }
            } else if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
                select.set_value(value);
            } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
                area.set_value(value);
            }
        }
    }
}
