//! Visa Wizard entry point
//!
//! Handles platform-specific initialization and wires the wizard to its host.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Element, Request, RequestInit, RequestMode, Response};

    use visa_wizard::countries::{country_selects, countries_or_fallback};
    use visa_wizard::platform::{SystemClock, open_stores};
    use visa_wizard::ui::dom::DomRenderer;
    use visa_wizard::wizard::{QueueOnly, SubmissionResponse, Submitter};
    use visa_wizard::{
        AutoSaveController, FormObject, FormSchema, PersistenceStore, RestoreController,
        SubmissionError, Wizard, WizardConfig,
    };

    /// How often the debounce/restore timers are checked (ms)
    const POLL_INTERVAL_MS: i32 = 100;
    /// How often the "last saved" text is recomputed (ms)
    const STATUS_INTERVAL_MS: u64 = 60_000;

    struct App {
        wizard: Wizard<DomRenderer>,
        autosave: AutoSaveController,
        restore: RestoreController,
        status_at: u64,
    }

    fn now_ms() -> u64 {
        js_sys::Date::now() as u64
    }

    fn js_err(e: JsValue) -> SubmissionError {
        SubmissionError::Network(format!("{:?}", e))
    }

    /// POST the form as JSON and parse `{success, error?}`
    async fn post_form(
        endpoint: &str,
        form: &FormObject,
    ) -> Result<SubmissionResponse, SubmissionError> {
        let body = serde_json::to_string(form)
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init(endpoint, &opts).map_err(js_err)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(js_err)?;

        let window = web_sys::window()
            .ok_or_else(|| SubmissionError::Network("no window".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;
        if !response.ok() {
            return Err(SubmissionError::Http(response.status()));
        }

        let text = JsFuture::from(response.text().map_err(js_err)?)
            .await
            .map_err(js_err)?
            .as_string()
            .unwrap_or_default();
        serde_json::from_str(&text).map_err(|e| SubmissionError::Rejected(e.to_string()))
    }

    /// Name attribute of the element an event came from
    fn target_name(event: &web_sys::Event) -> Option<String> {
        event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.get_attribute("name"))
    }

    /// Feed a DOM edit into the wizard. `selection` picks which event kinds
    /// this listener owns, so radios/selects are not handled twice.
    fn handle_edit(app: &Rc<RefCell<App>>, event: &web_sys::Event, selection: bool) {
        let Some(name) = target_name(event) else {
            return;
        };
        let mut app = app.borrow_mut();
        let app = &mut *app;

        let Some((_, spec)) = app.wizard.schema().field(&name) else {
            return;
        };
        if spec.kind.is_selection() != selection {
            return;
        }
        let Some(value) = app.wizard.ui().read_value(&name) else {
            return;
        };
        if let Some(changed) = app.wizard.set_field(&name, value) {
            app.autosave.on_event(&mut app.wizard, &changed, now_ms());
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Visa wizard starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let config = WizardConfig::load();

        let clock = Rc::new(SystemClock);
        let (primary, secondary) = open_stores(&config);
        let store = PersistenceStore::new(primary, secondary, clock.clone(), &config);
        let wizard = Wizard::new(
            FormSchema::visa_application(),
            store,
            clock,
            DomRenderer::new(document.clone()),
        );

        let app = Rc::new(RefCell::new(App {
            wizard,
            autosave: AutoSaveController::new(config.debounce_ms),
            restore: RestoreController::new(&config),
            status_at: now_ms(),
        }));

        // Reference data, then restore once it has settled
        {
            let mut guard = app.borrow_mut();
            let a = &mut *guard;
            let countries =
                countries_or_fallback::<&str>(Err("no country provider configured"));
            a.wizard.populate_countries(&countries);
            for name in country_selects(a.wizard.schema()) {
                a.wizard
                    .ui()
                    .populate_select(name, a.wizard.form().options(name));
            }
            a.wizard.start();
            a.restore.reference_data_ready(now_ms());
        }

        let Some(form) = document.get_element_by_id("visa-form") else {
            log::error!("No #visa-form on this page");
            return;
        };

        // Typing: debounced
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                handle_edit(&app, &event, false);
            });
            let _ = form
                .add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Select / radio / checkbox: immediate
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                handle_edit(&app, &event, true);
            });
            let _ = form
                .add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Blur: paint the field's indicator
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                if let Some(name) = target_name(&event) {
                    app.borrow_mut().wizard.validate_field(&name);
                }
            });
            let _ = form
                .add_event_listener_with_callback("focusout", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        setup_navigation(&document, app.clone());
        setup_submit(&document, app.clone(), config.submit_endpoint.clone());
        setup_timer(&window, app);

        log::info!("Visa wizard running!");
    }

    fn on_click(document: &web_sys::Document, id: &str, mut handler: impl FnMut() + 'static) {
        let Some(btn) = document.get_element_by_id(id) else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| handler());
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_navigation(document: &web_sys::Document, app: Rc<RefCell<App>>) {
        {
            let app = app.clone();
            on_click(document, "next-btn", move || {
                app.borrow_mut().wizard.next();
            });
        }
        {
            let app = app.clone();
            on_click(document, "prev-btn", move || {
                app.borrow_mut().wizard.previous();
            });
        }
        on_click(document, "clear-data-btn", move || {
            let mut app = app.borrow_mut();
            app.autosave.cancel();
            app.wizard.clear_saved_data();
        });
    }

    fn setup_submit(
        document: &web_sys::Document,
        app: Rc<RefCell<App>>,
        endpoint: Option<String>,
    ) {
        on_click(document, "submit-btn", move || {
            let Some(form) = app.borrow_mut().wizard.begin_submit() else {
                return;
            };
            let app = app.clone();
            let endpoint = endpoint.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = match endpoint {
                    Some(url) => post_form(&url, &form).await,
                    None => QueueOnly.submit(&form),
                };
                let mut app = app.borrow_mut();
                app.autosave.cancel();
                app.wizard.complete_submit(form, result, &mut rand::rng());
            });
        });
    }

    /// Drives the debounce and restore deadlines and keeps the save status fresh
    fn setup_timer(window: &web_sys::Window, app: Rc<RefCell<App>>) {
        let closure = Closure::<dyn FnMut()>::new(move || {
            let mut guard = app.borrow_mut();
            let a = &mut *guard;
            let now = now_ms();
            a.restore.poll(&mut a.wizard, now);
            a.autosave.poll(&mut a.wizard, now);
            if now.saturating_sub(a.status_at) >= STATUS_INTERVAL_MS {
                a.status_at = now;
                a.wizard.refresh_status();
            }
        });
        let _ = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            POLL_INTERVAL_MS,
        );
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use visa_wizard::countries::fallback_countries;
    use visa_wizard::platform::{Clock, SystemClock, open_stores};
    use visa_wizard::ui::LogRenderer;
    use visa_wizard::wizard::QueueOnly;
    use visa_wizard::{
        AutoSaveController, FormSchema, PersistenceStore, RestoreController, Wizard, WizardConfig,
    };

    env_logger::init();
    log::info!("Visa wizard (native) starting...");
    log::info!("Native mode runs a scripted session - build for wasm32 for the web form");

    let config = WizardConfig::load();
    let clock = Rc::new(SystemClock);
    let (primary, secondary) = open_stores(&config);
    let store = PersistenceStore::new(primary, secondary, clock.clone(), &config);
    let mut wizard = Wizard::new(
        FormSchema::visa_application(),
        store,
        clock.clone(),
        LogRenderer,
    );
    let mut autosave = AutoSaveController::new(config.debounce_ms);
    let mut restore = RestoreController::new(&config);

    wizard.populate_countries(&fallback_countries());
    wizard.start();

    let t0 = clock.now_ms();
    restore.reference_data_ready(t0);
    restore.poll(&mut wizard, t0 + config.startup_settle_ms);
    restore.poll(&mut wizard, t0 + config.startup_settle_ms + config.restore_settle_ms);

    let mut now = t0 + config.startup_settle_ms + config.restore_settle_ms;
    for (name, value) in [
        ("firstName", "Ana"),
        ("lastName", "Ruiz"),
        ("birthDate", "1990-05-04"),
        ("birthCity", "Lima"),
        ("birthCountry", "PER"),
        ("nationality", "PER"),
        ("gender", "female"),
        ("maritalStatus", "single"),
    ] {
        now += 200;
        if let Some(changed) = wizard.set_field(name, value.into()) {
            autosave.on_event(&mut wizard, &changed, now);
        }
    }
    autosave.poll(&mut wizard, now + config.debounce_ms);

    if wizard.next() {
        println!("Advanced to step {}", wizard.current_step() + 1);
    }
    if let Some(info) = wizard.store().info() {
        println!(
            "Saved {} fields in {} steps, last saved {}",
            info.fields_saved,
            info.steps_saved,
            info.last_saved(clock.now())
        );
    }

    wizard.go_to(wizard.session().total_steps() - 1);
    for name in ["certifyTruthful", "understandPenalties", "authorizeUse"] {
        wizard.set_field(name, true.into());
    }
    let outcome = wizard.submit(&mut QueueOnly, &mut rand::rng());
    println!("Submit outcome: {:?}", outcome);
    println!("Pending submissions: {}", wizard.pending_submissions().len());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
