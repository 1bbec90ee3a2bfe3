//! Browser glue (WASM only)
//!
//! Owns the DOM side of the poster form: reads inputs into a settings blob,
//! runs the redraw pipeline, draws onto the preview canvas, persists settings
//! and history, and shows toasts. Element ids follow `settings::fields`.

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use glam::DVec2;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Headers, HtmlCanvasElement, HtmlImageElement,
    HtmlInputElement, HtmlSelectElement, Request, RequestInit, RequestMode, Response,
};

use crate::compose::{Bitmap, PosterImages, Rect, Surface, render_poster};
use crate::history::{History, HistoryKind};
use crate::pipeline::{Pipeline, PosterState, Readiness};
use crate::settings::{PosterSettings, SETTINGS_KEY, SettingValue, SettingsBlob, fields};
use crate::storage::{LocalStore, UserId};
use crate::sync::{
    LoadSource, RemoteSync, SyncConfig, SyncError, Transport, load_with_fallback, save_with_mirror,
};

/// DOM ids not covered by `settings::fields`
mod ids {
    pub const CANVAS: &str = "poster-canvas";
    pub const STAR_MAP_IMAGE: &str = "star-map-image";
    pub const STREET_MAP_IMAGE: &str = "street-map-image";
    pub const SAVE_BUTTON: &str = "save-settings";
    pub const LOAD_BUTTON: &str = "load-settings";
    pub const TOAST: &str = "toast";
    pub const ADDRESS_HISTORY: &str = "address-history";
    pub const ZIP_HISTORY: &str = "zip-history";
}

/// How long a toast stays visible (ms)
const TOAST_MS: i32 = 3000;
/// Suggestions shown under an input
const MAX_SUGGESTIONS: usize = 8;

impl Surface for CanvasRenderingContext2d {
    type Image = HtmlImageElement;
    type Error = JsValue;

    fn save(&self) {
        CanvasRenderingContext2d::save(self);
    }

    fn restore(&self) {
        CanvasRenderingContext2d::restore(self);
    }

    fn begin_path(&self) {
        CanvasRenderingContext2d::begin_path(self);
    }

    fn circle(&self, center: DVec2, radius: f64) -> Result<(), JsValue> {
        self.arc(center.x, center.y, radius, 0.0, TAU)
    }

    fn clip(&self) {
        CanvasRenderingContext2d::clip(self);
    }

    fn draw_image(&self, image: &HtmlImageElement, source: Rect, dest: Rect) -> Result<(), JsValue> {
        self.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
            image,
            source.origin.x,
            source.origin.y,
            source.size.x,
            source.size.y,
            dest.origin.x,
            dest.origin.y,
            dest.size.x,
            dest.size.y,
        )
    }

    fn set_fill_style(&self, color: &str) {
        self.set_fill_style_str(color);
    }

    fn fill_rect(&self, rect: Rect) {
        CanvasRenderingContext2d::fill_rect(self, rect.origin.x, rect.origin.y, rect.size.x, rect.size.y);
    }

    fn set_stroke_style(&self, color: &str) {
        self.set_stroke_style_str(color);
    }

    fn set_line_width(&self, width: f64) {
        CanvasRenderingContext2d::set_line_width(self, width);
    }

    fn stroke(&self) {
        CanvasRenderingContext2d::stroke(self);
    }

    fn set_font(&self, font: &str) {
        CanvasRenderingContext2d::set_font(self, font);
    }

    fn set_text_align(&self, align: &str) {
        CanvasRenderingContext2d::set_text_align(self, align);
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::fill_text(self, text, x, y)
    }
}

/// `fetch`-backed transport
pub struct FetchTransport;

impl Transport for FetchTransport {
    async fn get(&self, url: &str) -> Result<(u16, String), SyncError> {
        let window = web_sys::window().ok_or_else(|| SyncError::Network("no window".into()))?;
        let response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(js_network_error)?;
        let response: Response = response.dyn_into().map_err(js_network_error)?;
        let status = response.status();
        let body = JsFuture::from(response.text().map_err(js_network_error)?)
            .await
            .map_err(js_network_error)?
            .as_string()
            .unwrap_or_default();
        Ok((status, body))
    }

    async fn post_json(&self, url: &str, body: String) -> Result<u16, SyncError> {
        let window = web_sys::window().ok_or_else(|| SyncError::Network("no window".into()))?;

        let headers = Headers::new().map_err(js_network_error)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(js_network_error)?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::SameOrigin);
        opts.set_headers(&headers);
        opts.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init(url, &opts).map_err(js_network_error)?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_network_error)?;
        let response: Response = response.dyn_into().map_err(js_network_error)?;
        Ok(response.status())
    }
}

fn js_network_error(err: impl Into<JsValue>) -> SyncError {
    SyncError::Network(format!("{:?}", err.into()))
}

/// Read every persisted form field that exists on the page
pub fn read_form(document: &Document) -> SettingsBlob {
    let mut blob = SettingsBlob::new();
    for &field in fields::ALL {
        let Some(el) = document.get_element_by_id(field) else {
            continue;
        };
        if let Some(value) = read_element(&el) {
            blob.set(field, value);
        }
    }
    blob
}

fn read_element(el: &Element) -> Option<SettingValue> {
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        return match input.type_().as_str() {
            "checkbox" => Some(SettingValue::Flag(input.checked())),
            "number" | "range" => Some(SettingValue::from_number_input(&input.value())),
            _ => Some(SettingValue::Text(input.value())),
        };
    }
    if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
        return Some(SettingValue::Text(select.value()));
    }
    None
}

/// Push stored values back into the form
pub fn write_form(document: &Document, blob: &SettingsBlob) {
    for (field, value) in blob.iter() {
        let Some(el) = document.get_element_by_id(field) else {
            log::debug!("No form element for stored field {field}");
            continue;
        };
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            match (input.type_().as_str(), value) {
                ("checkbox", v) => input.set_checked(v.as_flag().unwrap_or(false)),
                (_, SettingValue::Number(n)) => input.set_value(&n.to_string()),
                (_, SettingValue::Text(s)) => input.set_value(s),
                (_, SettingValue::Flag(b)) => input.set_value(&b.to_string()),
            }
        } else if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
            if let Some(s) = value.as_text() {
                select.set_value(s);
            }
        }
    }
}

/// Show a transient message in the toast element
pub fn toast(document: &Document, message: &str) {
    let Some(el) = document.get_element_by_id(ids::TOAST) else {
        log::info!("{message}");
        return;
    };
    el.set_text_content(Some(message));
    let _ = el.class_list().add_1("visible");

    let hide = Closure::once_into_js(move || {
        let _ = el.class_list().remove_1("visible");
    });
    if let Some(window) = web_sys::window() {
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(hide.unchecked_ref(), TOAST_MS);
    }
}

/// Replace the options of a `<datalist>`
fn fill_datalist(document: &Document, id: &str, values: &[&str]) {
    let Some(list) = document.get_element_by_id(id) else {
        return;
    };
    list.set_inner_html("");
    for value in values {
        if let Ok(option) = document.create_element("option") {
            let _ = option.set_attribute("value", value);
            let _ = list.append_child(&option);
        }
    }
}

fn loaded_bitmap(image: &HtmlImageElement) -> Option<Bitmap<'_, HtmlImageElement>> {
    if !image.complete() || image.natural_width() == 0 {
        return None;
    }
    Some(Bitmap {
        image,
        width: image.natural_width() as f64,
        height: image.natural_height() as f64,
    })
}

/// The poster page once everything is wired up
pub struct PosterApp {
    document: Document,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    star_map: Option<HtmlImageElement>,
    street_map: Option<HtmlImageElement>,
    store: LocalStore,
    user: UserId,
    remote: Option<RemoteSync<FetchTransport>>,
    pipeline: Pipeline,
    address_history: RefCell<History>,
    zip_history: RefCell<History>,
}

impl PosterApp {
    fn new(document: Document, user: UserId, sync: SyncConfig) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(ids::CANVAS)
            .ok_or_else(|| JsValue::from_str("no poster canvas"))?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;

        let image = |id: &str| {
            document
                .get_element_by_id(id)
                .and_then(|el| el.dyn_into::<HtmlImageElement>().ok())
        };
        let star_map = image(ids::STAR_MAP_IMAGE);
        let street_map = image(ids::STREET_MAP_IMAGE);
        if star_map.is_none() {
            log::warn!("No star map image element");
        }

        let store = LocalStore::open().map_err(|err| JsValue::from_str(&err.to_string()))?;
        let remote = sync.endpoint.map(|url| RemoteSync::new(url, FetchTransport));

        Ok(Self {
            document,
            canvas,
            ctx,
            star_map,
            street_map,
            store,
            user,
            remote,
            pipeline: Pipeline::standard(),
            address_history: RefCell::new(History::new()),
            zip_history: RefCell::new(History::new()),
        })
    }

    fn settings_key(&self) -> String {
        self.user.key(SETTINGS_KEY)
    }

    /// Read the form, run the pipeline and draw the preview
    pub fn redraw(&self) {
        let blob = read_form(&self.document);
        let settings = PosterSettings::from_blob(&blob);
        let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
        let state = self.pipeline.run(PosterState::new(settings, w, h));

        let Some(layout) = state.layout else {
            return;
        };

        let images = PosterImages {
            star_map: self.star_map.as_ref().and_then(loaded_bitmap),
            street_map: if state.settings.combined_view {
                self.street_map.as_ref().and_then(loaded_bitmap)
            } else {
                None
            },
        };

        if let Err(err) = render_poster(&self.ctx, state.canvas, &layout, &images, &state.settings) {
            log::warn!("Render error: {:?}", err);
        }
    }

    /// Load settings (remote first, then local) into the form
    pub async fn load_settings(&self) -> LoadSource {
        let (blob, source) =
            load_with_fallback::<SettingsBlob, _, _>(self.remote.as_ref(), &self.store, &self.settings_key()).await;
        if let Some(blob) = blob {
            write_form(&self.document, &blob);
        }
        log::info!("Settings source: {:?}", source);
        source
    }

    /// Save the current form locally and mirror it remotely
    pub async fn save_settings(&self) -> bool {
        let mut blob = SettingsBlob::load(&self.store, &self.user).unwrap_or_default();
        blob.merge(&read_form(&self.document));
        match save_with_mirror(self.remote.as_ref(), &self.store, &self.settings_key(), &blob).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Settings not saved: {err}");
                false
            }
        }
    }

    fn history(&self, kind: HistoryKind) -> &RefCell<History> {
        match kind {
            HistoryKind::Address => &self.address_history,
            HistoryKind::Zip => &self.zip_history,
        }
    }

    fn datalist_id(kind: HistoryKind) -> &'static str {
        match kind {
            HistoryKind::Address => ids::ADDRESS_HISTORY,
            HistoryKind::Zip => ids::ZIP_HISTORY,
        }
    }

    /// Load both history lists and fill their datalists
    pub async fn load_histories(&self) {
        for kind in [HistoryKind::Address, HistoryKind::Zip] {
            let key = self.user.key(kind.key_suffix());
            let (entries, _) =
                load_with_fallback::<Vec<String>, _, _>(self.remote.as_ref(), &self.store, &key).await;
            *self.history(kind).borrow_mut() = History::from_entries(entries.unwrap_or_default());
            self.refresh_suggestions(kind, "");
        }
    }

    /// Remember a submitted value and persist the list
    pub async fn record_history(&self, kind: HistoryKind, value: &str) {
        let entries = {
            let mut history = self.history(kind).borrow_mut();
            if !history.record(kind, value) {
                return;
            }
            history.entries().to_vec()
        };
        let key = self.user.key(kind.key_suffix());
        if let Err(err) = save_with_mirror(self.remote.as_ref(), &self.store, &key, &entries).await {
            log::warn!("{kind:?} history not saved: {err}");
        }
        self.refresh_suggestions(kind, "");
    }

    /// Rebuild the autofill list for what has been typed so far
    pub fn refresh_suggestions(&self, kind: HistoryKind, prefix: &str) {
        let history = self.history(kind).borrow();
        let suggestions = history.suggestions(prefix, MAX_SUGGESTIONS);
        fill_datalist(&self.document, Self::datalist_id(kind), &suggestions);
    }
}

type SharedReadiness = Rc<RefCell<Readiness<Rc<PosterApp>>>>;

fn listen(target: &Element, event: &str, f: impl FnMut(web_sys::Event) + 'static) {
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(f);
    let _ = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    closure.forget();
}

/// Redraw on any change to a persisted form field
fn setup_form_listeners(app: &Rc<PosterApp>) {
    for &field in fields::ALL {
        let Some(el) = app.document.get_element_by_id(field) else {
            continue;
        };
        for event in ["input", "change"] {
            let app = app.clone();
            listen(&el, event, move |_| app.redraw());
        }
    }
}

fn setup_history_inputs(app: &Rc<PosterApp>) {
    for (field, kind) in [(fields::ADDRESS, HistoryKind::Address), (fields::ZIP, HistoryKind::Zip)] {
        let Some(el) = app.document.get_element_by_id(field) else {
            log::warn!("No {field} input, history disabled");
            continue;
        };
        let Ok(input) = el.clone().dyn_into::<HtmlInputElement>() else {
            continue;
        };

        {
            let app = app.clone();
            let input = input.clone();
            listen(&el, "input", move |_| app.refresh_suggestions(kind, &input.value()));
        }
        {
            let app = app.clone();
            listen(&el, "change", move |_| {
                let app = app.clone();
                let value = input.value();
                wasm_bindgen_futures::spawn_local(async move {
                    app.record_history(kind, &value).await;
                });
            });
        }
    }
}

fn setup_buttons(app: &Rc<PosterApp>) {
    if let Some(btn) = app.document.get_element_by_id(ids::SAVE_BUTTON) {
        let app = app.clone();
        listen(&btn, "click", move |_| {
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let message = if app.save_settings().await {
                    "Settings saved"
                } else {
                    "Could not save settings"
                };
                toast(&app.document, message);
            });
        });
    }

    if let Some(btn) = app.document.get_element_by_id(ids::LOAD_BUTTON) {
        let app = app.clone();
        listen(&btn, "click", move |_| {
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let source = app.load_settings().await;
                app.redraw();
                toast(&app.document, source.toast_message());
            });
        });
    }
}

/// Images may finish loading before settings do; queue their redraws
fn setup_image_listeners(document: &Document, readiness: &SharedReadiness) {
    for id in [ids::STAR_MAP_IMAGE, ids::STREET_MAP_IMAGE] {
        let Some(el) = document.get_element_by_id(id) else {
            continue;
        };
        let readiness = readiness.clone();
        listen(&el, "load", move |_| {
            readiness.borrow_mut().when_ready(|app| app.redraw());
        });
    }
}

/// Default the date field to today (local time) when nothing was restored
fn default_date_if_empty(document: &Document) {
    let Some(input) = document
        .get_element_by_id(fields::DATE)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    else {
        return;
    };
    if !input.value().is_empty() {
        return;
    }
    let now = js_sys::Date::new_0();
    let today = format!(
        "{:04}-{:02}-{:02}",
        now.get_full_year(),
        now.get_month() + 1,
        now.get_date()
    );
    input.set_value(&today);
}

/// Page configuration from `data-*` attributes on the canvas
fn page_config(document: &Document) -> (UserId, SyncConfig) {
    let canvas = document.get_element_by_id(ids::CANVAS);
    let attr = |name: &str| canvas.as_ref().and_then(|c| c.get_attribute(name));
    let user = attr("data-user-id").map(|id| UserId::new(&id)).unwrap_or_default();
    let endpoint = attr("data-sync-endpoint").filter(|url| !url.trim().is_empty());
    (user, SyncConfig { endpoint })
}

/// Start the poster page
pub async fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let readiness: SharedReadiness = Rc::new(RefCell::new(Readiness::new()));
    setup_image_listeners(&document, &readiness);

    let (user, sync) = page_config(&document);
    log::info!(
        "Poster page for {user} (remote sync {})",
        if sync.endpoint.is_some() { "on" } else { "off" }
    );

    let app = Rc::new(PosterApp::new(document, user, sync)?);

    let source = app.load_settings().await;
    app.load_histories().await;
    default_date_if_empty(&app.document);
    if source != LoadSource::Defaults {
        toast(&app.document, source.toast_message());
    }

    setup_form_listeners(&app);
    setup_history_inputs(&app);
    setup_buttons(&app);

    app.redraw();
    readiness.borrow_mut().mark_ready(app);

    log::info!("Poster preview ready");
    Ok(())
}
