//! Loading overlay, modals, toasts and progress bars

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use monitor_core::format::html_escape;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::notify::NotifyLevel;
use crate::surface::{Surface, BODY};

pub const LOADING_OVERLAY: &str = "global-loading-overlay";
pub const LOADING_MESSAGE: &str = "loading-message";
pub const TOAST_CONTAINER: &str = "toast-container";
const HIDDEN: &str = "d-none";

#[derive(Debug, Clone)]
pub struct ConfirmOptions {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub level: NotifyLevel,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            title: "Confirm".to_string(),
            message: "Are you sure?".to_string(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
            level: NotifyLevel::Warning,
        }
    }
}

impl ConfirmOptions {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn level(mut self, level: NotifyLevel) -> Self {
        self.level = level;
        self
    }
}

enum Modal {
    Confirm(oneshot::Sender<bool>),
    Alert,
}

/// Global overlay layer shared by every page
#[derive(Clone)]
pub struct Overlay {
    surface: Arc<dyn Surface>,
    modals: Arc<Mutex<IndexMap<String, Modal>>>,
    auto_confirm: Option<bool>,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("open_modals", &self.modals.lock().len())
            .field("auto_confirm", &self.auto_confirm)
            .finish_non_exhaustive()
    }
}

impl Overlay {
    /// `auto_confirm` answers every confirm immediately (headless runs)
    pub fn new(surface: Arc<dyn Surface>, auto_confirm: Option<bool>) -> Self {
        surface.mount(
            BODY,
            LOADING_OVERLAY,
            r#"<div class="loading-content"><div class="loading-spinner"></div><div class="h5 mb-0">Loading...</div></div>"#,
        );
        surface.mount(LOADING_OVERLAY, LOADING_MESSAGE, "Please wait");
        surface.set_class(LOADING_OVERLAY, "loading-overlay", true);
        surface.set_class(LOADING_OVERLAY, HIDDEN, true);

        Self {
            surface,
            modals: Arc::new(Mutex::new(IndexMap::new())),
            auto_confirm,
        }
    }

    pub fn show_loading(&self, message: &str) {
        self.surface.set_text(LOADING_MESSAGE, message);
        self.surface.set_class(LOADING_OVERLAY, HIDDEN, false);
    }

    pub fn hide_loading(&self) {
        self.surface.set_class(LOADING_OVERLAY, HIDDEN, true);
    }

    /// Ask the user; resolves `false` when the modal is dismissed
    pub async fn confirm(&self, options: ConfirmOptions) -> bool {
        if let Some(answer) = self.auto_confirm {
            info!(title = %options.title, answer, "auto-answering confirm");
            return answer;
        }

        let id = format!("confirm-modal-{}", Uuid::new_v4());
        let (tx, rx) = oneshot::channel();
        self.surface.mount(BODY, &id, &render_confirm(&id, &options));
        self.modals.lock().insert(id.clone(), Modal::Confirm(tx));
        debug!(modal = %id, "confirm opened");

        let answer = rx.await.unwrap_or(false);
        self.close(&id);
        answer
    }

    /// Show an informational modal; returns its id
    pub fn alert(&self, title: &str, message: &str, level: NotifyLevel) -> String {
        let id = format!("alert-modal-{}", Uuid::new_v4());
        let body = format!(
            r#"<div class="modal-dialog modal-dialog-centered"><div class="modal-content"><div class="modal-header"><h5 class="modal-title">{title}</h5></div><div class="modal-body text-center"><i class="{icon} fa-3x text-{level} mb-3"></i><p class="h5">{message}</p></div><div class="modal-footer"><button type="button" class="btn btn-{level}">OK</button></div></div></div>"#,
            title = html_escape(title),
            icon = level.icon(),
            level = level,
            message = html_escape(message),
        );
        self.surface.mount(BODY, &id, &body);
        self.modals.lock().insert(id.clone(), Modal::Alert);
        id
    }

    /// Answer an open modal; alerts ignore the answer. False if unknown.
    pub fn resolve_modal(&self, id: &str, confirmed: bool) -> bool {
        let modal = self.modals.lock().shift_remove(id);
        match modal {
            Some(Modal::Confirm(tx)) => {
                let _ = tx.send(confirmed);
                self.surface.remove(id);
                true
            }
            Some(Modal::Alert) => {
                self.surface.remove(id);
                true
            }
            None => false,
        }
    }

    /// Escape: close the most recently opened modal
    pub fn dismiss_top(&self) -> Option<String> {
        let top = self.modals.lock().keys().last().cloned()?;
        self.resolve_modal(&top, false);
        Some(top)
    }

    pub fn open_modals(&self) -> Vec<String> {
        self.modals.lock().keys().cloned().collect()
    }

    fn close(&self, id: &str) {
        self.modals.lock().shift_remove(id);
        self.surface.remove(id);
    }

    /// Toast that removes itself after `duration`
    pub fn toast(&self, title: &str, message: &str, level: NotifyLevel, duration: Duration) -> String {
        if !self.surface.has_anchor(TOAST_CONTAINER) {
            self.surface.mount(BODY, TOAST_CONTAINER, "");
            self.surface.set_class(TOAST_CONTAINER, "toast-container", true);
        }

        let id = format!("toast-{}", Uuid::new_v4());
        let html = format!(
            r#"<div class="toast-header"><i class="fas fa-circle text-{level} me-2"></i><strong class="me-auto">{title}</strong><small class="text-muted">just now</small></div><div class="toast-body">{message}</div>"#,
            level = level,
            title = html_escape(title),
            message = html_escape(message),
        );
        self.surface.mount(TOAST_CONTAINER, &id, &html);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let surface = self.surface.clone();
            let toast_id = id.clone();
            runtime.spawn(async move {
                tokio::time::sleep(duration).await;
                surface.remove(&toast_id);
            });
        }
        id
    }

    /// Progress bar appended to `container`; `None` if the container is missing
    pub fn progress_bar(&self, container: &str, label: &str, max: f64) -> Option<ProgressBar> {
        let id = format!("progress-{}", Uuid::new_v4());
        let html = format!(
            r#"<div class="d-flex justify-content-between"><span>{}</span></div>"#,
            html_escape(label)
        );
        if !self.surface.mount(container, &id, &html) {
            return None;
        }
        let bar = ProgressBar {
            surface: self.surface.clone(),
            text_id: format!("{id}-text"),
            bar_id: format!("{id}-bar"),
            id,
            max: if max > 0.0 { max } else { 100.0 },
        };
        self.surface.mount(&bar.id, &bar.text_id, "0%");
        self.surface.mount(&bar.id, &bar.bar_id, "");
        self.surface.set_class(&bar.bar_id, "progress-bar", true);
        self.surface.set_style(&bar.bar_id, "width", "0%");
        Some(bar)
    }
}

fn render_confirm(id: &str, options: &ConfirmOptions) -> String {
    format!(
        r#"<div class="modal-dialog modal-dialog-centered"><div class="modal-content"><div class="modal-header"><h5 class="modal-title">{title}</h5></div><div class="modal-body text-center"><i class="fas fa-question-circle fa-3x text-{level} mb-3"></i><p class="h5">{message}</p></div><div class="modal-footer"><button type="button" class="btn btn-secondary">{cancel}</button><button type="button" class="btn btn-{level}" id="{id}-confirm">{confirm}</button></div></div></div>"#,
        title = html_escape(&options.title),
        level = options.level,
        message = html_escape(&options.message),
        cancel = html_escape(&options.cancel_text),
        confirm = html_escape(&options.confirm_text),
        id = id,
    )
}

/// Handle to a mounted progress bar
pub struct ProgressBar {
    surface: Arc<dyn Surface>,
    id: String,
    text_id: String,
    bar_id: String,
    max: f64,
}

impl fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBar").field("id", &self.id).field("max", &self.max).finish()
    }
}

impl ProgressBar {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the value; returns the rounded percentage shown
    pub fn update(&self, value: f64) -> u32 {
        let percent = (value / self.max * 100.0).round().clamp(0.0, 100.0) as u32;
        self.surface.set_style(&self.bar_id, "width", &format!("{percent}%"));
        self.surface.set_text(&self.text_id, &format!("{percent}%"));
        percent
    }

    pub fn remove(self) {
        self.surface.remove(&self.id);
    }
}
