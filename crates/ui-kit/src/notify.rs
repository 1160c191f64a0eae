//! Transient notifications
//!
//! Newest first, bounded; the oldest is dropped (and its element removed)
//! when the bound is exceeded. Each notification removes itself once its
//! duration has elapsed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_core::format::html_escape;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::surface::{Surface, BODY};

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyLevel::Success => "success",
            NotifyLevel::Info => "info",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Danger => "danger",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotifyLevel::Success => "fas fa-check-circle",
            NotifyLevel::Info => "fas fa-info-circle",
            NotifyLevel::Warning => "fas fa-exclamation-triangle",
            NotifyLevel::Danger => "fas fa-times-circle",
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub level: NotifyLevel,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn element_id(&self) -> String {
        element_id(self.id)
    }
}

fn element_id(id: Uuid) -> String {
    format!("notification-{id}")
}

fn render(notification: &Notification) -> String {
    format!(
        r#"<div class="alert alert-{level} alert-dismissible fade show"><i class="{icon} me-2"></i><div class="flex-grow-1">{message}</div><button type="button" class="btn-close"></button></div>"#,
        level = notification.level,
        icon = notification.level.icon(),
        message = html_escape(&notification.message),
    )
}

/// Bounded stack of visible notifications
#[derive(Clone)]
pub struct NotificationCenter {
    surface: Arc<dyn Surface>,
    max: usize,
    active: Arc<Mutex<VecDeque<Notification>>>,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("max", &self.max)
            .field("active", &self.active.lock().len())
            .finish_non_exhaustive()
    }
}

impl NotificationCenter {
    pub fn new(surface: Arc<dyn Surface>, max: usize) -> Self {
        Self {
            surface,
            max: max.max(1),
            active: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Show `message` for `duration`; returns the notification id
    pub fn show(&self, message: impl Into<String>, level: NotifyLevel, duration: Duration) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            level,
            created_at: Utc::now(),
        };

        match level {
            NotifyLevel::Warning | NotifyLevel::Danger => {
                warn!(level = %level, "🔔 {}", notification.message)
            }
            NotifyLevel::Success | NotifyLevel::Info => {
                info!(level = %level, "🔔 {}", notification.message)
            }
        }

        let id = notification.id;
        self.surface.mount(BODY, &notification.element_id(), &render(&notification));

        let dropped = {
            let mut active = self.active.lock();
            active.push_front(notification);
            let mut dropped = Vec::new();
            while active.len() > self.max {
                if let Some(oldest) = active.pop_back() {
                    dropped.push(oldest.id);
                }
            }
            dropped
        };
        for old in dropped {
            self.surface.remove(&element_id(old));
        }

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let center = self.clone();
            runtime.spawn(async move {
                tokio::time::sleep(duration).await;
                center.dismiss(id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.show(message, NotifyLevel::Success, DEFAULT_DURATION)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.show(message, NotifyLevel::Info, DEFAULT_DURATION)
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.show(message, NotifyLevel::Warning, DEFAULT_DURATION)
    }

    pub fn danger(&self, message: impl Into<String>) -> Uuid {
        self.show(message, NotifyLevel::Danger, DEFAULT_DURATION)
    }

    /// Remove one notification; false when it already expired or was dropped
    pub fn dismiss(&self, id: Uuid) -> bool {
        let removed = {
            let mut active = self.active.lock();
            let before = active.len();
            active.retain(|n| n.id != id);
            active.len() != before
        };
        if removed {
            self.surface.remove(&element_id(id));
        }
        removed
    }

    pub fn clear_all(&self) {
        let drained: Vec<Notification> = self.active.lock().drain(..).collect();
        for notification in drained {
            self.surface.remove(&notification.element_id());
        }
    }

    /// Visible notifications, newest first
    pub fn active(&self) -> Vec<Notification> {
        self.active.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
