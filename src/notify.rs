//! User-facing notifications
//!
//! The client reports progress and failures to whatever UI hosts it through
//! a `Notifier`. The default implementation forwards to `tracing`.

use std::sync::Mutex;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A notification as delivered to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sink for user-facing notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Routes notifications to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(target: "dehug::notice", "{}", message)
            }
            NoticeLevel::Warning => tracing::warn!(target: "dehug::notice", "{}", message),
            NoticeLevel::Error => tracing::error!(target: "dehug::notice", "{}", message),
        }
    }
}

/// Keeps every notification; used in tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Messages at the given level, in order
    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                level,
                message: message.to_string(),
            });
        }
    }
}
