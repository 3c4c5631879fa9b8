//! User-facing notices.
//!
//! Adapters and the registry report user-visible events (failed generations,
//! key validation results, switch rollbacks) through a [`Notifier`]. The host
//! decides how to show them.

use std::fmt;

use parking_lot::Mutex;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices into the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!(notice = %notice.message, "User notice"),
            _ => tracing::info!(level = %notice.level, notice = %notice.message, "User notice"),
        }
    }
}

/// Collects notices in memory. Useful in tests and for hosts that drain
/// notices on their own schedule.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Remove and return recorded notices.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    /// True if any notice at `level` contains `needle`.
    pub fn contains(&self, level: NoticeLevel, needle: &str) -> bool {
        self.notices
            .lock()
            .iter()
            .any(|n| n.level == level && n.message.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::error("Anthropic request failed"));
        notifier.notify(Notice::success("API key validated"));

        assert!(notifier.contains(NoticeLevel::Error, "Anthropic"));
        assert!(!notifier.contains(NoticeLevel::Success, "Anthropic"));
        assert_eq!(notifier.drain().len(), 2);
        assert!(notifier.notices().is_empty());
    }
}
