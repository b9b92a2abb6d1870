//! User-facing notifications.
//!
//! Flows report the outcome of user actions as [`Toast`]s through a
//! [`Notifier`]. The view layer decides how to render them.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => info!(message = %toast.message, "Notification"),
            ToastLevel::Error => warn!(message = %toast.message, "Notification"),
        }
    }
}

/// Keeps every toast in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts received so far, oldest first.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().clone()
    }

    /// Remove and return the recorded toasts.
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of toasts with the given level.
    #[must_use]
    pub fn count(&self, level: ToastLevel) -> usize {
        self.lock().iter().filter(|t| t.level == level).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.lock().push(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Toast::success("Cart cleared"));
        notifier.notify(Toast::error("Cannot add item"));

        assert_eq!(notifier.count(ToastLevel::Error), 1);
        assert_eq!(notifier.toasts()[0].message, "Cart cleared");
        assert_eq!(notifier.drain().len(), 2);
        assert!(notifier.toasts().is_empty());
    }
}
