//! User notifications for failed fetches

use ledgerlens_core::ErrorSeverity;

use crate::error::Notification;

/// Sink for user-visible notifications (toasts in a UI, log lines here)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Default notifier using the log crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.severity {
            ErrorSeverity::Error => log::error!(
                target: "ledgerlens::notify",
                "[{}] {}",
                notification.code,
                notification.message
            ),
            ErrorSeverity::Warning => log::warn!(
                target: "ledgerlens::notify",
                "[{}] {}",
                notification.code,
                notification.message
            ),
            ErrorSeverity::Info => log::info!(
                target: "ledgerlens::notify",
                "[{}] {}",
                notification.code,
                notification.message
            ),
        }
        for suggestion in &notification.suggestions {
            log::info!(target: "ledgerlens::notify", "  - {}", suggestion);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Notifier that keeps every notification for assertions
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub seen: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.message.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }
}
