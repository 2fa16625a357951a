// ============================
// crates/backend-lib/src/notify.rs
// ============================
//! User-facing message seam.
//!
//! Components that need to surface a message (a fallback engaging, a
//! session expiring) take a `Notifier` at construction instead of
//! reaching for shared mutable state. The default sink logs.
use std::sync::Arc;

/// Severity of a surfaced message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Injected sink for user-facing notices
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Default notifier: structured log lines
#[derive(Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(target: "eventdesk::notice", "{message}"),
            NoticeLevel::Warning => tracing::warn!(target: "eventdesk::notice", "{message}"),
        }
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, level: NoticeLevel, message: &str) {
        (**self).notify(level, message);
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every notice for assertions
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub notices: Mutex<Vec<(NoticeLevel, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, level: NoticeLevel, message: &str) {
            self.notices
                .lock()
                .expect("notice lock")
                .push((level, message.to_string()));
        }
    }
}
