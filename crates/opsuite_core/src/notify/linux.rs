use crate::error::AppError;
use crate::model::{ActivityLogEntry, LogLevel};
use crate::notify::{Notifier, body, summary};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

fn urgency(level: LogLevel) -> Urgency {
    match level {
        LogLevel::Error => Urgency::Critical,
        LogLevel::Warning => Urgency::Normal,
        LogLevel::Info | LogLevel::Success => Urgency::Low,
    }
}

/// Fire-and-forget: the process usually exits right after showing it, so
/// the notification carries no actions.
fn notification(entry: &ActivityLogEntry) -> Notification {
    let mut notification = Notification::new();
    notification.summary(&summary(entry));
    notification.body(&body(entry));
    notification.urgency(urgency(entry.level));
    notification
}

impl Notifier for LinuxNotifier {
    fn notify(&self, entry: &ActivityLogEntry) -> Result<(), AppError> {
        notification(entry)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
