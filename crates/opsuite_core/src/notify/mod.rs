use crate::error::AppError;
use crate::model::ActivityLogEntry;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const APP_NAME: &str = "OpSuite";
const DISABLE_ENV_VAR: &str = "OPSUITE_DISABLE_NOTIFICATIONS";

/// Desktop surface for activity log entries, typically "Task Completed".
pub trait Notifier {
    fn notify(&self, entry: &ActivityLogEntry) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _entry: &ActivityLogEntry) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(AppError::InvalidData(_)) => Ok(Box::new(NoopNotifier)),
        Err(other) => Err(other),
    }
}

pub(crate) fn summary(entry: &ActivityLogEntry) -> String {
    match entry.module.as_deref() {
        Some(module) => format!("{APP_NAME} - {module}"),
        None => APP_NAME.to_string(),
    }
}

pub(crate) fn body(entry: &ActivityLogEntry) -> String {
    match entry.task_id() {
        Some(task_id) => format!("{}: {} ({task_id})", entry.kind, entry.message),
        None => format!("{}: {}", entry.kind, entry.message),
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{NoopNotifier, Notifier, body, summary};
    use crate::model::{ActivityLogEntry, LogLevel};

    fn completed_entry() -> ActivityLogEntry {
        let mut details = serde_json::Map::new();
        details.insert("taskId".into(), serde_json::json!("TSK007"));
        ActivityLogEntry {
            id: "EVT012".into(),
            timestamp: "2025-12-20T00:00:00Z".into(),
            kind: "Task Completed".into(),
            module: Some("SQL Dumper".into()),
            message: "Dump finished".into(),
            details,
            level: LogLevel::Success,
        }
    }

    #[test]
    fn notification_text_names_module_and_task() {
        let entry = completed_entry();

        assert_eq!(summary(&entry), "OpSuite - SQL Dumper");
        assert_eq!(body(&entry), "Task Completed: Dump finished (TSK007)");
    }

    #[test]
    fn notification_text_without_task_or_module() {
        let mut entry = completed_entry();
        entry.module = None;
        entry.details.clear();

        assert_eq!(summary(&entry), "OpSuite");
        assert_eq!(body(&entry), "Task Completed: Dump finished");
    }

    #[test]
    fn noop_notifier_accepts_entries() {
        let entry = completed_entry();
        assert!(NoopNotifier.notify(&entry).is_ok());
    }
}
