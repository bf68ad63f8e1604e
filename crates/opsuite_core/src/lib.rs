pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod notify;
pub mod persisted;
pub mod query;
pub mod settings;
pub mod storage;
pub mod task_api;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{NewTask, TaskKind, TaskStatus};
    use crate::storage::MemoryStorage;
    use crate::task_api::TaskStore;

    #[test]
    fn created_task_has_required_fields() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let task = store.create_task(NewTask::of_kind(TaskKind::Scraper));

        assert_eq!(task.id, "TSK001");
        assert_eq!(task.name, "Scraper Task");
        assert_eq!(task.module, "Scraper");
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.progress, 0);
        assert!(!task.created.is_empty());
        assert!(task.duration.is_none());
        assert!(task.time_remaining.is_none());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing name");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing name");
    }
}
