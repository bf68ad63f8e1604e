use crate::error::AppError;
use crate::model::{
    ActivityLogEntry, LogLevel, MAX_PROGRESS, NewLogEntry, NewTask, Task, TaskPatch, TaskStatus,
};
use crate::persisted::{PersistedValue, SubscriptionId};
use crate::storage::{JsonStore, KeyValueStorage};
use std::rc::Rc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

pub const TASKS_KEY: &str = "tasks";
pub const ACTIVITY_LOGS_KEY: &str = "activityLogs";
pub const TASK_SEQUENCE_KEY: &str = "taskSequence";
pub const LOG_SEQUENCE_KEY: &str = "activityLogSequence";

pub const TASK_ID_PREFIX: &str = "TSK";
pub const LOG_ID_PREFIX: &str = "EVT";

/// The task shown in the persistent progress affordance. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub task_id: String,
    pub name: String,
    pub progress: u8,
}

impl ActiveTask {
    fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            name: task.name.clone(),
            progress: task.progress,
        }
    }
}

/// Owner of the task and activity-log collections.
///
/// All mutation goes through this type. Every write replaces the collection
/// snapshot rather than editing it in place, and ids come from persisted
/// counters that only ever grow, so an id is never handed out twice even
/// after deletions or a reload.
pub struct TaskStore<S: KeyValueStorage> {
    store: JsonStore<S>,
    tasks: PersistedValue<Vec<Task>, S>,
    logs: PersistedValue<Vec<ActivityLogEntry>, S>,
    task_sequence: PersistedValue<u64, S>,
    log_sequence: PersistedValue<u64, S>,
    active_task: Option<ActiveTask>,
}

impl<S: KeyValueStorage> TaskStore<S> {
    pub fn open(storage: S) -> Self {
        Self::open_with_defaults(storage, Vec::new(), Vec::new())
    }

    /// Opens the store, seeding each collection with `tasks` / `logs` when
    /// storage holds nothing usable for it.
    pub fn open_with_defaults(storage: S, tasks: Vec<Task>, logs: Vec<ActivityLogEntry>) -> Self {
        let store = JsonStore::new(storage);
        let tasks = PersistedValue::new(store.clone(), TASKS_KEY, tasks);
        let logs = PersistedValue::new(store.clone(), ACTIVITY_LOGS_KEY, logs);
        let mut task_sequence = PersistedValue::new(store.clone(), TASK_SEQUENCE_KEY, 0u64);
        let mut log_sequence = PersistedValue::new(store.clone(), LOG_SEQUENCE_KEY, 0u64);

        let highest_task = highest_sequence(
            tasks.get().iter().map(|task| task.id.as_str()),
            TASK_ID_PREFIX,
        );
        if highest_task > *task_sequence.get() {
            task_sequence.set(highest_task);
        }
        let highest_log = highest_sequence(
            logs.get().iter().map(|entry| entry.id.as_str()),
            LOG_ID_PREFIX,
        );
        if highest_log > *log_sequence.get() {
            log_sequence.set(highest_log);
        }

        Self {
            store,
            tasks,
            logs,
            task_sequence,
            log_sequence,
            active_task: None,
        }
    }

    pub fn json_store(&self) -> &JsonStore<S> {
        &self.store
    }

    pub fn tasks(&self) -> Rc<Vec<Task>> {
        self.tasks.get()
    }

    pub fn activity_logs(&self) -> Rc<Vec<ActivityLogEntry>> {
        self.logs.get()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks.get().iter().find(|task| task.id == id).cloned()
    }

    pub fn active_task(&self) -> Option<&ActiveTask> {
        self.active_task.as_ref()
    }

    pub fn subscribe_tasks<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Rc<Vec<Task>>) + 'static,
    {
        self.tasks.subscribe(listener)
    }

    pub fn unsubscribe_tasks(&mut self, id: SubscriptionId) -> bool {
        self.tasks.unsubscribe(id)
    }

    pub fn subscribe_logs<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Rc<Vec<ActivityLogEntry>>) + 'static,
    {
        self.logs.subscribe(listener)
    }

    pub fn unsubscribe_logs(&mut self, id: SubscriptionId) -> bool {
        self.logs.unsubscribe(id)
    }

    pub fn create_task(&mut self, new_task: NewTask) -> Task {
        let sequence = next_sequence(&mut self.task_sequence);
        let kind = new_task.payload.kind();
        let name = new_task
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| kind.default_task_name());
        let module = new_task
            .module
            .filter(|module| !module.trim().is_empty())
            .unwrap_or_else(|| kind.module_name().to_string());

        let task = Task {
            id: format_id(TASK_ID_PREFIX, sequence),
            name,
            module,
            payload: new_task.payload,
            status: new_task.status.unwrap_or(TaskStatus::Queued),
            progress: new_task.progress.unwrap_or(0).min(MAX_PROGRESS),
            created: timestamp_now(),
            duration: new_task.duration,
            time_remaining: new_task.time_remaining,
        };

        let inserted = task.clone();
        self.tasks.update(move |tasks| {
            let mut next = Vec::with_capacity(tasks.len() + 1);
            next.push(inserted);
            next.extend(tasks.iter().cloned());
            next
        });
        debug!(task_id = %task.id, status = %task.status, "task created");

        self.add_log(
            NewLogEntry::new(
                "Task Created",
                format!("Task {} created.", task.name),
                LogLevel::Info,
            )
            .with_module(task.module.clone())
            .with_task_id(&task.id),
        );

        if task.status == TaskStatus::Running {
            self.active_task = Some(ActiveTask::for_task(&task));
        }

        task
    }

    /// Merges `patch` into the task with `id`. Unknown ids are a no-op.
    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Option<Task> {
        let current = self.task(id)?;
        let updated = patch.apply(&current);

        let replacement = updated.clone();
        self.tasks.update(move |tasks| {
            tasks
                .iter()
                .map(|task| {
                    if task.id == replacement.id {
                        replacement.clone()
                    } else {
                        task.clone()
                    }
                })
                .collect()
        });

        if let Some(active) = self.active_task.as_mut()
            && active.task_id == id
        {
            active.name = updated.name.clone();
            active.progress = updated.progress;
        }
        debug!(
            task_id = id,
            status = %updated.status,
            progress = updated.progress,
            "task updated"
        );

        Some(updated)
    }

    /// Removes the task with `id`. Unknown ids are a no-op and log nothing.
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let removed = self.task(id)?;
        self.tasks
            .update(|tasks| tasks.iter().filter(|task| task.id != id).cloned().collect());

        if self
            .active_task
            .as_ref()
            .is_some_and(|active| active.task_id == id)
        {
            self.active_task = None;
        }
        debug!(task_id = id, "task deleted");

        self.add_log(
            NewLogEntry::new("Task Deleted", format!("Task {id} deleted."), LogLevel::Warning)
                .with_module(removed.module.clone())
                .with_task_id(id),
        );

        Some(removed)
    }

    pub fn add_log(&mut self, entry: NewLogEntry) -> ActivityLogEntry {
        let sequence = next_sequence(&mut self.log_sequence);
        let appended = ActivityLogEntry {
            id: format_id(LOG_ID_PREFIX, sequence),
            timestamp: timestamp_now(),
            kind: entry.kind,
            module: entry.module,
            message: entry.message,
            details: entry.details,
            level: entry.level,
        };

        let prepended = appended.clone();
        self.logs.update(move |logs| {
            let mut next = Vec::with_capacity(logs.len() + 1);
            next.push(prepended);
            next.extend(logs.iter().cloned());
            next
        });

        appended
    }

    /// Pauses a running task or resumes a pending/queued one.
    pub fn toggle_task(&mut self, id: &str) -> Option<Task> {
        let task = self.task(id)?;
        if task.is_terminal() {
            return Some(task);
        }
        let (next, kind, verb) = if task.status == TaskStatus::Running {
            (TaskStatus::Pending, "Task Paused", "paused")
        } else {
            (TaskStatus::Running, "Task Resumed", "resumed")
        };

        let updated = self.update_task(id, &TaskPatch::status(next))?;
        if next == TaskStatus::Running {
            self.active_task = Some(ActiveTask::for_task(&updated));
        }
        self.add_log(
            NewLogEntry::new(kind, format!("Task {id} {verb}."), LogLevel::Info)
                .with_module(updated.module.clone())
                .with_task_id(id),
        );

        Some(updated)
    }

    /// Marks a task completed at full progress. Already-completed tasks are
    /// returned unchanged.
    pub fn complete_task(&mut self, id: &str) -> Option<Task> {
        let task = self.task(id)?;
        if task.status == TaskStatus::Completed {
            return Some(task);
        }
        self.finish_task(id).map(|(task, _)| task)
    }

    /// Sets `Completed` / 100 and then appends the completion entry.
    pub(crate) fn finish_task(&mut self, id: &str) -> Option<(Task, ActivityLogEntry)> {
        let patch = TaskPatch::status(TaskStatus::Completed).with_progress(MAX_PROGRESS);
        let updated = self.update_task(id, &patch)?;
        let entry = self.add_log(
            NewLogEntry::new(
                "Task Completed",
                format!("Task {} completed.", updated.name),
                LogLevel::Success,
            )
            .with_module(updated.module.clone())
            .with_task_id(id),
        );
        Some((updated, entry))
    }

    pub fn fail_task(&mut self, id: &str, reason: Option<&str>) -> Option<Task> {
        let task = self.task(id)?;
        if task.status == TaskStatus::Failed {
            return Some(task);
        }

        let updated = self.update_task(id, &TaskPatch::status(TaskStatus::Failed))?;
        let mut entry = NewLogEntry::new(
            "Task Failed",
            format!("Task {} failed.", updated.name),
            LogLevel::Error,
        )
        .with_module(updated.module.clone())
        .with_task_id(id);
        if let Some(reason) = reason.map(str::trim).filter(|reason| !reason.is_empty()) {
            entry = entry.with_detail("reason", serde_json::Value::String(reason.to_string()));
        }
        self.add_log(entry);

        Some(updated)
    }

    pub fn rename_task(&mut self, id: &str, name: &str) -> Result<Option<Task>, AppError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("name is required"));
        }

        let patch = TaskPatch {
            name: Some(trimmed.to_string()),
            ..TaskPatch::default()
        };
        Ok(self.update_task(id, &patch))
    }
}

fn next_sequence<S: KeyValueStorage>(counter: &mut PersistedValue<u64, S>) -> u64 {
    counter.update(|current| current.saturating_add(1));
    *counter.get()
}

fn format_id(prefix: &str, sequence: u64) -> String {
    format!("{prefix}{sequence:03}")
}

fn highest_sequence<'a, I>(ids: I, prefix: &str) -> u64
where
    I: Iterator<Item = &'a str>,
{
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|digits| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
