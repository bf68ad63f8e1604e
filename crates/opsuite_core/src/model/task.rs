use crate::error::AppError;
use crate::model::TaskPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub module: String,
    #[serde(flatten)]
    pub payload: TaskPayload,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<String>,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Queued,
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AppError::invalid_input(format!("unknown status '{trimmed}'")))
    }
}

/// Discriminator of the module that owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Scraper,
    Vulnerability,
    DorksChecker,
    Dumper,
    Dehasher,
    Antipublic,
    Parser,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::Scraper,
        TaskKind::Vulnerability,
        TaskKind::DorksChecker,
        TaskKind::Dumper,
        TaskKind::Dehasher,
        TaskKind::Antipublic,
        TaskKind::Parser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraper => "scraper",
            Self::Vulnerability => "vulnerability",
            Self::DorksChecker => "dorks-checker",
            Self::Dumper => "dumper",
            Self::Dehasher => "dehasher",
            Self::Antipublic => "antipublic",
            Self::Parser => "parser",
        }
    }

    /// Display name of the module that launches tasks of this kind.
    pub fn module_name(&self) -> &'static str {
        match self {
            Self::Scraper => "Scraper",
            Self::Vulnerability => "Vulnerability Scanner",
            Self::DorksChecker => "Dorks Checker",
            Self::Dumper => "Dumper",
            Self::Dehasher => "Dehasher",
            Self::Antipublic => "Antipublic Checker",
            Self::Parser => "Parser",
        }
    }

    pub fn default_task_name(&self) -> String {
        let first_word = self
            .module_name()
            .split_whitespace()
            .next()
            .unwrap_or("Untitled");
        format!("{first_word} Task")
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AppError::invalid_input(format!("unknown task type '{}'", raw.trim())))
    }
}

/// Caller-supplied fields for a new task. Unset fields take store defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: Option<String>,
    pub module: Option<String>,
    pub payload: TaskPayload,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub duration: Option<String>,
    pub time_remaining: Option<String>,
}

impl NewTask {
    pub fn new(payload: TaskPayload) -> Self {
        Self {
            name: None,
            module: None,
            payload,
            status: None,
            progress: None,
            duration: None,
            time_remaining: None,
        }
    }

    pub fn of_kind(kind: TaskKind) -> Self {
        Self::new(TaskPayload::empty(kind))
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_module<M: Into<String>>(mut self, module: M) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Shallow patch over a task's top-level fields. `id` and `created` are not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub module: Option<String>,
    pub payload: Option<TaskPayload>,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub duration: Option<String>,
    pub time_remaining: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns a new task with the named fields replaced.
    pub fn apply(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(module) = &self.module {
            next.module = module.clone();
        }
        if let Some(payload) = &self.payload {
            next.payload = payload.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(progress) = self.progress {
            next.progress = progress.min(MAX_PROGRESS);
        }
        if let Some(duration) = &self.duration {
            next.duration = Some(duration.clone());
        }
        if let Some(time_remaining) = &self.time_remaining {
            next.time_remaining = Some(time_remaining.clone());
        }
        next
    }
}
