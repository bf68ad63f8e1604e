//! Read-side views over the store: filtered task lists, history and totals.

use crate::error::AppError;
use crate::model::{ActivityLogEntry, LogLevel, Task, TaskPayload, TaskStatus};
use std::cmp::Ordering;
use std::str::FromStr;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Id,
    Name,
    Module,
    Status,
    Progress,
    #[default]
    Created,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "module" => Ok(Self::Module),
            "status" => Ok(Self::Status),
            "progress" => Ok(Self::Progress),
            "created" => Ok(Self::Created),
            other => Err(AppError::invalid_input(format!("unknown sort key '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub module: Option<String>,
    pub status: Option<TaskStatus>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl TaskQuery {
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let needle = normalized_needle(self.search.as_deref());
        let mut selected: Vec<Task> = tasks
            .iter()
            .filter(|task| {
                needle.as_deref().is_none_or(|needle| {
                    task.name.to_lowercase().contains(needle)
                        || task.id.to_lowercase().contains(needle)
                })
            })
            .filter(|task| {
                self.module
                    .as_deref()
                    .is_none_or(|module| task.module == module)
            })
            .filter(|task| self.status.is_none_or(|status| task.status == status))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ordering = compare_tasks(a, b, self.sort);
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        selected
    }
}

fn compare_tasks(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Module => a.module.cmp(&b.module),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Progress => a.progress.cmp(&b.progress),
        SortKey::Created => a.created.cmp(&b.created),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub search: Option<String>,
    pub kind: Option<String>,
    pub level: Option<LogLevel>,
}

impl LogQuery {
    /// Matching entries, newest timestamp first.
    pub fn apply(&self, entries: &[ActivityLogEntry]) -> Vec<ActivityLogEntry> {
        let needle = normalized_needle(self.search.as_deref());
        let mut selected: Vec<ActivityLogEntry> = entries
            .iter()
            .filter(|entry| {
                needle.as_deref().is_none_or(|needle| {
                    entry.message.to_lowercase().contains(needle)
                        || entry
                            .module
                            .as_deref()
                            .is_some_and(|module| module.to_lowercase().contains(needle))
                        || entry
                            .task_id()
                            .is_some_and(|task_id| task_id.to_lowercase().contains(needle))
                })
            })
            .filter(|entry| self.kind.as_deref().is_none_or(|kind| entry.kind == kind))
            .filter(|entry| self.level.is_none_or(|level| entry.level == level))
            .cloned()
            .collect();

        selected.sort_by(|a, b| parse_timestamp(&b.timestamp).cmp(&parse_timestamp(&a.timestamp)));
        selected
    }
}

fn normalized_needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

// Unparseable timestamps sort as oldest.
fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

pub fn recent_logs(entries: &[ActivityLogEntry], count: usize) -> &[ActivityLogEntry] {
    &entries[..count.min(entries.len())]
}

/// Totals shown on the dashboard, counted over completed tasks only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub scraped_links: u64,
    pub injectable_websites: u64,
    pub databases_found: u64,
    pub dumped_rows: u64,
}

impl DashboardStats {
    pub fn collect(tasks: &[Task]) -> Self {
        tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .fold(Self::default(), |mut stats, task| {
                match &task.payload {
                    TaskPayload::Scraper { results, .. } => {
                        stats.scraped_links += results.valid;
                    }
                    TaskPayload::Vulnerability { results, .. } => {
                        stats.injectable_websites += results.total_links;
                    }
                    TaskPayload::Dumper { results, .. } => {
                        stats.databases_found += results.tables_found;
                        stats.dumped_rows += results.rows_dumped;
                    }
                    _ => {}
                }
                stats
            })
    }
}

pub fn format_stat(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}
