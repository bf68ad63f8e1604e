//! Timer-driven progress for the running task.
//!
//! One task at a time: each tick advances the first task that is `Running`
//! with progress below 100 and leaves any other running task untouched.
//! The task is looked up again on every tick, so deleting or pausing it
//! between ticks simply takes it out of consideration.

use crate::model::{ActivityLogEntry, MAX_PROGRESS, Task, TaskPatch, TaskStatus};
use crate::storage::KeyValueStorage;
use crate::task_api::TaskStore;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_STEP: u8 = 5;
pub const DEFAULT_COMPLETION_THRESHOLD: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub interval: Duration,
    pub step: u8,
    /// Progress at or above which the next tick completes the task. An
    /// advance that would reach 100 completes the task in the same tick.
    pub completion_threshold: u8,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            step: DEFAULT_STEP,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Advanced { task_id: String, progress: u8 },
    Completed { task: Task, entry: ActivityLogEntry },
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// First task the driver would advance.
pub fn next_runnable(tasks: &[Task]) -> Option<&Task> {
    tasks
        .iter()
        .find(|task| task.status == TaskStatus::Running && task.progress < MAX_PROGRESS)
}

#[derive(Debug)]
pub struct ProgressDriver {
    config: DriverConfig,
    armed: bool,
}

impl ProgressDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arms the timer when a task can be advanced and disarms it otherwise.
    pub fn sync<S: KeyValueStorage>(&mut self, store: &TaskStore<S>) -> bool {
        let armed = next_runnable(&store.tasks()).is_some();
        if armed != self.armed {
            debug!(armed, "progress timer state changed");
        }
        self.armed = armed;
        armed
    }

    pub fn tick<S: KeyValueStorage>(&mut self, store: &mut TaskStore<S>) -> TickOutcome {
        let target = next_runnable(&store.tasks()).map(|task| (task.id.clone(), task.progress));
        let Some((task_id, progress)) = target else {
            self.armed = false;
            return TickOutcome::Idle;
        };

        let next = progress.saturating_add(self.config.step).min(MAX_PROGRESS);
        let outcome = if progress >= self.config.completion_threshold || next >= MAX_PROGRESS {
            match store.finish_task(&task_id) {
                Some((task, entry)) => {
                    info!(task_id = %task.id, "task completed");
                    TickOutcome::Completed { task, entry }
                }
                None => TickOutcome::Idle,
            }
        } else {
            match store.update_task(&task_id, &TaskPatch::progress(next)) {
                Some(task) => TickOutcome::Advanced {
                    task_id: task.id,
                    progress: task.progress,
                },
                None => TickOutcome::Idle,
            }
        };

        self.sync(store);
        outcome
    }

    /// Ticks on the configured interval until nothing is left to advance or
    /// `max_ticks` is reached. Returns the number of ticks performed.
    pub fn run_until_idle<S, Z, F>(
        &mut self,
        store: &mut TaskStore<S>,
        sleeper: &mut Z,
        max_ticks: Option<usize>,
        mut on_tick: F,
    ) -> usize
    where
        S: KeyValueStorage,
        Z: Sleeper,
        F: FnMut(&TickOutcome),
    {
        let mut ticks = 0;
        while self.sync(store) {
            if max_ticks.is_some_and(|limit| ticks >= limit) {
                break;
            }
            sleeper.sleep(self.config.interval);
            let outcome = self.tick(store);
            ticks += 1;
            on_tick(&outcome);
        }
        self.armed = false;
        ticks
    }
}

impl Default for ProgressDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{DriverConfig, ProgressDriver, Sleeper, TickOutcome, next_runnable};
    use crate::model::{LogLevel, NewTask, TaskKind, TaskPatch, TaskStatus};
    use crate::storage::MemoryStorage;
    use crate::task_api::TaskStore;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
        }
    }

    fn running(store: &mut TaskStore<MemoryStorage>, kind: TaskKind) -> String {
        store
            .create_task(NewTask::of_kind(kind).with_status(TaskStatus::Running))
            .id
    }

    fn completion_entries(store: &TaskStore<MemoryStorage>, task_id: &str) -> usize {
        store
            .activity_logs()
            .iter()
            .filter(|entry| entry.kind == "Task Completed" && entry.task_id() == Some(task_id))
            .count()
    }

    #[test]
    fn progress_rises_strictly_then_completes_once() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Dumper);
        let mut driver = ProgressDriver::default();

        let mut last = 0;
        let mut ticks = 0;
        loop {
            ticks += 1;
            match driver.tick(&mut store) {
                TickOutcome::Advanced { task_id, progress } => {
                    assert_eq!(task_id, id);
                    assert!(progress > last, "progress went from {last} to {progress}");
                    last = progress;
                }
                TickOutcome::Completed { task, entry } => {
                    assert_eq!(task.progress, 100);
                    assert_eq!(task.status, TaskStatus::Completed);
                    assert_eq!(entry.level, LogLevel::Success);
                    break;
                }
                TickOutcome::Idle => panic!("driver went idle at {last}"),
            }
        }

        assert_eq!(ticks, 20);
        assert_eq!(completion_entries(&store, &id), 1);

        let settled = store.task(&id).unwrap();
        for _ in 0..3 {
            assert_eq!(driver.tick(&mut store), TickOutcome::Idle);
        }
        assert_eq!(store.task(&id).unwrap(), settled);
        assert_eq!(completion_entries(&store, &id), 1);
    }

    #[test]
    fn completion_is_logged_after_the_status_change() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Parser);
        store.update_task(&id, &TaskPatch::progress(95));
        let mut driver = ProgressDriver::default();

        let TickOutcome::Completed { entry, .. } = driver.tick(&mut store) else {
            panic!("expected the tick to complete the task");
        };
        assert_eq!(store.activity_logs()[0], entry);
        assert_eq!(store.task(&id).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.active_task().unwrap().progress, 100);
    }

    #[test]
    fn only_the_first_running_task_advances() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let older = running(&mut store, TaskKind::Dehasher);
        let newer = running(&mut store, TaskKind::Antipublic);
        let mut driver = ProgressDriver::default();

        driver.tick(&mut store);
        driver.tick(&mut store);

        // New tasks are inserted at the front, so the newer one is found first.
        assert_eq!(store.task(&newer).unwrap().progress, 10);
        assert_eq!(store.task(&older).unwrap().progress, 0);
    }

    #[test]
    fn paused_and_terminal_tasks_are_skipped() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Scraper);
        store.toggle_task(&id);
        let failed = running(&mut store, TaskKind::Dumper);
        store.fail_task(&failed, None);
        let mut driver = ProgressDriver::default();

        assert_eq!(driver.tick(&mut store), TickOutcome::Idle);
        assert!(!driver.is_armed());
        assert_eq!(store.task(&id).unwrap().status, TaskStatus::Pending);
        assert_eq!(store.task(&failed).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn deleted_task_is_not_advanced() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Parser);
        let mut driver = ProgressDriver::default();
        driver.tick(&mut store);
        assert!(driver.is_armed());

        store.delete_task(&id);

        assert_eq!(driver.tick(&mut store), TickOutcome::Idle);
        assert!(store.task(&id).is_none());
        assert!(!driver.is_armed());
    }

    #[test]
    fn next_runnable_skips_finished_running_tasks() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let waiting = running(&mut store, TaskKind::Parser);
        let stuck = running(&mut store, TaskKind::Parser);
        store.update_task(&stuck, &TaskPatch::progress(100));

        let tasks = store.tasks();
        assert_eq!(next_runnable(&tasks).unwrap().id, waiting);
    }

    #[test]
    fn custom_step_and_threshold() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Dumper);
        let mut driver = ProgressDriver::new(DriverConfig {
            interval: Duration::from_millis(10),
            step: 40,
            completion_threshold: 80,
        });

        assert!(matches!(
            driver.tick(&mut store),
            TickOutcome::Advanced { progress: 40, .. }
        ));
        assert!(matches!(
            driver.tick(&mut store),
            TickOutcome::Advanced { progress: 80, .. }
        ));
        assert!(matches!(
            driver.tick(&mut store),
            TickOutcome::Completed { .. }
        ));
        assert_eq!(store.task(&id).unwrap().progress, 100);
    }

    #[test]
    fn advance_reaching_full_progress_completes_in_the_same_tick() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Scraper);
        let mut driver = ProgressDriver::new(DriverConfig {
            step: 10,
            ..DriverConfig::default()
        });
        let mut sleeper = RecordingSleeper::default();

        let ticks = driver.run_until_idle(&mut store, &mut sleeper, Some(15), |_| {});

        // 0 -> 90 in nine advances, then 90 + 10 lands on 100 and completes.
        assert_eq!(ticks, 10);
        let task = store.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(completion_entries(&store, &id), 1);
        assert!(!driver.is_armed());
    }

    #[test]
    fn threshold_of_full_progress_still_completes() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let id = running(&mut store, TaskKind::Parser);
        let mut driver = ProgressDriver::new(DriverConfig {
            completion_threshold: 100,
            ..DriverConfig::default()
        });
        let mut sleeper = RecordingSleeper::default();

        let ticks = driver.run_until_idle(&mut store, &mut sleeper, Some(40), |_| {});

        assert_eq!(ticks, 20);
        assert_eq!(store.task(&id).unwrap().status, TaskStatus::Completed);
        assert_eq!(completion_entries(&store, &id), 1);
    }

    #[test]
    fn run_until_idle_disarms_when_done() {
        let mut store = TaskStore::open(MemoryStorage::new());
        running(&mut store, TaskKind::Antipublic);
        let mut driver = ProgressDriver::default();
        let mut sleeper = RecordingSleeper::default();
        let mut completed = 0;

        let ticks = driver.run_until_idle(&mut store, &mut sleeper, None, |outcome| {
            if matches!(outcome, TickOutcome::Completed { .. }) {
                completed += 1;
            }
        });

        assert_eq!(ticks, 20);
        assert_eq!(completed, 1);
        assert_eq!(sleeper.slept.len(), 20);
        assert!(sleeper.slept.iter().all(|slept| *slept == Duration::from_millis(2000)));
        assert!(!driver.is_armed());
    }

    #[test]
    fn run_until_idle_moves_on_to_the_next_running_task() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let first = running(&mut store, TaskKind::Parser);
        let second = running(&mut store, TaskKind::Dumper);
        let mut driver = ProgressDriver::default();
        let mut sleeper = RecordingSleeper::default();

        let ticks = driver.run_until_idle(&mut store, &mut sleeper, None, |_| {});

        assert_eq!(ticks, 40);
        assert_eq!(store.task(&first).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.task(&second).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn run_until_idle_honours_tick_limit_and_idle_store() {
        let mut store = TaskStore::open(MemoryStorage::new());
        let mut driver = ProgressDriver::default();
        let mut sleeper = RecordingSleeper::default();

        assert_eq!(driver.run_until_idle(&mut store, &mut sleeper, None, |_| {}), 0);
        assert!(sleeper.slept.is_empty());

        let id = running(&mut store, TaskKind::Parser);
        let ticks = driver.run_until_idle(&mut store, &mut sleeper, Some(3), |_| {});

        assert_eq!(ticks, 3);
        assert_eq!(store.task(&id).unwrap().progress, 15);
        assert!(!driver.is_armed());
    }
}
