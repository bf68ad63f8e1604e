use clap::Parser;
use clap::error::ErrorKind;
use opsuite_cli::cli::{
    Cli, Command, ConfigOverrideTarget, SettingsCommand, parse_config_override,
};
use opsuite_core::config::{
    Config, ConfigOverrides, DEFAULT_LOG_FILTER, load_config_with_fallback, merge_overrides,
};
use opsuite_core::driver::{ProgressDriver, ThreadSleeper, TickOutcome};
use opsuite_core::error::AppError;
use opsuite_core::model::{
    ActivityLogEntry, NewLogEntry, NewTask, Task, TaskPatch, TaskPayload, TaskStatus,
};
use opsuite_core::notify::{Notifier, NoopNotifier, notifier_from_env};
use opsuite_core::query::{
    DashboardStats, LogQuery, SortDirection, TaskQuery, format_stat, recent_logs,
};
use opsuite_core::settings::AppSettings;
use opsuite_core::storage::FileStorage;
use opsuite_core::task_api::TaskStore;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            module: task.module.clone(),
            status: task.status.to_string(),
            progress: format!("{}%", task.progress),
            created: task.created.clone(),
        }
    }
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Level")]
    level: String,
}

impl From<&ActivityLogEntry> for LogRow {
    fn from(entry: &ActivityLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp.clone(),
            kind: entry.kind.clone(),
            module: entry.module.clone().unwrap_or_else(|| "-".to_string()),
            message: entry.message.clone(),
            level: entry.level.to_string(),
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_tasks_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    let mut table = Table::new(tasks.iter().map(TaskRow::from));
    table.with(Style::psql());
    println!("{table}");
}

fn print_logs_table(entries: &[ActivityLogEntry]) {
    if entries.is_empty() {
        println!("No activity yet.");
        return;
    }
    let mut table = Table::new(entries.iter().map(LogRow::from));
    table.with(Style::psql());
    println!("{table}");
}

fn print_pairs<I>(header: [&str; 2], pairs: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut builder = Builder::default();
    builder.push_record(header.map(String::from));
    for (key, value) in pairs {
        builder.push_record([key, value]);
    }
    let mut table = builder.build();
    table.with(Style::psql());
    println!("{table}");
}

fn print_task_details(task: &Task) -> Result<(), AppError> {
    let payload = serde_json::to_value(&task.payload)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    let mut pairs = vec![
        ("ID".to_string(), task.id.clone()),
        ("Name".to_string(), task.name.clone()),
        ("Module".to_string(), task.module.clone()),
        ("Type".to_string(), task.kind().to_string()),
        ("Status".to_string(), task.status.to_string()),
        ("Progress".to_string(), format!("{}%", task.progress)),
        ("Created".to_string(), task.created.clone()),
    ];
    if let Some(duration) = &task.duration {
        pairs.push(("Duration".to_string(), duration.clone()));
    }
    if let Some(time_remaining) = &task.time_remaining {
        pairs.push(("Time remaining".to_string(), time_remaining.clone()));
    }
    for section in ["results", "settings"] {
        if let Some(value) = payload.get(section) {
            pairs.push((section.to_string(), value.to_string()));
        }
    }
    print_pairs(["Field", "Value"], pairs);
    Ok(())
}

fn not_found(id: &str) -> AppError {
    AppError::invalid_input(format!("task '{id}' not found"))
}

fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::invalid_input(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn print_task_result(task: &Task, verb: &str, json: bool) -> Result<(), AppError> {
    if json {
        print_json(task)
    } else {
        println!("{verb} task: {} ({})", task.name, task.id);
        Ok(())
    }
}

fn run_command(cli: Cli, config: &Config) -> Result<(), AppError> {
    let json = cli.json;
    let mut store = TaskStore::open(FileStorage::from_env()?);

    match cli.command {
        Command::Create {
            kind,
            name,
            module,
            status,
            progress,
            settings,
        } => {
            let payload = match settings {
                Some(raw) => TaskPayload::with_settings_json(kind, &raw)?,
                None => TaskPayload::empty(kind),
            };
            let mut new_task = NewTask::new(payload);
            new_task.name = name;
            new_task.module = module;
            new_task.status = status;
            new_task.progress = progress;

            let task = store.create_task(new_task);
            print_task_result(&task, "Created", json)?;
        }
        Command::Update {
            id,
            name,
            module,
            status,
            progress,
            duration,
            time_remaining,
        } => {
            let patch = TaskPatch {
                name: name.map(|value| require_text(&value, "name")).transpose()?,
                module: module
                    .map(|value| require_text(&value, "module"))
                    .transpose()?,
                payload: None,
                status,
                progress,
                duration,
                time_remaining,
            };
            if patch.is_empty() {
                return Err(AppError::invalid_input("nothing to update"));
            }

            let task = store.update_task(&id, &patch).ok_or_else(|| not_found(&id))?;
            print_task_result(&task, "Updated", json)?;
        }
        Command::Rename { id, name } => {
            let task = store.rename_task(&id, &name)?.ok_or_else(|| not_found(&id))?;
            print_task_result(&task, "Renamed", json)?;
        }
        Command::Toggle { id } => {
            let task = store.toggle_task(&id).ok_or_else(|| not_found(&id))?;
            let verb = format!("Toggled ({})", task.status);
            print_task_result(&task, &verb, json)?;
        }
        Command::Complete { id } => {
            let task = store.complete_task(&id).ok_or_else(|| not_found(&id))?;
            print_task_result(&task, "Completed", json)?;
        }
        Command::Fail { id, reason } => {
            let task = store
                .fail_task(&id, reason.as_deref())
                .ok_or_else(|| not_found(&id))?;
            print_task_result(&task, "Failed", json)?;
        }
        Command::Delete { id } => {
            let task = store.delete_task(&id).ok_or_else(|| not_found(&id))?;
            print_task_result(&task, "Deleted", json)?;
        }
        Command::Show { id } => {
            let task = store.task(&id).ok_or_else(|| not_found(&id))?;
            if json {
                print_json(&task)?;
            } else {
                print_task_details(&task)?;
            }
        }
        Command::List {
            search,
            module,
            status,
            sort,
            asc,
        } => {
            let query = TaskQuery {
                search,
                module,
                status,
                sort,
                direction: if asc {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                },
            };
            let tasks = query.apply(&store.tasks());
            if json {
                print_json(&tasks)?;
            } else {
                print_tasks_table(&tasks);
            }
        }
        Command::History {
            search,
            kind,
            level,
            limit,
        } => {
            let query = LogQuery {
                search,
                kind,
                level,
            };
            let matched = query.apply(&store.activity_logs());
            let entries = match limit {
                Some(count) => recent_logs(&matched, count),
                None => &matched[..],
            };
            if json {
                print_json(entries)?;
            } else {
                print_logs_table(entries);
            }
        }
        Command::Log {
            kind,
            message,
            level,
            module,
            task_id,
        } => {
            let kind = require_text(&kind, "type")?;
            let message = require_text(&message, "message")?;
            let mut entry = NewLogEntry::new(kind, message, level);
            if let Some(module) = module {
                entry = entry.with_module(require_text(&module, "module")?);
            }
            if let Some(task_id) = task_id {
                entry = entry.with_task_id(task_id.trim());
            }

            let entry = store.add_log(entry);
            if json {
                print_json(&entry)?;
            } else {
                println!("Logged {}: {} ({})", entry.kind, entry.message, entry.id);
            }
        }
        Command::Stats => {
            let tasks = store.tasks();
            let stats = DashboardStats::collect(&tasks);
            let running = tasks
                .iter()
                .filter(|task| task.status == TaskStatus::Running)
                .count();
            if json {
                print_json(&serde_json::json!({
                    "scrapedLinks": stats.scraped_links,
                    "injectableWebsites": stats.injectable_websites,
                    "databasesFound": stats.databases_found,
                    "dumpedRows": stats.dumped_rows,
                    "runningTasks": running,
                    "totalTasks": tasks.len(),
                }))?;
            } else {
                print_pairs(
                    ["Metric", "Value"],
                    [
                        ("Scraped links".to_string(), format_stat(stats.scraped_links)),
                        (
                            "Injectable websites".to_string(),
                            format_stat(stats.injectable_websites),
                        ),
                        (
                            "Databases found".to_string(),
                            format_stat(stats.databases_found),
                        ),
                        ("Dumped rows".to_string(), format_stat(stats.dumped_rows)),
                        ("Running tasks".to_string(), running.to_string()),
                        ("Total tasks".to_string(), tasks.len().to_string()),
                    ],
                );
            }
        }
        Command::Run { max_ticks } => {
            let notifier: Box<dyn Notifier> = notifier_from_env().unwrap_or_else(|err| {
                warn!(error = %err, "notifications unavailable");
                Box::new(NoopNotifier)
            });
            let mut driver = ProgressDriver::new(config.driver.driver_config());
            let mut completed = Vec::new();

            let ticks = driver.run_until_idle(
                &mut store,
                &mut ThreadSleeper,
                max_ticks,
                |outcome| match outcome {
                    TickOutcome::Idle => {}
                    TickOutcome::Advanced { task_id, progress } => {
                        if !json {
                            println!("{task_id}: {progress}%");
                        }
                    }
                    TickOutcome::Completed { task, entry } => {
                        if !json {
                            println!("Completed task: {} ({})", task.name, task.id);
                        }
                        if let Err(err) = notifier.notify(entry) {
                            warn!(task_id = %task.id, error = %err, "notification failed");
                        }
                        completed.push(task.id.clone());
                    }
                },
            );

            if json {
                print_json(&serde_json::json!({
                    "ticks": ticks,
                    "completed": completed,
                }))?;
            } else {
                println!("Driver idle after {ticks} tick(s).");
            }
        }
        Command::Settings { settings } => {
            let mut app_settings = AppSettings::load(store.json_store());
            if let SettingsCommand::Set { key, value } = settings {
                app_settings.apply_setting(&key, &value)?;
                app_settings.save(store.json_store())?;
            }
            if json {
                print_json(&app_settings)?;
            } else {
                print_pairs(["Setting", "Value"], app_settings.entries());
            }
        }
    }

    Ok(())
}

fn build_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        let parsed = parse_config_override(raw).map_err(AppError::invalid_input)?;
        let invalid = |expected: &str| {
            AppError::invalid_input(format!("override '{}' expects {expected}", raw.trim()))
        };
        match parsed.target {
            ConfigOverrideTarget::DriverIntervalMs => {
                overrides.interval_ms =
                    Some(parsed.value.parse().map_err(|_| invalid("milliseconds"))?);
            }
            ConfigOverrideTarget::DriverStep => {
                overrides.step = Some(parsed.value.parse().map_err(|_| invalid("0-100"))?);
            }
            ConfigOverrideTarget::DriverCompletionThreshold => {
                overrides.completion_threshold =
                    Some(parsed.value.parse().map_err(|_| invalid("0-100"))?);
            }
            ConfigOverrideTarget::LogFilter => overrides.log_filter = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn init_tracing(config: &Config) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .or_else(|| EnvFilter::try_new(config.log_filter()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let loaded = load_config_with_fallback();
    let config = match build_overrides(&cli.config_override) {
        Ok(overrides) => merge_overrides(&loaded.config, &overrides),
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config);
    if let Some(err) = loaded.error {
        warn!(error = %err, "failed to load config, using defaults");
    }

    if let Err(err) = run_command(cli, &config) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
