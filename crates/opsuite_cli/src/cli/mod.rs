use clap::{Parser, Subcommand};
use opsuite_core::model::{LogLevel, TaskKind, TaskStatus};
use opsuite_core::query::SortKey;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a task for one of the modules
    ///
    /// Example: opsuite create --type dumper --name "Shop dump" --status running
    Create {
        #[arg(long = "type", value_name = "TYPE")]
        kind: TaskKind,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        module: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        progress: Option<u8>,
        /// Module settings as a JSON object
        #[arg(long, value_name = "JSON")]
        settings: Option<String>,
    },
    /// Patch fields of a task
    ///
    /// Example: opsuite update TSK003 --status failed --progress 40
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        module: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long = "time-remaining")]
        time_remaining: Option<String>,
    },
    /// Rename a task
    ///
    /// Example: opsuite rename TSK003 "Weekly dump"
    Rename {
        id: String,
        name: String,
    },
    /// Pause a running task or resume a paused one
    ///
    /// Example: opsuite toggle TSK003
    Toggle {
        id: String,
    },
    /// Mark a task as completed
    ///
    /// Example: opsuite complete TSK003
    Complete {
        id: String,
    },
    /// Mark a task as failed
    ///
    /// Example: opsuite fail TSK003 -r "proxy pool exhausted"
    Fail {
        id: String,
        #[arg(short = 'r', long)]
        reason: Option<String>,
    },
    /// Delete a task
    ///
    /// Example: opsuite delete TSK003
    Delete {
        id: String,
    },
    /// Show details of a task
    ///
    /// Example: opsuite show TSK003
    Show {
        id: String,
    },
    /// List tasks
    ///
    /// Example: opsuite list --status running --sort progress
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        module: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, default_value = "created")]
        sort: SortKey,
        /// Sort ascending instead of newest first
        #[arg(long)]
        asc: bool,
    },
    /// Show the activity log
    ///
    /// Example: opsuite history --level error
    History {
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
        #[arg(long)]
        level: Option<LogLevel>,
        /// Only the newest N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Append an entry to the activity log
    ///
    /// Example: opsuite log "Proxy Rotated" "Switched to pool B" --level warning
    Log {
        #[arg(value_name = "TYPE")]
        kind: String,
        message: String,
        #[arg(long, default_value = "info")]
        level: LogLevel,
        #[arg(long)]
        module: Option<String>,
        #[arg(long = "task", value_name = "ID")]
        task_id: Option<String>,
    },
    /// Show dashboard totals
    ///
    /// Example: opsuite stats
    Stats,
    /// Advance running tasks until none is left
    ///
    /// Example: opsuite run --max-ticks 10
    Run {
        #[arg(long = "max-ticks")]
        max_ticks: Option<usize>,
    },
    /// Show or change app settings
    ///
    /// Example: opsuite settings set bots 400
    Settings {
        #[command(subcommand)]
        settings: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print all settings
    ///
    /// Example: opsuite settings show
    Show,
    /// Change one setting
    ///
    /// Example: opsuite settings set proxyless off
    Set {
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DriverIntervalMs,
    DriverStep,
    DriverCompletionThreshold,
    LogFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "log_filter" => {
            if remainder.is_some() {
                return Err("log_filter override cannot have subfields".to_string());
            }
            ConfigOverrideTarget::LogFilter
        }
        "driver" => {
            let setting = remainder
                .and_then(canonicalize_flag_name)
                .ok_or_else(|| "driver override requires a setting name".to_string())?;
            match setting.as_str() {
                "interval_ms" | "interval" => ConfigOverrideTarget::DriverIntervalMs,
                "step" => ConfigOverrideTarget::DriverStep,
                "completion_threshold" | "threshold" => {
                    ConfigOverrideTarget::DriverCompletionThreshold
                }
                other => return Err(format!("unknown driver setting '{other}'")),
            }
        }
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_upper = false;

    for ch in name.chars() {
        if ch.is_ascii_uppercase() && !previous_upper && !cleaned.is_empty() {
            cleaned.push('_');
        }
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_upper = ch.is_ascii_uppercase();
        } else if !cleaned.ends_with('_') && !cleaned.is_empty() {
            cleaned.push('_');
            previous_upper = false;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
