use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    pub level: LogLevel,
}

impl ActivityLogEntry {
    pub fn task_id(&self) -> Option<&str> {
        self.details.get("taskId").and_then(|value| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(AppError::invalid_input(format!("unknown log level '{other}'"))),
        }
    }
}

/// Input for an activity log append. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub kind: String,
    pub module: Option<String>,
    pub message: String,
    pub details: serde_json::Map<String, serde_json::Value>,
    pub level: LogLevel,
}

impl NewLogEntry {
    pub fn new<K: Into<String>, M: Into<String>>(kind: K, message: M, level: LogLevel) -> Self {
        Self {
            kind: kind.into(),
            module: None,
            message: message.into(),
            details: serde_json::Map::new(),
            level,
        }
    }

    pub fn with_module<M: Into<String>>(mut self, module: M) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_task_id(self, task_id: &str) -> Self {
        self.with_detail("taskId", serde_json::Value::String(task_id.to_string()))
    }

    pub fn with_detail<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}
