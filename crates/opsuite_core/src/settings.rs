use crate::error::AppError;
use crate::storage::{JsonStore, KeyValueStorage};
use serde::{Deserialize, Serialize};

pub const APP_SETTINGS_KEY: &str = "appSettings";

/// Operator toggles edited on the settings page and stored under `appSettings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub google_api3: bool,
    pub google_api2: bool,
    pub proxyless: bool,
    #[serde(rename = "filtering1")]
    pub filtering_primary: bool,
    #[serde(rename = "filtering2")]
    pub filtering_secondary: bool,
    pub bots: u32,
    pub timeout: u32,
    pub pages: u32,
    pub dork_ckees: bool,
    pub check_db: bool,
    pub import_bad: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            google_api3: true,
            google_api2: true,
            proxyless: true,
            filtering_primary: false,
            filtering_secondary: true,
            bots: 800,
            timeout: 5,
            pages: 15,
            dork_ckees: true,
            check_db: true,
            import_bad: false,
        }
    }
}

impl AppSettings {
    pub fn load<S: KeyValueStorage>(store: &JsonStore<S>) -> Self {
        store.get(APP_SETTINGS_KEY, Self::default())
    }

    pub fn save<S: KeyValueStorage>(&self, store: &JsonStore<S>) -> Result<(), AppError> {
        store.try_set(APP_SETTINGS_KEY, self)
    }

    /// Sets one field by its stored name, parsing `raw` as that field's type.
    pub fn apply_setting(&mut self, key: &str, raw: &str) -> Result<(), AppError> {
        let key = key.trim();
        let raw = raw.trim();
        let mut fields = match serde_json::to_value(&*self) {
            Ok(serde_json::Value::Object(fields)) => fields,
            _ => return Err(AppError::invalid_data("settings are not an object")),
        };

        let value = match fields.get(key) {
            Some(serde_json::Value::Bool(_)) => parse_flag(raw)
                .map(serde_json::Value::Bool)
                .ok_or_else(|| AppError::invalid_input(format!("{key} expects on/off")))?,
            Some(serde_json::Value::Number(_)) => raw
                .parse::<u32>()
                .map(serde_json::Value::from)
                .map_err(|_| AppError::invalid_input(format!("{key} expects a number")))?,
            _ => return Err(AppError::invalid_input(format!("unknown setting '{key}'"))),
        };
        fields.insert(key.to_string(), value);

        *self = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        Ok(())
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(fields)) => fields
                .into_iter()
                .map(|(key, value)| {
                    let rendered = match value {
                        serde_json::Value::Bool(true) => "ON".to_string(),
                        serde_json::Value::Bool(false) => "OFF".to_string(),
                        other => other.to_string(),
                    };
                    (key, rendered)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
