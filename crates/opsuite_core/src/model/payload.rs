//! Per-module task payloads.
//!
//! Each task kind carries its own `results`, `graphs` and `settings` schema.
//! The store moves payloads around without interpreting them; the variant tag
//! is the task's `type` field, so a dumper task can never carry scraper
//! settings.

use crate::error::AppError;
use crate::model::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskPayload {
    Scraper {
        #[serde(default)]
        results: ScraperResults,
        #[serde(default)]
        graphs: ScraperGraphs,
        #[serde(default)]
        settings: ScraperSettings,
    },
    Vulnerability {
        #[serde(default)]
        results: VulnerabilityResults,
        #[serde(default)]
        graphs: VulnerabilityGraphs,
        #[serde(default)]
        settings: VulnerabilitySettings,
    },
    /// The dorks checker has no fixed schema yet; its payload is kept verbatim.
    DorksChecker {
        #[serde(default)]
        results: serde_json::Map<String, serde_json::Value>,
        #[serde(default)]
        graphs: serde_json::Map<String, serde_json::Value>,
        #[serde(default)]
        settings: serde_json::Map<String, serde_json::Value>,
    },
    Dumper {
        #[serde(default)]
        results: DumperResults,
        #[serde(default)]
        graphs: DumperGraphs,
        #[serde(default)]
        settings: DumperSettings,
    },
    Dehasher {
        #[serde(default)]
        results: DehasherResults,
        #[serde(default)]
        graphs: DehasherGraphs,
        #[serde(default)]
        settings: DehasherSettings,
    },
    Antipublic {
        #[serde(default)]
        results: AntipublicResults,
        #[serde(default)]
        graphs: AntipublicGraphs,
        #[serde(default)]
        settings: AntipublicSettings,
    },
    Parser {
        #[serde(default)]
        results: ParserResults,
        #[serde(default)]
        graphs: ParserGraphs,
        #[serde(default)]
        settings: ParserSettings,
    },
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Scraper { .. } => TaskKind::Scraper,
            Self::Vulnerability { .. } => TaskKind::Vulnerability,
            Self::DorksChecker { .. } => TaskKind::DorksChecker,
            Self::Dumper { .. } => TaskKind::Dumper,
            Self::Dehasher { .. } => TaskKind::Dehasher,
            Self::Antipublic { .. } => TaskKind::Antipublic,
            Self::Parser { .. } => TaskKind::Parser,
        }
    }

    /// Payload with zeroed results, no graph samples and default settings.
    pub fn empty(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Scraper => Self::Scraper {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::Vulnerability => Self::Vulnerability {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::DorksChecker => Self::DorksChecker {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::Dumper => Self::Dumper {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::Dehasher => Self::Dehasher {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::Antipublic => Self::Antipublic {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
            TaskKind::Parser => Self::Parser {
                results: Default::default(),
                graphs: Default::default(),
                settings: Default::default(),
            },
        }
    }

    /// Builds a payload of `kind` whose settings are decoded from a JSON object.
    pub fn with_settings_json(kind: TaskKind, settings: &str) -> Result<Self, AppError> {
        let settings: serde_json::Value = serde_json::from_str(settings)
            .map_err(|err| AppError::invalid_input(format!("settings must be JSON: {err}")))?;
        if !settings.is_object() {
            return Err(AppError::invalid_input("settings must be a JSON object"));
        }

        let raw = serde_json::json!({
            "type": kind.as_str(),
            "settings": settings,
        });
        serde_json::from_value(raw).map_err(|err| {
            AppError::invalid_input(format!("invalid {} settings: {}", kind.as_str(), err))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedPoint {
    pub name: String,
    pub speed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPoint {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthPoint {
    pub name: String,
    pub mbps: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePoint {
    pub name: String,
    pub usage: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScraperResults {
    pub total_links: u64,
    pub valid: u64,
    pub filtered: u64,
    pub dork_per_minute: u64,
    pub filter_per_minute: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScraperGraphs {
    pub dork_speed: Vec<SpeedPoint>,
    pub filter_speed: Vec<SpeedPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScraperSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub engines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antipublic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VulnerabilityResults {
    pub total_links: u64,
    pub tested_per_minute: u64,
    pub vulnerabilities_found: u64,
    pub vulnerabilities: Vec<VulnerabilityCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VulnerabilityGraphs {
    pub tested_speed: Vec<SpeedPoint>,
    pub vulnerability_distribution: Vec<ValuePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VulnerabilitySettings {
    pub scan_types: Vec<String>,
    pub full_scan: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DumperResults {
    pub rows_dumped: u64,
    pub tables_found: u64,
    pub dump_speed: u64,
    pub databases_found: u64,
    pub columns_found: u64,
    pub admins_found: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DumperGraphs {
    pub dump_speed: Vec<SpeedPoint>,
    pub data_composition: Vec<ValuePoint>,
    pub found_items: Vec<CountPoint>,
    pub proxy_bandwidth: Vec<BandwidthPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DumperSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DehasherResults {
    pub total_hashes: u64,
    pub cracked: u64,
    pub not_found: u64,
    pub crack_speed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DehasherGraphs {
    pub crack_speed: Vec<SpeedPoint>,
    pub hash_types: Vec<ValuePoint>,
    pub proxy_bandwidth: Vec<BandwidthPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DehasherSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AntipublicResults {
    pub total_lines: u64,
    #[serde(alias = "public")]
    pub public_lines: u64,
    #[serde(alias = "private")]
    pub private_lines: u64,
    pub check_speed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AntipublicGraphs {
    pub check_speed: Vec<SpeedPoint>,
    pub publicity: Vec<ValuePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AntipublicSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserResults {
    pub lines_parsed: u64,
    #[serde(alias = "dataPoints")]
    pub data_points_extracted: u64,
    pub parse_speed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserGraphs {
    pub cpu_usage: Vec<UsagePoint>,
    pub proxy_performance: Vec<CountPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{DehasherSettings, TaskPayload};
    use crate::model::TaskKind;

    #[test]
    fn empty_payload_matches_kind() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskPayload::empty(kind).kind(), kind);
        }
    }

    #[test]
    fn settings_json_decodes_into_module_schema() {
        let payload = TaskPayload::with_settings_json(
            TaskKind::Dehasher,
            r#"{ "source": "hashes.txt", "hashType": "MD5" }"#,
        )
        .unwrap();

        match payload {
            TaskPayload::Dehasher { settings, .. } => assert_eq!(
                settings,
                DehasherSettings {
                    source: Some("hashes.txt".to_string()),
                    hash_type: Some("MD5".to_string()),
                }
            ),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn settings_json_rejects_wrong_field_types() {
        let err = TaskPayload::with_settings_json(TaskKind::Scraper, r#"{ "pages": "ten" }"#)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn settings_json_rejects_non_objects() {
        let err = TaskPayload::with_settings_json(TaskKind::Parser, "[1, 2]").unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = TaskPayload::with_settings_json(TaskKind::Parser, "{ nope").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn dorks_checker_keeps_unknown_fields() {
        let payload =
            TaskPayload::with_settings_json(TaskKind::DorksChecker, r#"{ "threads": 12 }"#)
                .unwrap();
        match payload {
            TaskPayload::DorksChecker { settings, .. } => {
                assert_eq!(settings.get("threads"), Some(&serde_json::json!(12)));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
