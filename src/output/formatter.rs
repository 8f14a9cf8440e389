//! Output formatting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ReloadOutcome;
use crate::feature::{FeatureRecord, FeatureShape};
use crate::output::human::format_human;
use crate::output::json::format_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSummary {
    pub name: String,
    pub path: PathBuf,
    pub shape: FeatureShape,
    pub loaded_at: DateTime<Utc>,
}

impl From<&FeatureRecord> for FeatureSummary {
    fn from(record: &FeatureRecord) -> Self {
        Self {
            name: record.name.clone(),
            path: record.path.clone(),
            shape: record.shape(),
            loaded_at: record.loaded_at,
        }
    }
}

/// Result of `quill check`: everything loaded, plus what the reload published
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub features: Vec<FeatureSummary>,
    pub providers: Vec<String>,
    pub reload: ReloadOutcome,
    pub bindings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    /// Names of discoverable features
    Features(Vec<String>),
    Check(CheckReport),
}

pub fn format_output(report: &Report, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(report),
        OutputFormat::Json => format_json(report),
    }
}
