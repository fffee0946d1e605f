//! Importer configuration: token sets and heuristic switches

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration shared by every import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Corner-cell strings (case-insensitive) that mark the first column
    /// as observation labels. A blank corner always does.
    #[serde(default = "default_label_header_tokens")]
    pub label_header_tokens: Vec<String>,
    /// Strings read as missing values where a number is expected
    #[serde(default = "default_missing_tokens")]
    pub missing_tokens: Vec<String>,
    /// Rewrite integer labels that look like serial dates
    #[serde(default = "default_true")]
    pub detect_dates: bool,
}

impl ImportConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ImportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn is_label_header(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty()
            || self
                .label_header_tokens
                .iter()
                .any(|token| token.eq_ignore_ascii_case(text))
    }

    pub fn is_missing_token(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty() || self.missing_tokens.iter().any(|token| token == text)
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            label_header_tokens: default_label_header_tokens(),
            missing_tokens: default_missing_tokens(),
            detect_dates: true,
        }
    }
}

fn default_label_header_tokens() -> Vec<String> {
    [
        "obs",
        "obs.",
        "observation",
        "date",
        "dates",
        "year",
        "period",
        "quarter",
        "qtr",
        "month",
        "week",
        "day",
        "time",
        "id",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_missing_tokens() -> Vec<String> {
    [
        "NA", "N.A.", "n.a.", "na", "n/a", "N/A", "#N/A", "NaN", ".NaN", ".", "..", "-",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}
