//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.marksboard.toml` files.

use crate::analysis::COMPARE_RANGE;
use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".marksboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the marks table lives and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path of the delimited marks file.
    #[serde(default = "default_data_path")]
    pub path: String,

    /// Header of the identifier column.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Header of the student name column.
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Subject columns, in display order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,

    /// Single-character field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            id_column: default_id_column(),
            name_column: default_name_column(),
            subjects: default_subjects(),
            delimiter: default_delimiter(),
        }
    }
}

impl DataConfig {
    /// The delimiter as a byte. Falls back to a comma; `validate` rejects bad values first.
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter.as_bytes() {
            [b] => *b,
            _ => b',',
        }
    }
}

fn default_data_path() -> String {
    "data/student_marks.csv".to_string()
}

fn default_id_column() -> String {
    "Student_ID".to_string()
}

fn default_name_column() -> String {
    "Name".to_string()
}

fn default_subjects() -> Vec<String> {
    vec!["Mathematics", "Physics", "Chemistry", "English", "History"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output file. The report goes to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report format (`markdown` or `json`).
    #[serde(default)]
    pub format: OutputFormat,

    /// Number of students in the rankings.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Number of students in the subject comparison chart.
    #[serde(default = "default_compare_n")]
    pub compare_n: usize,

    /// Rows shown in the overview preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Field used for the rankings (`average_marks` or `total_marks`).
    #[serde(default = "default_rank_by")]
    pub rank_by: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: OutputFormat::default(),
            top_n: default_top_n(),
            compare_n: default_compare_n(),
            preview_rows: default_preview_rows(),
            rank_by: default_rank_by(),
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_compare_n() -> usize {
    5
}

fn default_preview_rows() -> usize {
    10
}

fn default_rank_by() -> String {
    "average_marks".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_default_in(Path::new("."))
    }

    /// Like [`Config::load_default`], looking in `dir` instead of the working directory.
    pub fn load_default_in(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.path = data.display().to_string();
        }
        if let Some(ref subjects) = args.subjects {
            self.data.subjects = subjects.clone();
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top) = args.top {
            self.report.top_n = top;
        }
        if let Some(compare) = args.compare {
            self.report.compare_n = compare;
        }
        if let Some(ref rank_by) = args.rank_by {
            self.report.rank_by = rank_by.clone();
        }
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        crate::models::validate_subjects(&self.data.subjects)
            .context("Invalid subject list in configuration")?;

        if self.data.delimiter.len() != 1 || !self.data.delimiter.is_ascii() {
            bail!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.data.delimiter
            );
        }

        if self.data.id_column == self.data.name_column {
            bail!("Identifier and name columns must differ");
        }

        if self.report.top_n == 0 {
            bail!("top_n must be at least 1");
        }

        let (lo, hi) = COMPARE_RANGE;
        if !(lo..=hi).contains(&self.report.compare_n) {
            bail!("compare_n must be between {} and {}", lo, hi);
        }

        if self.report.preview_rows == 0 {
            bail!("preview_rows must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
