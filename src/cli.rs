//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::{SortKey, COMPARE_RANGE};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Marksboard - student marks analysis dashboard
///
/// Loads a CSV of student marks and reports subject statistics, rankings,
/// performance buckets and chart data as Markdown or JSON.
///
/// Examples:
///   marksboard
///   marksboard --data term1.csv --view subjects
///   marksboard --view performance --top 10 --format json
///   marksboard --view explorer --sort-by name --search sha
///   marksboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the marks CSV file
    ///
    /// Defaults to data/student_marks.csv, or the path in .marksboard.toml.
    #[arg(short, long, value_name = "FILE", env = "MARKSBOARD_DATA")]
    pub data: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .marksboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dashboard view to render
    #[arg(long, default_value = "all", value_name = "VIEW")]
    pub view: View,

    /// Subjects to analyze (comma-separated), in display order
    ///
    /// Example: --subjects Mathematics,Physics,English
    #[arg(long, value_name = "SUBJECTS", value_delimiter = ',')]
    pub subjects: Option<Vec<String>>,

    /// Number of top students to rank
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,

    /// Number of top students in the subject comparison chart (3-10)
    #[arg(long, value_name = "N")]
    pub compare: Option<usize>,

    /// Field to rank students by (average_marks, total_marks)
    #[arg(long, value_name = "FIELD")]
    pub rank_by: Option<String>,

    /// Ordering of the data explorer table
    #[arg(long, default_value = "student-id", value_name = "KEY")]
    pub sort_by: SortBy,

    /// Case-insensitive name search shown in the data explorer
    #[arg(short, long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Output format (markdown, json)
    ///
    /// Defaults to markdown, or the format in .marksboard.toml.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .marksboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Dashboard section to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum View {
    /// Every section
    #[default]
    All,
    /// Headline metrics and a data preview
    Overview,
    /// Full sorted table and name search
    Explorer,
    /// Per-subject statistics and variability
    Subjects,
    /// Rankings and performance distribution
    Performance,
    /// Chart data series
    Visualizations,
    /// Key findings and recommendations
    Summary,
}

/// Data explorer ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortBy {
    StudentId,
    Name,
    AverageMarks,
    TotalMarks,
}

impl From<SortBy> for SortKey {
    fn from(sort: SortBy) -> Self {
        match sort {
            SortBy::StudentId => SortKey::StudentId,
            SortBy::Name => SortKey::Name,
            SortBy::AverageMarks => SortKey::AverageMarks,
            SortBy::TotalMarks => SortKey::TotalMarks,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if let Some(compare) = self.compare {
            let (lo, hi) = COMPARE_RANGE;
            if !(lo..=hi).contains(&compare) {
                return Err(format!("--compare must be between {} and {}", lo, hi));
            }
        }

        if let Some(ref subjects) = self.subjects {
            if subjects.iter().any(|s| s.trim().is_empty()) {
                return Err("--subjects must not contain empty names".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if data.is_dir() {
                return Err(format!("Data path is a directory: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: Some(PathBuf::from("marks.csv")),
            config: None,
            view: View::All,
            subjects: None,
            top: None,
            compare: None,
            rank_by: None,
            sort_by: SortBy::StudentId,
            search: None,
            format: None,
            output: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "marksboard",
            "--data",
            "term1.csv",
            "--view",
            "performance",
            "--top",
            "3",
            "--sort-by",
            "average-marks",
            "--subjects",
            "Math,Physics",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.data, Some(PathBuf::from("term1.csv")));
        assert_eq!(args.view, View::Performance);
        assert_eq!(args.top, Some(3));
        assert_eq!(args.sort_by, SortBy::AverageMarks);
        assert_eq!(
            args.subjects,
            Some(vec!["Math".to_string(), "Physics".to_string()])
        );
        assert_eq!(args.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_format_is_optional() {
        let args = Args::try_parse_from(["marksboard"]).unwrap();
        assert_eq!(args.format, None);
        assert!(Args::try_parse_from(["marksboard", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.compare = Some(11);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.compare = Some(3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_sort_by_conversion() {
        assert_eq!(SortKey::from(SortBy::Name), SortKey::Name);
        assert_eq!(SortKey::from(SortBy::TotalMarks), SortKey::TotalMarks);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
