//! Data models for the marks dashboard.
//!
//! This module contains the table and record types the engine operates on,
//! plus the result types handed to the report generator.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest mark considered in range.
pub const MIN_MARK: f64 = 0.0;
/// Highest mark considered in range.
pub const MAX_MARK: f64 = 100.0;

/// Marks computed from a record's own scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMarks {
    pub total_marks: f64,
    pub average_marks: f64,
}

impl DerivedMarks {
    /// Compute totals from a score row. An empty row averages to zero.
    pub fn from_scores(scores: &[f64]) -> Self {
        let total_marks: f64 = scores.iter().sum();
        let average_marks = if scores.is_empty() {
            0.0
        } else {
            total_marks / scores.len() as f64
        };
        Self {
            total_marks,
            average_marks,
        }
    }
}

/// One student row of the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Stable identifier, unique within a table.
    pub student_id: String,
    /// Display name, not necessarily unique.
    pub name: String,
    /// One mark per subject, in the table's subject order.
    pub scores: Vec<f64>,
    /// Present once the table has been through `derive`.
    #[serde(flatten)]
    pub derived: Option<DerivedMarks>,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            scores,
            derived: None,
        }
    }

    /// Derived marks, computed on the fly when the record was never derived.
    pub fn marks(&self) -> DerivedMarks {
        self.derived
            .unwrap_or_else(|| DerivedMarks::from_scores(&self.scores))
    }

    pub fn total_marks(&self) -> f64 {
        self.marks().total_marks
    }

    pub fn average_marks(&self) -> f64 {
        self.marks().average_marks
    }

    /// Value of the requested ranking field.
    pub fn field(&self, field: RankField) -> f64 {
        match field {
            RankField::AverageMarks => self.average_marks(),
            RankField::TotalMarks => self.total_marks(),
        }
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::classify(self.average_marks())
    }
}

/// An immutable table of student records over a fixed subject set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    subjects: Vec<String>,
    records: Vec<StudentRecord>,
}

impl Table {
    /// Build a table, checking that every record has one score per subject.
    pub fn new(subjects: Vec<String>, records: Vec<StudentRecord>) -> EngineResult<Self> {
        validate_subjects(&subjects)?;

        if let Some(bad) = records.iter().find(|r| r.scores.len() != subjects.len()) {
            return Err(EngineError::invalid(format!(
                "record '{}' has {} scores but the table has {} subjects",
                bad.student_id,
                bad.scores.len(),
                subjects.len()
            )));
        }

        Ok(Self { subjects, records })
    }

    #[cfg(test)]
    pub fn empty(subjects: Vec<String>) -> EngineResult<Self> {
        Self::new(subjects, Vec::new())
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column index of a subject, or `InvalidArgument` if it is not in the set.
    pub fn subject_index(&self, subject: &str) -> EngineResult<usize> {
        self.subjects
            .iter()
            .position(|s| s == subject)
            .ok_or_else(|| EngineError::invalid(format!("unknown subject '{}'", subject)))
    }

    /// All marks recorded for one subject, in record order.
    pub fn column(&self, subject: &str) -> EngineResult<Vec<f64>> {
        let idx = self.subject_index(subject)?;
        Ok(self.records.iter().map(|r| r.scores[idx]).collect())
    }

    /// Replace the records while keeping the subject set.
    pub(crate) fn with_records(&self, records: Vec<StudentRecord>) -> Self {
        Self {
            subjects: self.subjects.clone(),
            records,
        }
    }
}

/// Reject an empty or duplicated subject set.
pub fn validate_subjects(subjects: &[String]) -> EngineResult<()> {
    if subjects.is_empty() {
        return Err(EngineError::invalid("the subject set must not be empty"));
    }
    for (i, subject) in subjects.iter().enumerate() {
        if subject.trim().is_empty() {
            return Err(EngineError::invalid("subject names must not be blank"));
        }
        if subjects[..i].contains(subject) {
            return Err(EngineError::invalid(format!(
                "subject '{}' is listed more than once",
                subject
            )));
        }
    }
    Ok(())
}

/// Numeric field used to rank students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankField {
    AverageMarks,
    TotalMarks,
}

impl fmt::Display for RankField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankField::AverageMarks => write!(f, "average_marks"),
            RankField::TotalMarks => write!(f, "total_marks"),
        }
    }
}

impl FromStr for RankField {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "average_marks" | "average" => Ok(RankField::AverageMarks),
            "total_marks" | "total" => Ok(RankField::TotalMarks),
            other => Err(EngineError::invalid(format!(
                "unknown ranking field '{}'",
                other
            ))),
        }
    }
}

/// Performance category of a student's average mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Average of 85 or above
    Excellent,
    /// Average in [75, 85)
    Good,
    /// Average in [65, 75)
    Average,
    /// Average below 65
    BelowAverage,
}

impl Bucket {
    /// Every bucket, in display order.
    pub const ALL: [Bucket; 4] = [
        Bucket::Excellent,
        Bucket::Good,
        Bucket::Average,
        Bucket::BelowAverage,
    ];

    /// Place an average mark into its bucket. Bounds are half-open, lower inclusive.
    pub fn classify(average: f64) -> Self {
        if average >= 85.0 {
            Bucket::Excellent
        } else if average >= 75.0 {
            Bucket::Good
        } else if average >= 65.0 {
            Bucket::Average
        } else {
            Bucket::BelowAverage
        }
    }

    /// Label including the score range.
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Excellent => "Excellent (≥85)",
            Bucket::Good => "Good (75-84)",
            Bucket::Average => "Average (65-74)",
            Bucket::BelowAverage => "Below Average (<65)",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Bucket::Excellent => "🌟",
            Bucket::Good => "✅",
            Bucket::Average => "📖",
            Bucket::BelowAverage => "⚠️",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Excellent => write!(f, "Excellent"),
            Bucket::Good => write!(f, "Good"),
            Bucket::Average => write!(f, "Average"),
            Bucket::BelowAverage => write!(f, "Below Average"),
        }
    }
}

/// Per-subject summary. `None` marks a statistic that is not applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub subject: String,
    pub average: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub std_dev: Option<f64>,
    pub iqr: Option<f64>,
}

/// Size of one performance bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketShare {
    pub bucket: Bucket,
    pub count: usize,
    /// Share of all records, or `None` for an empty table.
    pub percentage: Option<f64>,
}

/// A subject paired with its mean mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMean {
    pub subject: String,
    pub average: f64,
}

/// A student paired with their average mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMean {
    pub student_id: String,
    pub name: String,
    pub average_marks: f64,
}

/// Best and worst subjects and students.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub best_subject: Option<SubjectMean>,
    pub worst_subject: Option<SubjectMean>,
    pub top_student: Option<StudentMean>,
    pub bottom_student: Option<StudentMean>,
}

impl Extremes {
    /// Gap between the best and worst subject means.
    pub fn improvement_gap(&self) -> Option<f64> {
        match (&self.best_subject, &self.worst_subject) {
            (Some(best), Some(worst)) => Some(best.average - worst.average),
            _ => None,
        }
    }
}

/// Student-by-subject matrix of marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTab {
    pub subjects: Vec<String>,
    pub rows: Vec<CrossTabRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTabRow {
    pub student_id: String,
    pub name: String,
    pub marks: Vec<f64>,
}

/// Class-wide metrics over every individual mark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub students: usize,
    pub subjects: usize,
    pub class_average: Option<f64>,
    pub highest_mark: Option<f64>,
    pub lowest_mark: Option<f64>,
    pub score_range: Option<f64>,
    pub mean_student_average: Option<f64>,
}

/// A subject's spread, flagged when above the mean spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectVariability {
    pub subject: String,
    pub iqr: f64,
    pub above_mean: bool,
}

/// A mark outside the expected range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub student_id: String,
    pub name: String,
    pub subject: String,
    pub mark: f64,
}
