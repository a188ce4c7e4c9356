//! Delimited-text loader for the marks table.
//!
//! Reads a header row plus one row per student, validating every required
//! field up front. A single bad row rejects the whole load; nothing is
//! coerced or silently dropped.

use crate::error::{EngineError, EngineResult};
use crate::models::{validate_subjects, StudentRecord, Table};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where to read the table from and which columns matter.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Path of the source file
    pub path: PathBuf,
    /// Header of the identifier column
    pub id_column: String,
    /// Header of the display-name column
    pub name_column: String,
    /// Subject headers, in display order
    pub subjects: Vec<String>,
    /// Field delimiter byte
    pub delimiter: u8,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/student_marks.csv"),
            id_column: "Student_ID".to_string(),
            name_column: "Name".to_string(),
            subjects: vec!["Mathematics", "Physics", "Chemistry", "English", "History"]
                .into_iter()
                .map(String::from)
                .collect(),
            delimiter: b',',
        }
    }
}

impl From<&crate::config::DataConfig> for LoadConfig {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            id_column: config.id_column.clone(),
            name_column: config.name_column.clone(),
            subjects: config.subjects.clone(),
            delimiter: config.delimiter_byte(),
        }
    }
}

/// Column positions resolved from the header row.
struct ColumnLayout {
    id: usize,
    name: usize,
    subjects: Vec<usize>,
}

/// Loads marks tables according to a [`LoadConfig`].
pub struct TableLoader {
    config: LoadConfig,
}

impl TableLoader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Open the configured file and load it.
    pub fn load(&self) -> EngineResult<Table> {
        let path = &self.config.path;
        debug!("Opening {}", path.display());

        let file = File::open(path).map_err(|e| EngineError::unavailable(path, e.to_string()))?;
        let table = self.load_from_reader(file, path)?;

        info!(
            "Loaded {} records over {} subjects from {}",
            table.len(),
            table.subjects().len(),
            path.display()
        );
        Ok(table)
    }

    /// Load from any reader. `origin` only labels errors.
    pub fn load_from_reader<R: Read>(&self, reader: R, origin: &Path) -> EngineResult<Table> {
        validate_subjects(&self.config.subjects)?;

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .trim(csv::Trim::All)
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| EngineError::unavailable(origin, format!("unreadable header: {}", e)))?
            .clone();
        let layout = self.resolve_columns(&headers, origin)?;

        let mut records = Vec::new();
        let mut seen_ids = HashSet::new();

        for row in rdr.records() {
            let row = row.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                EngineError::malformed(line, "", e.to_string())
            })?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let record = self.parse_row(&row, &layout, line)?;
            if !seen_ids.insert(record.student_id.clone()) {
                return Err(EngineError::malformed(
                    line,
                    &self.config.id_column,
                    format!("duplicate identifier '{}'", record.student_id),
                ));
            }
            records.push(record);
        }

        debug!("Parsed {} rows from {}", records.len(), origin.display());
        Table::new(self.config.subjects.clone(), records)
    }

    /// Find every required column in the header. Extra columns are ignored.
    fn resolve_columns(&self, headers: &csv::StringRecord, origin: &Path) -> EngineResult<ColumnLayout> {
        let find = |column: &str| {
            headers.iter().position(|h| h == column).ok_or_else(|| {
                EngineError::unavailable(origin, format!("missing required column '{}'", column))
            })
        };

        Ok(ColumnLayout {
            id: find(&self.config.id_column)?,
            name: find(&self.config.name_column)?,
            subjects: self
                .config
                .subjects
                .iter()
                .map(|s| find(s))
                .collect::<EngineResult<Vec<_>>>()?,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord, layout: &ColumnLayout, line: u64) -> EngineResult<StudentRecord> {
        let field = |idx: usize, column: &str| {
            row.get(idx)
                .ok_or_else(|| EngineError::malformed(line, column, "field is missing"))
        };

        let student_id = field(layout.id, &self.config.id_column)?;
        if student_id.is_empty() {
            return Err(EngineError::malformed(
                line,
                &self.config.id_column,
                "identifier is empty",
            ));
        }
        let name = field(layout.name, &self.config.name_column)?;

        let mut scores = Vec::with_capacity(layout.subjects.len());
        for (subject, &idx) in self.config.subjects.iter().zip(&layout.subjects) {
            let raw = field(idx, subject)?;
            let mark = raw.parse::<f64>().map_err(|_| {
                EngineError::malformed(line, subject, format!("'{}' is not a number", raw))
            })?;
            if !mark.is_finite() {
                return Err(EngineError::malformed(
                    line,
                    subject,
                    format!("'{}' is not a finite mark", raw),
                ));
            }
            scores.push(mark);
        }

        Ok(StudentRecord::new(student_id, name, scores))
    }
}
