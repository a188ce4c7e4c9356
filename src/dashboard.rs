//! Dashboard session over one loaded table.
//!
//! The session derives the table once and caches the subject statistics on
//! first use. Reloading the data means building a new session.

use crate::analysis;
use crate::models::{Anomaly, SubjectStats, Table};
use std::cell::OnceCell;
use tracing::{debug, warn};

pub struct Dashboard {
    table: Table,
    statistics: OnceCell<Vec<SubjectStats>>,
}

impl Dashboard {
    /// Start a session from a freshly loaded table.
    pub fn new(table: Table) -> Self {
        let table = analysis::derive(&table);
        debug!("Derived totals and averages for {} records", table.len());

        Self {
            table,
            statistics: OnceCell::new(),
        }
    }

    /// The derived table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Statistics for every subject of the table, computed once per session.
    pub fn subject_statistics(&self) -> &[SubjectStats] {
        self.statistics.get_or_init(|| {
            debug!("Computing subject statistics");
            analysis::all_subject_statistics(&self.table)
        })
    }

    /// Marks outside the expected range, each logged as a warning.
    pub fn report_anomalies(&self) -> Vec<Anomaly> {
        let found = analysis::anomalies(&self.table);
        for a in &found {
            warn!(
                "Mark {} for {} ({}) in {} is outside 0-100",
                a.mark, a.name, a.student_id, a.subject
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;

    fn create_test_dashboard() -> Dashboard {
        let subjects = vec!["Math".to_string(), "Art".to_string()];
        let table = Table::new(
            subjects,
            vec![
                StudentRecord::new("S1", "Asha", vec![90.0, 80.0]),
                StudentRecord::new("S2", "Ben", vec![70.0, 104.0]),
            ],
        )
        .unwrap();
        Dashboard::new(table)
    }

    #[test]
    fn test_table_is_derived() {
        let dashboard = create_test_dashboard();
        assert!(dashboard.table().records().iter().all(|r| r.derived.is_some()));
        assert_eq!(dashboard.table().records()[1].total_marks(), 174.0);
    }

    #[test]
    fn test_statistics_are_cached() {
        let dashboard = create_test_dashboard();
        let first = dashboard.subject_statistics().as_ptr();
        let second = dashboard.subject_statistics().as_ptr();
        assert_eq!(first, second);
        assert_eq!(dashboard.subject_statistics().len(), 2);
        assert_eq!(dashboard.subject_statistics()[0].average, Some(80.0));
        assert_eq!(dashboard.subject_statistics()[1].subject, "Art");
    }

    #[test]
    fn test_report_anomalies() {
        let found = create_test_dashboard().report_anomalies();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Art");
    }
}
