//! Marks aggregation and derived statistics.
//!
//! Every function here is a pure query over an immutable [`Table`]. Ties are
//! always resolved in favour of the record or subject that comes first in
//! iteration order.

use super::stats;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Anomaly, Bucket, BucketShare, ClassSummary, CrossTab, CrossTabRow, DerivedMarks, Extremes,
    RankField, StudentMean, StudentRecord, SubjectMean, SubjectStats, SubjectVariability, Table,
    MAX_MARK, MIN_MARK,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Smallest and largest student count for the subject comparison chart.
pub const COMPARE_RANGE: (usize, usize) = (3, 10);

/// Return a copy of the table with `total_marks` and `average_marks` filled in.
///
/// Derived values are always recomputed from the scores, so deriving twice
/// gives the same table as deriving once.
pub fn derive(table: &Table) -> Table {
    let records = table
        .records()
        .iter()
        .map(|r| StudentRecord {
            derived: Some(DerivedMarks::from_scores(&r.scores)),
            ..r.clone()
        })
        .collect();

    table.with_records(records)
}

/// Statistics for each requested subject, in the order given.
pub fn subject_statistics(table: &Table, subjects: &[String]) -> EngineResult<Vec<SubjectStats>> {
    subjects
        .iter()
        .map(|subject| Ok(column_statistics(table, table.subject_index(subject)?)))
        .collect()
}

/// Statistics for every subject of the table, in table order.
pub fn all_subject_statistics(table: &Table) -> Vec<SubjectStats> {
    (0..table.subjects().len())
        .map(|idx| column_statistics(table, idx))
        .collect()
}

fn column_statistics(table: &Table, idx: usize) -> SubjectStats {
    let marks: Vec<f64> = table.records().iter().map(|r| r.scores[idx]).collect();
    SubjectStats {
        subject: table.subjects()[idx].clone(),
        average: stats::mean(&marks),
        maximum: stats::max(&marks),
        minimum: stats::min(&marks),
        std_dev: stats::sample_std_dev(&marks),
        iqr: stats::iqr(&marks),
    }
}

/// The top `n` students by `by`, highest first.
///
/// `n` must lie in `[1, table.len()]`; it is never clamped.
pub fn rank_students(table: &Table, n: usize, by: RankField) -> EngineResult<Vec<StudentRecord>> {
    if n < 1 {
        return Err(EngineError::invalid("n must be at least 1"));
    }
    if n > table.len() {
        return Err(EngineError::invalid(format!(
            "n = {} exceeds the {} records in the table",
            n,
            table.len()
        )));
    }

    let mut ranked: Vec<StudentRecord> = table.records().to_vec();
    // sort_by is stable, so equal values keep table order
    ranked.sort_by(|a, b| descending(a.field(by), b.field(by)));
    ranked.truncate(n);

    Ok(ranked)
}

/// [`rank_students`] with the field given by name, e.g. `"average_marks"`.
pub fn rank_students_by_name(table: &Table, n: usize, by: &str) -> EngineResult<Vec<StudentRecord>> {
    rank_students(table, n, by.parse()?)
}

/// Count and share of records in each performance bucket, in display order.
pub fn bucket_distribution(table: &Table) -> Vec<BucketShare> {
    let total = table.len();

    Bucket::ALL
        .iter()
        .map(|&bucket| {
            let count = table
                .records()
                .iter()
                .filter(|r| r.bucket() == bucket)
                .count();
            let percentage = if total == 0 {
                None
            } else {
                Some(count as f64 / total as f64 * 100.0)
            };
            BucketShare {
                bucket,
                count,
                percentage,
            }
        })
        .collect()
}

/// Records whose name contains `pattern`, ignoring case.
///
/// An empty pattern matches nothing.
pub fn search(table: &Table, pattern: &str) -> Vec<StudentRecord> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let needle = pattern.to_lowercase();

    table
        .records()
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Student-by-subject matrix of marks, rows in table order.
pub fn cross_tabulate(table: &Table, subjects: &[String]) -> EngineResult<CrossTab> {
    let indices = subjects
        .iter()
        .map(|s| table.subject_index(s))
        .collect::<EngineResult<Vec<_>>>()?;

    let rows = table
        .records()
        .iter()
        .map(|r| CrossTabRow {
            student_id: r.student_id.clone(),
            name: r.name.clone(),
            marks: indices.iter().map(|&i| r.scores[i]).collect(),
        })
        .collect();

    Ok(CrossTab {
        subjects: subjects.to_vec(),
        rows,
    })
}

/// Best and worst subjects by mean, top and bottom students by average.
pub fn extremes(table: &Table) -> Extremes {
    // Subjects come from the table itself, so lookups cannot fail.
    let means: Vec<SubjectMean> = table
        .subjects()
        .iter()
        .filter_map(|subject| {
            let marks = table.column(subject).ok()?;
            stats::mean(&marks).map(|average| SubjectMean {
                subject: subject.clone(),
                average,
            })
        })
        .collect();

    let students: Vec<StudentMean> = table
        .records()
        .iter()
        .map(|r| StudentMean {
            student_id: r.student_id.clone(),
            name: r.name.clone(),
            average_marks: r.average_marks(),
        })
        .collect();

    Extremes {
        best_subject: first_by(&means, |m| m.average, Ordering::Greater),
        worst_subject: first_by(&means, |m| m.average, Ordering::Less),
        top_student: first_by(&students, |s| s.average_marks, Ordering::Greater),
        bottom_student: first_by(&students, |s| s.average_marks, Ordering::Less),
    }
}

/// First item whose key compares `wanted` against every earlier winner.
fn first_by<T: Clone>(items: &[T], key: impl Fn(&T) -> f64, wanted: Ordering) -> Option<T> {
    let mut best: Option<&T> = None;
    for item in items {
        match best {
            None => best = Some(item),
            Some(current) => {
                if key(item).partial_cmp(&key(current)) == Some(wanted) {
                    best = Some(item);
                }
            }
        }
    }
    best.cloned()
}

/// Ordering for the data explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Ascending by identifier
    #[default]
    StudentId,
    /// Ascending by name
    Name,
    /// Descending by average mark
    AverageMarks,
    /// Descending by total mark
    TotalMarks,
}

/// All records reordered by `key`. Equal keys keep table order.
pub fn sort_records(table: &Table, key: SortKey) -> Vec<StudentRecord> {
    let mut sorted = table.records().to_vec();
    match key {
        SortKey::StudentId => sorted.sort_by(|a, b| a.student_id.cmp(&b.student_id)),
        SortKey::Name => sorted.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::AverageMarks => {
            sorted.sort_by(|a, b| descending(a.average_marks(), b.average_marks()))
        }
        SortKey::TotalMarks => sorted.sort_by(|a, b| descending(a.total_marks(), b.total_marks())),
    }
    sorted
}

/// Class-wide metrics over every individual mark.
pub fn class_summary(table: &Table) -> ClassSummary {
    let all_marks: Vec<f64> = table
        .records()
        .iter()
        .flat_map(|r| r.scores.iter().copied())
        .collect();
    let averages: Vec<f64> = table.records().iter().map(|r| r.average_marks()).collect();

    let highest_mark = stats::max(&all_marks);
    let lowest_mark = stats::min(&all_marks);

    ClassSummary {
        students: table.len(),
        subjects: table.subjects().len(),
        class_average: stats::mean(&all_marks),
        highest_mark,
        lowest_mark,
        score_range: highest_mark.zip(lowest_mark).map(|(hi, lo)| hi - lo),
        mean_student_average: stats::mean(&averages),
    }
}

/// Subjects ordered by IQR, most consistent first.
///
/// Subjects without an IQR (empty table) are left out.
pub fn subject_variability(statistics: &[SubjectStats]) -> Vec<SubjectVariability> {
    let spreads: Vec<(String, f64)> = statistics
        .iter()
        .filter_map(|s| s.iqr.map(|iqr| (s.subject.clone(), iqr)))
        .collect();

    let values: Vec<f64> = spreads.iter().map(|(_, iqr)| *iqr).collect();
    let Some(mean_iqr) = stats::mean(&values) else {
        return Vec::new();
    };

    let mut ranked: Vec<SubjectVariability> = spreads
        .into_iter()
        .map(|(subject, iqr)| SubjectVariability {
            subject,
            iqr,
            above_mean: iqr > mean_iqr,
        })
        .collect();
    ranked.sort_by(|a, b| a.iqr.partial_cmp(&b.iqr).unwrap_or(Ordering::Equal));

    ranked
}

/// Marks outside `[0, 100]`. These are reported, never rejected.
pub fn anomalies(table: &Table) -> Vec<Anomaly> {
    let mut found = Vec::new();

    for record in table.records() {
        for (subject, &mark) in table.subjects().iter().zip(&record.scores) {
            if !(MIN_MARK..=MAX_MARK).contains(&mark) {
                found.push(Anomaly {
                    student_id: record.student_id.clone(),
                    name: record.name.clone(),
                    subject: subject.clone(),
                    mark,
                });
            }
        }
    }

    found
}

/// Marks of the top `n` students by average, for the subject comparison chart.
///
/// `n` must lie within [`COMPARE_RANGE`] and not exceed the table size.
pub fn top_student_comparison(table: &Table, n: usize) -> EngineResult<CrossTab> {
    let (lo, hi) = COMPARE_RANGE;
    if !(lo..=hi).contains(&n) {
        return Err(EngineError::invalid(format!(
            "comparison size must be between {} and {}, got {}",
            lo, hi, n
        )));
    }

    let top = rank_students(table, n, RankField::AverageMarks)?;
    cross_tabulate(&table.with_records(top), table.subjects())
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn subjects() -> Vec<String> {
        ["Math", "Physics", "Chemistry", "English", "History"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn create_test_record(id: &str, name: &str, scores: [f64; 5]) -> StudentRecord {
        StudentRecord::new(id, name, scores.to_vec())
    }

    fn create_test_table() -> Table {
        Table::new(
            subjects(),
            vec![
                create_test_record("S001", "Asha", [90.0, 85.0, 95.0, 80.0, 88.0]),
                create_test_record("S002", "Ben", [72.0, 68.0, 75.0, 80.0, 70.0]),
                create_test_record("S003", "Chitra", [60.0, 55.0, 62.0, 70.0, 58.0]),
                create_test_record("S004", "Dmitri", [85.0, 90.0, 78.0, 65.0, 82.0]),
                create_test_record("S005", "Ashok", [78.0, 74.0, 80.0, 85.0, 76.0]),
            ],
        )
        .unwrap()
    }

    fn single_record_table(scores: [f64; 5]) -> Table {
        Table::new(subjects(), vec![create_test_record("S1", "Solo", scores)]).unwrap()
    }

    #[test]
    fn test_derive_asha() {
        let derived = derive(&create_test_table());
        let asha = &derived.records()[0];
        let marks = asha.derived.expect("derived marks");

        assert_eq!(marks.total_marks, 438.0);
        assert!((marks.average_marks - 87.6).abs() < EPS);
        assert_eq!(asha.bucket(), Bucket::Excellent);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let table = create_test_table();
        let once = derive(&table);
        let twice = derive(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_derive_matches_scores() {
        let derived = derive(&create_test_table());
        for record in derived.records() {
            let marks = record.derived.unwrap();
            let sum: f64 = record.scores.iter().sum();
            assert!((marks.total_marks - sum).abs() < EPS);
            assert!((marks.average_marks - sum / 5.0).abs() < EPS);
        }
    }

    #[test]
    fn test_subject_statistics_order_and_mean() {
        let table = create_test_table();
        let requested = vec!["History".to_string(), "Math".to_string()];
        let stats = subject_statistics(&table, &requested).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].subject, "History");
        assert_eq!(stats[1].subject, "Math");

        let math_mean = (90.0 + 72.0 + 60.0 + 85.0 + 78.0) / 5.0;
        assert!((stats[1].average.unwrap() - math_mean).abs() < EPS);
        assert_eq!(stats[1].maximum, Some(90.0));
        assert_eq!(stats[1].minimum, Some(60.0));
        // Sorted math: 60,72,78,85,90 -> Q1 72, Q3 85
        assert!((stats[1].iqr.unwrap() - 13.0).abs() < EPS);
        assert!(stats[1].std_dev.unwrap() > 0.0);
    }

    #[test]
    fn test_all_subject_statistics_matches_requested() {
        let table = create_test_table();
        let all = all_subject_statistics(&table);
        assert_eq!(all, subject_statistics(&table, &subjects()).unwrap());
        assert_eq!(all[2].subject, "Chemistry");
        assert_eq!(all_subject_statistics(&Table::empty(subjects()).unwrap())[0].average, None);
    }

    #[test]
    fn test_subject_statistics_unknown_subject() {
        let table = create_test_table();
        let result = subject_statistics(&table, &["Art".to_string()]);
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_subject_statistics_empty_table() {
        let table = Table::empty(subjects()).unwrap();
        let stats = subject_statistics(&table, &subjects()).unwrap();

        assert_eq!(stats.len(), 5);
        for s in &stats {
            assert_eq!(s.average, None);
            assert_eq!(s.maximum, None);
            assert_eq!(s.minimum, None);
            assert_eq!(s.std_dev, None);
            assert_eq!(s.iqr, None);
        }
    }

    #[test]
    fn test_single_record_std_dev_not_applicable() {
        let table = single_record_table([70.0; 5]);
        let stats = subject_statistics(&table, &subjects()).unwrap();
        assert_eq!(stats[0].std_dev, None);
        assert_eq!(stats[0].iqr, Some(0.0));
    }

    #[test]
    fn test_rank_students_by_average() {
        let table = derive(&create_test_table());
        let top = rank_students(&table, 3, RankField::AverageMarks).unwrap();

        let names: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Dmitri", "Ashok"]);
        assert!(top
            .windows(2)
            .all(|w| w[0].average_marks() >= w[1].average_marks()));
    }

    #[test]
    fn test_rank_students_ties_keep_table_order() {
        let table = Table::new(
            subjects(),
            vec![
                create_test_record("S1", "First", [80.0; 5]),
                create_test_record("S2", "Higher", [90.0; 5]),
                create_test_record("S3", "Second", [80.0; 5]),
                create_test_record("S4", "Third", [80.0; 5]),
            ],
        )
        .unwrap();

        let ranked = rank_students(&table, 4, RankField::TotalMarks).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S2", "S1", "S3", "S4"]);
    }

    #[test]
    fn test_rank_students_rejects_out_of_range_n() {
        let table = create_test_table();
        assert!(matches!(
            rank_students(&table, 0, RankField::AverageMarks),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            rank_students(&table, 6, RankField::AverageMarks),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(
            rank_students(&table, 5, RankField::AverageMarks)
                .unwrap()
                .len(),
            5
        );
    }

    #[test]
    fn test_rank_students_by_unknown_field_name() {
        let table = create_test_table();
        assert!(matches!(
            rank_students_by_name(&table, 2, "shoe_size"),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(
            rank_students_by_name(&table, 1, "total_marks").unwrap()[0].name,
            "Asha"
        );
    }

    #[test]
    fn test_bucket_distribution_partitions() {
        let table = create_test_table();
        let dist = bucket_distribution(&table);

        let buckets: Vec<Bucket> = dist.iter().map(|b| b.bucket).collect();
        assert_eq!(buckets, Bucket::ALL.to_vec());

        let total: usize = dist.iter().map(|b| b.count).sum();
        assert_eq!(total, table.len());

        let pct: f64 = dist.iter().map(|b| b.percentage.unwrap()).sum();
        assert!((pct - 100.0).abs() < 1e-6);

        // Asha 87.6, Dmitri 80, Ashok 78.6, Ben 73, Chitra 61
        let counts: Vec<usize> = dist.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 1, 1]);
    }

    #[test]
    fn test_bucket_distribution_single_average_record() {
        let dist = bucket_distribution(&single_record_table([70.0; 5]));
        for share in &dist {
            if share.bucket == Bucket::Average {
                assert_eq!(share.count, 1);
                assert_eq!(share.percentage, Some(100.0));
            } else {
                assert_eq!(share.count, 0);
                assert_eq!(share.percentage, Some(0.0));
            }
        }
    }

    #[test]
    fn test_bucket_distribution_empty_table() {
        let dist = bucket_distribution(&Table::empty(subjects()).unwrap());
        assert_eq!(dist.len(), 4);
        assert!(dist.iter().all(|b| b.count == 0 && b.percentage.is_none()));
    }

    #[test]
    fn test_search() {
        let table = create_test_table();

        assert!(search(&table, "").is_empty());

        let found = search(&table, "ASH");
        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Ashok"]);

        assert_eq!(search(&table, "itr").len(), 2);
        assert!(search(&table, "zed").is_empty());
    }

    #[test]
    fn test_search_whitespace_pattern() {
        let table = Table::new(
            subjects(),
            vec![
                create_test_record("S1", "Mary Jane", [80.0; 5]),
                create_test_record("S2", "Ravi", [70.0; 5]),
            ],
        )
        .unwrap();

        let found = search(&table, " ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Mary Jane");
        assert!(search(&table, "  ").is_empty());
    }

    #[test]
    fn test_cross_tabulate() {
        let table = create_test_table();
        let requested = vec!["English".to_string(), "Math".to_string()];
        let tab = cross_tabulate(&table, &requested).unwrap();

        assert_eq!(tab.subjects, requested);
        assert_eq!(tab.rows.len(), 5);
        assert_eq!(tab.rows[0].name, "Asha");
        assert_eq!(tab.rows[0].marks, vec![80.0, 90.0]);
        assert_eq!(tab.rows[4].student_id, "S005");

        assert!(cross_tabulate(&table, &["Art".to_string()]).is_err());
    }

    #[test]
    fn test_extremes() {
        let ext = extremes(&create_test_table());

        assert_eq!(ext.top_student.unwrap().name, "Asha");
        assert_eq!(ext.bottom_student.unwrap().name, "Chitra");
        // Means: Math 77, Physics 74.4, Chemistry 78, English 76, History 74.8
        assert_eq!(ext.best_subject.unwrap().subject, "Chemistry");
        assert_eq!(ext.worst_subject.unwrap().subject, "Physics");
    }

    #[test]
    fn test_extremes_ties_first_wins() {
        let table = Table::new(
            subjects(),
            vec![
                create_test_record("S1", "Ana", [80.0; 5]),
                create_test_record("S2", "Bo", [80.0; 5]),
            ],
        )
        .unwrap();
        let ext = extremes(&table);

        assert_eq!(ext.top_student.unwrap().student_id, "S1");
        assert_eq!(ext.bottom_student.unwrap().student_id, "S1");
        assert_eq!(ext.best_subject.unwrap().subject, "Math");
        assert_eq!(ext.worst_subject.unwrap().subject, "Math");
    }

    #[test]
    fn test_extremes_empty_table() {
        let ext = extremes(&Table::empty(subjects()).unwrap());
        assert_eq!(ext, Extremes::default());
    }

    #[test]
    fn test_sort_records() {
        let table = create_test_table();

        let by_name: Vec<String> = sort_records(&table, SortKey::Name)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(by_name, vec!["Asha", "Ashok", "Ben", "Chitra", "Dmitri"]);

        let by_total = sort_records(&table, SortKey::TotalMarks);
        assert_eq!(by_total[0].name, "Asha");
        assert_eq!(by_total[4].name, "Chitra");

        let by_id = sort_records(&table, SortKey::StudentId);
        assert_eq!(by_id[0].student_id, "S001");
    }

    #[test]
    fn test_class_summary() {
        let summary = class_summary(&create_test_table());

        assert_eq!(summary.students, 5);
        assert_eq!(summary.subjects, 5);
        assert_eq!(summary.highest_mark, Some(95.0));
        assert_eq!(summary.lowest_mark, Some(55.0));
        assert_eq!(summary.score_range, Some(40.0));
        // Mean of all marks equals mean of per-student averages when every row is full
        let diff = summary.class_average.unwrap() - summary.mean_student_average.unwrap();
        assert!(diff.abs() < EPS);

        let empty = class_summary(&Table::empty(subjects()).unwrap());
        assert_eq!(empty.students, 0);
        assert_eq!(empty.class_average, None);
        assert_eq!(empty.score_range, None);
    }

    #[test]
    fn test_subject_variability() {
        let table = create_test_table();
        let stats = subject_statistics(&table, table.subjects()).unwrap();
        let ranked = subject_variability(&stats);

        assert_eq!(ranked.len(), 5);
        assert!(ranked.windows(2).all(|w| w[0].iqr <= w[1].iqr));
        let mean_iqr: f64 = ranked.iter().map(|v| v.iqr).sum::<f64>() / 5.0;
        for v in &ranked {
            assert_eq!(v.above_mean, v.iqr > mean_iqr);
        }

        let empty = Table::empty(subjects()).unwrap();
        let empty_stats = subject_statistics(&empty, &subjects()).unwrap();
        assert!(subject_variability(&empty_stats).is_empty());
    }

    #[test]
    fn test_out_of_range_marks_do_not_crash() {
        let table = Table::new(
            subjects(),
            vec![
                create_test_record("S1", "Over", [120.0, 95.0, 100.0, 101.0, 90.0]),
                create_test_record("S2", "Under", [-5.0, 40.0, 0.0, 30.0, 20.0]),
            ],
        )
        .unwrap();

        let derived = derive(&table);
        assert!((derived.records()[0].average_marks() - 101.2).abs() < EPS);
        assert_eq!(bucket_distribution(&derived)[0].count, 1);
        assert!(subject_statistics(&derived, &subjects()).is_ok());
        assert!(extremes(&derived).top_student.is_some());

        let found = anomalies(&derived);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].subject, "Math");
        assert_eq!(found[0].mark, 120.0);
        assert_eq!(found[2].name, "Under");
    }

    #[test]
    fn test_top_student_comparison() {
        let table = create_test_table();
        let tab = top_student_comparison(&table, 3).unwrap();

        assert_eq!(tab.rows.len(), 3);
        assert_eq!(tab.rows[0].name, "Asha");
        assert_eq!(tab.subjects, subjects());

        assert!(top_student_comparison(&table, 2).is_err());
        assert!(top_student_comparison(&table, 11).is_err());
        // Within the slider range but larger than the table
        assert!(top_student_comparison(&table, 6).is_err());
    }
}
