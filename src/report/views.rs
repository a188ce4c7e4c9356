//! Report data for each dashboard view.
//!
//! Builders turn a [`Dashboard`] into plain serializable structures. A bad
//! per-view parameter (for example `top_n` larger than the class) becomes a
//! notice on that view; only fatal engine errors abort the report.

use crate::analysis::{self, SortKey};
use crate::dashboard::Dashboard;
use crate::error::EngineResult;
use crate::models::{
    Anomaly, BucketShare, ClassSummary, CrossTab, Extremes, StudentRecord, SubjectMean,
    SubjectStats, SubjectVariability, MAX_MARK,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One section of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Overview,
    Explorer,
    Subjects,
    Performance,
    Visualizations,
    Summary,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Overview,
        Section::Explorer,
        Section::Subjects,
        Section::Performance,
        Section::Visualizations,
        Section::Summary,
    ];
}

/// Parameters for building a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Label of the data source, shown in the metadata.
    pub source: String,
    pub sections: Vec<Section>,
    pub top_n: usize,
    pub compare_n: usize,
    pub preview_rows: usize,
    pub rank_by: String,
    pub sort_key: SortKey,
    pub search: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            source: String::new(),
            sections: Section::ALL.to_vec(),
            top_n: 5,
            compare_n: 5,
            preview_rows: 10,
            rank_by: "average_marks".to_string(),
            sort_key: SortKey::default(),
            search: None,
        }
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub subjects: Vec<String>,
    pub version: String,
}

/// Headline metrics and a preview of the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewView {
    pub class: ClassSummary,
    pub preview: Vec<StudentRecord>,
    /// Rows by columns, counting id, name, subjects, total and average.
    pub shape: (usize, usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub pattern: String,
    pub matches: Vec<StudentRecord>,
}

/// The full table in the requested order, plus an optional search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerView {
    pub sort_key: SortKey,
    pub records: Vec<StudentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectsView {
    pub statistics: Vec<SubjectStats>,
    pub best: Option<SubjectMean>,
    pub worst: Option<SubjectMean>,
    /// Most consistent subject first.
    pub variability: Vec<SubjectVariability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedStudent {
    pub rank: usize,
    pub student_id: String,
    pub name: String,
    pub total_marks: f64,
    pub average_marks: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceView {
    pub rank_by: String,
    pub ranking: Vec<RankedStudent>,
    /// Highest possible total, for progress display.
    pub max_total: f64,
    pub distribution: Vec<BucketShare>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

/// A labelled value in a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationsView {
    pub subject_averages: Vec<ChartPoint>,
    pub subject_maximums: Vec<ChartPoint>,
    pub subject_minimums: Vec<ChartPoint>,
    /// Students by average, highest first.
    pub average_ranking: Vec<ChartPoint>,
    /// Students by total, highest first.
    pub total_ranking: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_comparison: Option<CrossTab>,
    pub heatmap: CrossTab,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryView {
    pub extremes: Extremes,
    pub class: ClassSummary,
    pub distribution: Vec<BucketShare>,
    pub improvement_gap: Option<f64>,
}

/// The complete dashboard report. Unrequested views are left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<Anomaly>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<OverviewView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer: Option<ExplorerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<SubjectsView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualizations: Option<VisualizationsView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryView>,
}

/// Build every requested view.
pub fn build_report(dashboard: &Dashboard, options: &ReportOptions) -> EngineResult<Report> {
    let table = dashboard.table();
    let wants = |section: Section| options.sections.contains(&section);

    let metadata = ReportMetadata {
        source: options.source.clone(),
        generated_at: Utc::now(),
        records: table.len(),
        subjects: table.subjects().to_vec(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(Report {
        metadata,
        anomalies: dashboard.report_anomalies(),
        overview: wants(Section::Overview).then(|| build_overview(dashboard, options)),
        explorer: wants(Section::Explorer).then(|| build_explorer(dashboard, options)),
        subjects: wants(Section::Subjects).then(|| build_subjects(dashboard)),
        performance: if wants(Section::Performance) {
            Some(build_performance(dashboard, options)?)
        } else {
            None
        },
        visualizations: if wants(Section::Visualizations) {
            Some(build_visualizations(dashboard, options)?)
        } else {
            None
        },
        summary: wants(Section::Summary).then(|| build_summary(dashboard)),
    })
}

/// Keep a view-local failure as a notice; pass fatal errors through.
fn scoped<T>(result: EngineResult<T>, notices: &mut Vec<String>) -> EngineResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if !e.is_fatal() => {
            notices.push(e.to_string());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn build_overview(dashboard: &Dashboard, options: &ReportOptions) -> OverviewView {
    let table = dashboard.table();
    let preview = table
        .records()
        .iter()
        .take(options.preview_rows)
        .cloned()
        .collect();

    OverviewView {
        class: analysis::class_summary(table),
        preview,
        shape: (table.len(), table.subjects().len() + 4),
    }
}

fn build_explorer(dashboard: &Dashboard, options: &ReportOptions) -> ExplorerView {
    let table = dashboard.table();
    let search = options.search.as_ref().map(|pattern| SearchResult {
        pattern: pattern.clone(),
        matches: analysis::search(table, pattern),
    });

    ExplorerView {
        sort_key: options.sort_key,
        records: analysis::sort_records(table, options.sort_key),
        search,
    }
}

fn build_subjects(dashboard: &Dashboard) -> SubjectsView {
    let statistics = dashboard.subject_statistics().to_vec();
    let extremes = analysis::extremes(dashboard.table());

    SubjectsView {
        variability: analysis::subject_variability(&statistics),
        statistics,
        best: extremes.best_subject,
        worst: extremes.worst_subject,
    }
}

fn build_performance(dashboard: &Dashboard, options: &ReportOptions) -> EngineResult<PerformanceView> {
    let table = dashboard.table();
    let mut notices = Vec::new();

    let ranked = scoped(
        analysis::rank_students_by_name(table, options.top_n, &options.rank_by),
        &mut notices,
    )?
    .unwrap_or_default();

    let ranking = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| RankedStudent {
            rank: i + 1,
            student_id: r.student_id.clone(),
            name: r.name.clone(),
            total_marks: r.total_marks(),
            average_marks: r.average_marks(),
        })
        .collect();

    Ok(PerformanceView {
        rank_by: options.rank_by.clone(),
        ranking,
        max_total: MAX_MARK * table.subjects().len() as f64,
        distribution: analysis::bucket_distribution(table),
        notices,
    })
}

fn build_visualizations(
    dashboard: &Dashboard,
    options: &ReportOptions,
) -> EngineResult<VisualizationsView> {
    let table = dashboard.table();
    let statistics = dashboard.subject_statistics();
    let mut notices = Vec::new();

    let series = |pick: fn(&SubjectStats) -> Option<f64>| -> Vec<ChartPoint> {
        statistics
            .iter()
            .filter_map(|s| {
                pick(s).map(|value| ChartPoint {
                    label: s.subject.clone(),
                    value,
                })
            })
            .collect()
    };

    let student_series = |key: SortKey, value: fn(&StudentRecord) -> f64| -> Vec<ChartPoint> {
        analysis::sort_records(table, key)
            .iter()
            .map(|r| ChartPoint {
                label: r.name.clone(),
                value: value(r),
            })
            .collect()
    };

    let top_comparison = scoped(
        analysis::top_student_comparison(table, options.compare_n),
        &mut notices,
    )?;

    Ok(VisualizationsView {
        subject_averages: series(|s| s.average),
        subject_maximums: series(|s| s.maximum),
        subject_minimums: series(|s| s.minimum),
        average_ranking: student_series(SortKey::AverageMarks, StudentRecord::average_marks),
        total_ranking: student_series(SortKey::TotalMarks, StudentRecord::total_marks),
        top_comparison,
        heatmap: analysis::cross_tabulate(table, table.subjects())?,
        notices,
    })
}

fn build_summary(dashboard: &Dashboard) -> SummaryView {
    let table = dashboard.table();
    let extremes = analysis::extremes(table);

    SummaryView {
        improvement_gap: extremes.improvement_gap(),
        extremes,
        class: analysis::class_summary(table),
        distribution: analysis::bucket_distribution(table),
    }
}
