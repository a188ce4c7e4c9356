//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] for humans (Markdown with text bars in
//! place of charts) or for other tools (JSON).

use super::views::{
    ChartPoint, ExplorerView, OverviewView, PerformanceView, Report, ReportMetadata,
    SubjectsView, SummaryView, VisualizationsView,
};
use crate::models::{Anomaly, Bucket, BucketShare, CrossTab, StudentRecord, MAX_MARK};
use anyhow::Result;
use std::path::Path;

/// Width of a full text bar, in characters.
const BAR_WIDTH: usize = 25;

/// Placeholder for a statistic that is not applicable.
const NOT_APPLICABLE: &str = "n/a";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# 📊 Student Marks Analysis\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_anomaly_section(&report.anomalies));

    if let Some(ref overview) = report.overview {
        output.push_str(&generate_overview_section(overview, &report.metadata.subjects));
    }
    if let Some(ref explorer) = report.explorer {
        output.push_str(&generate_explorer_section(explorer, &report.metadata.subjects));
    }
    if let Some(ref subjects) = report.subjects {
        output.push_str(&generate_subjects_section(subjects));
    }
    if let Some(ref performance) = report.performance {
        output.push_str(&generate_performance_section(performance));
    }
    if let Some(ref visualizations) = report.visualizations {
        output.push_str(&generate_visualizations_section(visualizations));
    }
    if let Some(ref summary) = report.summary {
        output.push_str(&generate_summary_section(summary));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Students:** {}\n", metadata.records));
    section.push_str(&format!("- **Subjects:** {}\n", metadata.subjects.join(", ")));
    section.push('\n');

    section
}

fn generate_anomaly_section(anomalies: &[Anomaly]) -> String {
    if anomalies.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("> ⚠️ **Marks outside 0-100:**\n");
    for a in anomalies {
        section.push_str(&format!(
            "> - {} ({}), {}: {}\n",
            a.name,
            a.student_id,
            a.subject,
            fmt_mark(a.mark)
        ));
    }
    section.push('\n');

    section
}

/// Generate the overview section.
fn generate_overview_section(overview: &OverviewView, subjects: &[String]) -> String {
    let mut section = String::new();
    let class = &overview.class;

    section.push_str("## 📈 Overview\n\n");
    section.push_str("| Total Students | Total Subjects | Avg Class Score | Highest Score |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        class.students,
        class.subjects,
        fmt_opt(class.class_average, 2),
        class.highest_mark.map(fmt_mark).unwrap_or_else(|| NOT_APPLICABLE.to_string())
    ));

    section.push_str("### Dataset Preview\n\n");
    section.push_str(&generate_record_table(&overview.preview, subjects));

    let (rows, cols) = overview.shape;
    section.push_str(&format!(
        "*Dataset shape: {} rows × {} columns (ID, name, {} subjects, total, average)*\n\n",
        rows,
        cols,
        subjects.len()
    ));

    section
}

/// Generate the data explorer section.
fn generate_explorer_section(explorer: &ExplorerView, subjects: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## 📋 Data Explorer\n\n");
    section.push_str(&format!("*Sorted by: {:?}*\n\n", explorer.sort_key));
    section.push_str(&generate_record_table(&explorer.records, subjects));

    if let Some(ref search) = explorer.search {
        section.push_str(&format!("### Search: \"{}\"\n\n", search.pattern));
        if search.matches.is_empty() {
            section.push_str("No students found matching that name.\n\n");
        } else {
            section.push_str(&format!("Found {} student(s).\n\n", search.matches.len()));
            section.push_str(&generate_record_table(&search.matches, subjects));
        }
    }

    section
}

/// Generate the subject statistics section.
fn generate_subjects_section(view: &SubjectsView) -> String {
    let mut section = String::new();

    section.push_str("## 📊 Subject Statistics\n\n");
    section.push_str("| Subject | Average | Maximum | Minimum | Std Dev | IQR |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
    for s in &view.statistics {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            s.subject,
            fmt_opt(s.average, 2),
            fmt_opt(s.maximum, 0),
            fmt_opt(s.minimum, 0),
            fmt_opt(s.std_dev, 2),
            fmt_opt(s.iqr, 2)
        ));
    }
    section.push('\n');

    if let (Some(best), Some(worst)) = (&view.best, &view.worst) {
        section.push_str(&format!(
            "- **Best performing subject:** {} (avg {:.2})\n",
            best.subject, best.average
        ));
        section.push_str(&format!(
            "- **Lowest performing subject:** {} (avg {:.2})\n\n",
            worst.subject, worst.average
        ));
    }

    if !view.variability.is_empty() {
        section.push_str("### Subject Difficulty (IQR)\n\n");
        section.push_str("*Lower variability means more consistent performance.*\n\n");
        section.push_str("| Subject | IQR | Spread |\n");
        section.push_str("|:---|:---:|:---|\n");

        let max_iqr = view
            .variability
            .iter()
            .map(|v| v.iqr)
            .fold(0.0_f64, f64::max);
        for v in &view.variability {
            let marker = if v.above_mean { "🔴" } else { "🟢" };
            section.push_str(&format!(
                "| {} {} | {:.2} | `{}` |\n",
                marker,
                v.subject,
                v.iqr,
                bar(v.iqr, max_iqr)
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the student performance section.
fn generate_performance_section(view: &PerformanceView) -> String {
    let mut section = String::new();

    section.push_str("## 👥 Student Performance\n\n");
    section.push_str(&generate_notices(&view.notices));

    if !view.ranking.is_empty() {
        section.push_str(&format!("### Top {} Students ({})\n\n", view.ranking.len(), view.rank_by));
        section.push_str("| # | Student | Average | Total | Progress |\n");
        section.push_str("|:---:|:---|:---:|:---:|:---|\n");
        for r in &view.ranking {
            section.push_str(&format!(
                "| {} | {} | {:.1} | {}/{} | `{}` |\n",
                r.rank,
                r.name,
                r.average_marks,
                fmt_mark(r.total_marks),
                fmt_mark(view.max_total),
                bar(r.total_marks, view.max_total)
            ));
        }
        section.push('\n');
    }

    section.push_str("### Performance Distribution\n\n");
    section.push_str(&generate_distribution_table(&view.distribution));

    section
}

/// Generate the visualizations section.
fn generate_visualizations_section(view: &VisualizationsView) -> String {
    let mut section = String::new();

    section.push_str("## 📉 Visualizations\n\n");
    section.push_str(&generate_notices(&view.notices));

    section.push_str(&generate_bar_chart(
        "Average Marks Per Subject",
        &view.subject_averages,
        MAX_MARK,
    ));
    section.push_str(&generate_bar_chart(
        "Maximum Marks Per Subject",
        &view.subject_maximums,
        MAX_MARK,
    ));
    section.push_str(&generate_bar_chart(
        "Minimum Marks Per Subject",
        &view.subject_minimums,
        MAX_MARK,
    ));
    section.push_str(&generate_bar_chart(
        "Student Performance Ranking",
        &view.average_ranking,
        MAX_MARK,
    ));

    let max_total = MAX_MARK * view.heatmap.subjects.len() as f64;
    section.push_str(&generate_bar_chart(
        "Total Marks Comparison",
        &view.total_ranking,
        max_total,
    ));

    if let Some(ref comparison) = view.top_comparison {
        section.push_str(&format!(
            "### Top {} Students: Subject Comparison\n\n",
            comparison.rows.len()
        ));
        section.push_str(&generate_matrix(comparison));
    }

    section.push_str("### Performance Heatmap\n\n");
    section.push_str("*🟥 below 70 · 🟨 70-84 · 🟩 85 and above*\n\n");
    section.push_str(&generate_heatmap(&view.heatmap));

    section
}

/// Generate the summary and insights section.
fn generate_summary_section(view: &SummaryView) -> String {
    let mut section = String::new();
    let ext = &view.extremes;
    let class = &view.class;

    section.push_str("## 🎯 Summary & Insights\n\n");

    section.push_str("| 🏆 Best Subject | 📉 Lowest Subject | 👑 Top Performer | 📚 Room to Improve |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        ext.best_subject
            .as_ref()
            .map(|s| format!("{} ({:.1})", s.subject, s.average))
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        ext.worst_subject
            .as_ref()
            .map(|s| format!("{} ({:.1})", s.subject, s.average))
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        ext.top_student
            .as_ref()
            .map(|s| format!("{} ({:.1})", s.name, s.average_marks))
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        ext.bottom_student
            .as_ref()
            .map(|s| format!("{} ({:.1})", s.name, s.average_marks))
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
    ));

    section.push_str("### Key Findings\n\n");
    section.push_str(&format!("- **Class Average:** {} marks\n", fmt_opt(class.class_average, 2)));
    section.push_str(&format!("- **Highest Score:** {} marks\n", fmt_opt(class.highest_mark, 0)));
    section.push_str(&format!("- **Lowest Score:** {} marks\n", fmt_opt(class.lowest_mark, 0)));
    section.push_str(&format!("- **Score Range:** {} marks\n", fmt_opt(class.score_range, 0)));
    section.push_str(&format!("- **Total Students:** {}\n", class.students));
    section.push_str(&format!(
        "- **Average Class Performance:** {}%\n\n",
        fmt_opt(class.mean_student_average, 2)
    ));

    section.push_str("### Student Distribution\n\n");
    for share in &view.distribution {
        section.push_str(&format!(
            "- {} {}: {} ({})\n",
            share.bucket.emoji(),
            share.bucket.label(),
            share.count,
            fmt_percentage(share.percentage)
        ));
    }
    section.push('\n');

    if let (Some(best), Some(worst)) = (&ext.best_subject, &ext.worst_subject) {
        section.push_str("### Subject Recommendations\n\n");
        section.push_str(&format!(
            "- ✨ **Strength area:** students excel in **{}** (avg {:.2})\n",
            best.subject, best.average
        ));
        section.push_str(&format!(
            "- ⚠️ **Focus area:** **{}** needs improvement (avg {:.2})\n",
            worst.subject, worst.average
        ));
        if let Some(gap) = view.improvement_gap {
            section.push_str(&format!("- 🚀 **Improvement gap:** {:.2} marks\n", gap));
        }
        section.push('\n');
    }

    section
}

/// Render student records with their derived columns.
fn generate_record_table(records: &[StudentRecord], subjects: &[String]) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "| Student ID | Name | {} | Total | Average |\n",
        subjects.join(" | ")
    ));
    table.push_str(&format!("|:---|:---|{}:---:|:---:|\n", ":---:|".repeat(subjects.len())));

    for r in records {
        let marks: Vec<String> = r.scores.iter().map(|&m| fmt_mark(m)).collect();
        table.push_str(&format!(
            "| {} | {} | {} | {} | {:.1} |\n",
            r.student_id,
            r.name,
            marks.join(" | "),
            fmt_mark(r.total_marks()),
            r.average_marks()
        ));
    }
    table.push('\n');

    table
}

fn generate_distribution_table(distribution: &[BucketShare]) -> String {
    let mut table = String::new();

    table.push_str("| Category | Count | Percentage |\n");
    table.push_str("|:---|:---:|:---:|\n");
    for share in distribution {
        table.push_str(&format!(
            "| {} {} | {} | {} |\n",
            share.bucket.emoji(),
            share.bucket.label(),
            share.count,
            fmt_percentage(share.percentage)
        ));
    }
    table.push('\n');

    table
}

fn generate_bar_chart(title: &str, points: &[ChartPoint], scale: f64) -> String {
    let mut chart = String::new();

    chart.push_str(&format!("### {}\n\n", title));
    if points.is_empty() {
        chart.push_str("*No data.*\n\n");
        return chart;
    }

    let width = points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    chart.push_str("```\n");
    for p in points {
        chart.push_str(&format!(
            "{:<width$}  {} {:.1}\n",
            p.label,
            bar(p.value, scale),
            p.value,
            width = width
        ));
    }
    chart.push_str("```\n\n");

    chart
}

fn generate_matrix(tab: &CrossTab) -> String {
    let mut table = String::new();

    table.push_str(&format!("| Student | {} |\n", tab.subjects.join(" | ")));
    table.push_str(&format!("|:---|{}\n", ":---:|".repeat(tab.subjects.len())));
    for row in &tab.rows {
        let marks: Vec<String> = row.marks.iter().map(|&m| fmt_mark(m)).collect();
        table.push_str(&format!("| {} | {} |\n", row.name, marks.join(" | ")));
    }
    table.push('\n');

    table
}

fn generate_heatmap(tab: &CrossTab) -> String {
    let mut table = String::new();

    table.push_str(&format!("| Student | {} |\n", tab.subjects.join(" | ")));
    table.push_str(&format!("|:---|{}\n", ":---:|".repeat(tab.subjects.len())));
    for row in &tab.rows {
        let cells: Vec<String> = row
            .marks
            .iter()
            .map(|&m| format!("{} {}", heat(m), fmt_mark(m)))
            .collect();
        table.push_str(&format!("| {} | {} |\n", row.name, cells.join(" | ")));
    }
    table.push('\n');

    table
}

fn generate_notices(notices: &[String]) -> String {
    let mut out = String::new();
    for notice in notices {
        out.push_str(&format!("> ⚠️ {}\n\n", notice));
    }
    out
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Marksboard*\n");

    footer
}

/// Text bar proportional to `value / scale`, clamped to the bar width.
fn bar(value: f64, scale: f64) -> String {
    if scale <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / scale) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.min(BAR_WIDTH))
}

fn heat(mark: f64) -> &'static str {
    match Bucket::classify(mark) {
        Bucket::Excellent => "🟩",
        Bucket::Good | Bucket::Average if mark >= 70.0 => "🟨",
        _ => "🟥",
    }
}

/// Whole marks print without decimals.
fn fmt_mark(mark: f64) -> String {
    if mark.fract() == 0.0 {
        format!("{:.0}", mark)
    } else {
        format!("{:.1}", mark)
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => NOT_APPLICABLE.to_string(),
    }
}

fn fmt_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => NOT_APPLICABLE.to_string(),
    }
}

/// Write a Markdown report to a file.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, generate_markdown_report(report))?;
    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, generate_json_report(report)?)?;
    Ok(())
}
