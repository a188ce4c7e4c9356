//! Marksboard - Student Marks Analysis Dashboard
//!
//! A CLI tool that loads a table of student marks and reports
//! subject statistics, rankings, performance buckets and chart data.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing or malformed data, bad config, etc.)

mod analysis;
mod cli;
mod config;
mod dashboard;
mod error;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat, View};
use config::{Config, DEFAULT_CONFIG_FILE};
use dashboard::Dashboard;
use loader::{LoadConfig, TableLoader};
use report::{ReportOptions, Section};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Marksboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .marksboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the data file, subjects, and report defaults.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report written to stdout stays clean.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load the data, build the requested views and emit the report.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    // Step 1: Load and validate the marks table
    let load_settings = LoadConfig::from(&config.data);
    let source = load_settings.path.display().to_string();
    let table = TableLoader::new(load_settings)
        .load()
        .with_context(|| format!("Cannot load marks data from {}", source))?;

    // Step 2: Derive totals and averages once for the session
    let dashboard = Dashboard::new(table);
    if dashboard.table().is_empty() {
        warn!("{} contains no student records", source);
    }

    // Step 3: Build the requested views
    let options = ReportOptions {
        source,
        sections: view_to_sections(args.view),
        top_n: config.report.top_n,
        compare_n: config.report.compare_n,
        preview_rows: config.report.preview_rows,
        rank_by: config.report.rank_by.clone(),
        sort_key: args.sort_by.into(),
        search: args.search.clone(),
    };
    let report = report::build_report(&dashboard, &options)?;

    for notice in report
        .performance
        .iter()
        .flat_map(|p| &p.notices)
        .chain(report.visualizations.iter().flat_map(|v| &v.notices))
    {
        warn!("{}", notice);
    }

    // Step 4: Render and write
    match config.report.output {
        Some(ref output) => {
            let path = std::path::Path::new(output);
            let written = match config.report.format {
                OutputFormat::Json => report::write_json_report(&report, path),
                OutputFormat::Markdown => report::write_report(&report, path),
            };
            written.with_context(|| format!("Failed to write report to {}", output))?;

            if !args.quiet {
                println!("✅ Report saved to: {}", output);
                println!("   Students: {}", report.metadata.records);
                println!("   Duration: {:.1}ms", start_time.elapsed().as_secs_f64() * 1000.0);
            }
        }
        None => {
            let output = match config.report.format {
                OutputFormat::Json => report::generate_json_report(&report)?,
                OutputFormat::Markdown => report::generate_markdown_report(&report),
            };
            println!("{}", output);
        }
    }

    info!(
        "Finished in {:.1}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Convert the CLI view selection into report sections.
fn view_to_sections(view: View) -> Vec<Section> {
    match view {
        View::All => Section::ALL.to_vec(),
        View::Overview => vec![Section::Overview],
        View::Explorer => vec![Section::Explorer],
        View::Subjects => vec![Section::Subjects],
        View::Performance => vec![Section::Performance],
        View::Visualizations => vec![Section::Visualizations],
        View::Summary => vec![Section::Summary],
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that exists but fails to parse is an error
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
