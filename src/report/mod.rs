//! Report building and rendering.
//!
//! `views` turns a dashboard session into per-view data; `generator`
//! renders that data as Markdown or JSON.

pub mod generator;
pub mod views;

pub use generator::{generate_json_report, generate_markdown_report, write_json_report, write_report};
pub use views::{build_report, ReportOptions, Section};
