//! `reconcile` command

pub mod handler;

pub use handler::handle_reconcile_command;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::config::{BatchErrorPolicy, ColumnLayout, StoreBackend, UnmappedPolicy};

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// JSON body {tempSheetId, mainSheetId, regions} from a file, or '-' for stdin
    #[arg(long, value_name = "FILE", conflicts_with_all = ["temp_sheet_id", "main_sheet_id", "region"])]
    pub payload: Option<PathBuf>,

    /// Staging spreadsheet id
    #[arg(long, value_name = "ID")]
    pub temp_sheet_id: Option<String>,

    /// Destination spreadsheet id
    #[arg(long, value_name = "ID")]
    pub main_sheet_id: Option<String>,

    /// Selected region (repeatable, or comma-separated)
    #[arg(long, value_name = "NAME")]
    pub region: Vec<String>,

    /// Treatment of regions with no destination sheet
    #[arg(long, value_enum)]
    pub unmapped: Option<UnmappedPolicy>,

    /// Whether a failing sheet aborts the run
    #[arg(long, value_enum)]
    pub on_batch_error: Option<BatchErrorPolicy>,

    /// Use the batch-isolated preset (lenient + continue) before other overrides
    #[arg(long)]
    pub isolated: bool,

    /// Name of the reference sheet in the destination spreadsheet
    #[arg(long, value_name = "NAME")]
    pub reference_sheet: Option<String>,

    /// Output columns: 'passthrough' or a comma-separated list of header names
    #[arg(long, value_name = "COLUMNS")]
    pub columns: Option<String>,

    /// Spreadsheet store back-end
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Directory of .xlsx files for the workbook store
    #[arg(long, value_name = "DIR")]
    pub workbook_dir: Option<PathBuf>,

    /// Make every Sheets API call exactly once
    #[arg(long)]
    pub no_retry: bool,

    /// Plan only; no sheet is modified
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Response body as JSON
    Json,
}

impl ReconcileArgs {
    /// Whether any flag-based trigger field was given
    pub fn has_trigger_flags(&self) -> bool {
        self.temp_sheet_id.is_some() || self.main_sheet_id.is_some() || !self.region.is_empty()
    }
}

/// Parse the `--columns` value
pub fn parse_columns(raw: &str) -> Option<ColumnLayout> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("passthrough") {
        return Some(ColumnLayout::Passthrough);
    }
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(ColumnLayout::Fixed(names))
    }
}
