//! Reconcile command handler

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use colored::*;
use log::{debug, info};
use uuid::Uuid;

use super::{OutputFormat, ReconcileArgs, parse_columns};
use crate::config::{ReconcileConfig, ReconcileConfigBuilder, StoreBackend};
use crate::error::ReconcileError;
use crate::reconcile::{
    EXIT_HARD_FAILURE, Reconciler, Response, RunSummary, hard_failure_response,
};
use crate::sheets::google::{TOKEN_ENV_VAR, resolve_token};
use crate::sheets::{GoogleSheetsStore, RetryConfig, SpreadsheetStore, WorkbookStore};
use crate::trigger::{self, TriggerSource};

/// Run the reconcile command and return the process exit code
pub async fn handle_reconcile_command(args: ReconcileArgs, config_path: Option<&Path>) -> i32 {
    if args.no_color {
        colored::control::set_override(false);
    }

    let run_id = Uuid::new_v4();
    let started = Instant::now();
    let output = args.output;

    match execute(args, config_path, run_id).await {
        Ok(summary) => {
            print_summary(&summary, output);
            debug!("Finished in {:.2}s", started.elapsed().as_secs_f64());
            summary.exit_code()
        }
        Err(err) => {
            print_failure(run_id, &err, output);
            EXIT_HARD_FAILURE
        }
    }
}

async fn execute(
    args: ReconcileArgs,
    config_path: Option<&Path>,
    run_id: Uuid,
) -> Result<RunSummary> {
    let config = effective_config(&args, config_path)?;
    let source = trigger_source(&args)?;
    info!("Resolving job parameters from {}", source.describe());
    let params = trigger::resolve(&source)?;

    let store = build_store(&config, &params.destination_id).await?;
    let summary = Reconciler::new(store.as_ref(), &config)
        .with_run_id(run_id)
        .run(&params, args.dry_run)
        .await?;
    Ok(summary)
}

/// Config file, then preset, then per-flag overrides
fn effective_config(args: &ReconcileArgs, config_path: Option<&Path>) -> Result<ReconcileConfig> {
    let mut config = ReconcileConfig::load(config_path)?;
    if args.isolated {
        let isolated = ReconcileConfig::isolated();
        config.unmapped = isolated.unmapped;
        config.on_batch_error = isolated.on_batch_error;
    }

    let mut builder = ReconcileConfigBuilder::from_config(config);
    if let Some(policy) = args.unmapped {
        builder = builder.unmapped(policy);
    }
    if let Some(policy) = args.on_batch_error {
        builder = builder.on_batch_error(policy);
    }
    if let Some(sheet) = &args.reference_sheet {
        builder = builder.reference_sheet(sheet.clone());
    }
    if let Some(raw) = &args.columns {
        let layout =
            parse_columns(raw).ok_or_else(|| anyhow!("--columns needs at least one column name"))?;
        builder = builder.columns(layout);
    }
    if let Some(backend) = args.store {
        builder = builder.store_backend(backend);
    }
    if let Some(dir) = &args.workbook_dir {
        builder = builder.workbook_dir(dir.clone());
    }
    if args.no_retry {
        builder = builder.retry(RetryConfig::disabled());
    }
    Ok(builder.build())
}

fn trigger_source(args: &ReconcileArgs) -> Result<TriggerSource> {
    if let Some(path) = &args.payload {
        return Ok(TriggerSource::Payload(read_payload(path)?));
    }
    if args.has_trigger_flags() {
        return Ok(TriggerSource::Flags {
            staging_id: args.temp_sheet_id.clone(),
            destination_id: args.main_sheet_id.clone(),
            regions: args.region.clone(),
        });
    }
    Ok(TriggerSource::Environment)
}

fn read_payload(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read payload from stdin")?;
        return Ok(body);
    }
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))
}

/// Open the configured store; the Google store is probed before any work
async fn build_store(
    config: &ReconcileConfig,
    destination_id: &str,
) -> Result<Box<dyn SpreadsheetStore>> {
    match config.store.backend {
        StoreBackend::Workbook => {
            let dir = config
                .store
                .workbook_dir
                .as_ref()
                .ok_or_else(|| anyhow!("The workbook store needs --workbook-dir or store.workbook_dir"))?;
            Ok(Box::new(WorkbookStore::new(dir)?))
        }
        StoreBackend::Google => {
            let token = resolve_token(
                std::env::var(TOKEN_ENV_VAR).ok(),
                config.store.token_file.as_deref(),
            )?;
            let mut store = GoogleSheetsStore::new(token, config.store.retry.clone());
            if let Some(url) = &config.store.base_url {
                store = store.with_base_url(url.clone());
            }
            store.probe(destination_id).await?;
            Ok(Box::new(store))
        }
    }
}

fn print_summary(summary: &RunSummary, output: OutputFormat) {
    match output {
        OutputFormat::Json => print_json(&summary.to_response()),
        OutputFormat::Text => {
            for sheet in &summary.sheets {
                let deleted = if sheet.deleted.is_empty() {
                    "none".dimmed().to_string()
                } else {
                    sheet
                        .deleted
                        .iter()
                        .map(|d| format!("{} ({})", d.range, d.region))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!(
                    "{} {} [{}]",
                    "Sheet".bold(),
                    sheet.sheet.cyan(),
                    sheet.regions.join(", ")
                );
                println!("  delete rows: {}", deleted);
                match sheet.appended_at {
                    Some(row) => println!("  appended {} row(s) at row {}", sheet.rows_added, row),
                    None if summary.dry_run => println!("  would append {} row(s)", sheet.rows_added),
                    None => println!("  appended {} row(s)", sheet.rows_added),
                }
            }
            for failure in &summary.failed {
                println!(
                    "{} {} [{}]: {}",
                    "Failed".bright_red().bold(),
                    failure.sheet.cyan(),
                    failure.regions.join(", "),
                    failure.error
                );
            }
            if !summary.skipped_regions.is_empty() {
                println!(
                    "{} {}",
                    "Skipped unmapped:".yellow(),
                    summary.skipped_regions.join(", ")
                );
            }

            let message = summary.message();
            if summary.failed.is_empty() {
                println!("{}", message.bright_green());
            } else {
                println!("{}", message.bright_red());
            }
            println!("{}", format!("run {}", summary.run_id).dimmed());
        }
    }
}

fn print_failure(run_id: Uuid, err: &anyhow::Error, output: OutputFormat) {
    let response = match err.downcast_ref::<ReconcileError>() {
        Some(domain) => hard_failure_response(run_id, domain),
        None => Response::error(run_id, format!("{:#}", err)),
    };
    match output {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text => {
            eprintln!("{} {}", "Error:".bright_red().bold(), response.message);
            eprintln!("{}", format!("run {}", run_id).dimmed());
        }
    }
}

fn print_json(response: &Response) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to format JSON output: {}", e),
    }
}
