//! Reconciliation job orchestration
//!
//! Phases run strictly in order: group the selected regions, read the staged
//! table, read the reference table, then process one destination sheet at a
//! time. Nothing is mutated before both tables have been read.

use log::{debug, error, info, warn};
use uuid::Uuid;

use super::batch::{execute_plan, plan_sheet};
use super::grouping::group_regions;
use super::reference::ReferenceIndex;
use super::staged::StagedRecords;
use super::summary::RunSummary;
use crate::config::{BatchErrorPolicy, ReconcileConfig};
use crate::error::ReconcileError;
use crate::sheets::SpreadsheetStore;
use crate::trigger::JobParams;

/// Runs reconciliation jobs against one store
pub struct Reconciler<'a> {
    store: &'a dyn SpreadsheetStore,
    config: &'a ReconcileConfig,
    run_id: Uuid,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn SpreadsheetStore, config: &'a ReconcileConfig) -> Self {
        Self {
            store,
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Run the job; `dry_run` stops after planning
    pub async fn run(&self, params: &JobParams, dry_run: bool) -> Result<RunSummary, ReconcileError> {
        let tag = self.tag();
        let mut summary = RunSummary::new(self.run_id, dry_run);
        info!(
            "{} Reconciling {} region(s) from '{}' into '{}' via {}",
            tag,
            params.regions.len(),
            params.staging_id,
            params.destination_id,
            self.store.backend_name()
        );

        let grouping = group_regions(&params.regions, &self.config.regions, self.config.unmapped)?;
        summary.skipped_regions = grouping.skipped.clone();
        if grouping.batches.is_empty() {
            info!("{} No mapped regions selected; nothing to do", tag);
            return Ok(summary.finish());
        }
        debug!(
            "{} Batches: {}",
            tag,
            grouping
                .batches
                .iter()
                .map(|b| format!("{} [{}]", b.sheet, b.regions.join(", ")))
                .collect::<Vec<_>>()
                .join("; ")
        );

        let staged = StagedRecords::load(self.store, &params.staging_id).await?;
        info!("{} Read {} staged row(s)", tag, staged.len());
        debug!("{} Staged columns: {}", tag, staged.headers().join(", "));
        let missing = staged.missing_columns(&self.config.columns);
        if !missing.is_empty() {
            warn!(
                "{} Staged table lacks column(s) {}; they will be written blank",
                tag,
                missing.join(", ")
            );
        }

        let reference = ReferenceIndex::load(
            self.store,
            &params.destination_id,
            &self.config.reference_sheet,
        )
        .await?;
        info!(
            "{} Reference sheet '{}' lists {} region(s)",
            tag,
            self.config.reference_sheet,
            reference.len()
        );

        for batch in &grouping.batches {
            let outcome = match plan_sheet(batch, &reference, &staged, &self.config.columns) {
                Ok(plan) if dry_run => Ok(plan.dry_report()),
                Ok(plan) => execute_plan(self.store, &params.destination_id, &plan).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(report) => {
                    info!(
                        "{} Sheet '{}': deleted {} row(s), added {} row(s)",
                        tag, report.sheet, report.rows_deleted, report.rows_added
                    );
                    summary.record_success(report);
                }
                Err(e) => match self.config.on_batch_error {
                    BatchErrorPolicy::Abort => {
                        error!("{} {}", tag, e);
                        return Err(e);
                    }
                    BatchErrorPolicy::Continue => {
                        warn!("{} {}; continuing with remaining sheets", tag, e);
                        summary.record_failure(&batch.sheet, &batch.regions, e);
                    }
                },
            }
        }

        let summary = summary.finish();
        info!(
            "{} {} ({} stale row(s) removed)",
            tag,
            summary.message(),
            summary.total_deleted()
        );
        Ok(summary)
    }

    fn tag(&self) -> String {
        format!("[run {}]", short_id(&self.run_id))
    }
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}
