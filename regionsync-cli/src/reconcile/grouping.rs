//! Region grouping by destination sheet

use std::collections::HashMap;

use log::warn;

use crate::config::{RegionSheetMap, UnmappedPolicy};
use crate::error::ReconcileError;
use crate::sheets::canonicalize;

/// Regions routed to one destination sheet, in encounter order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBatch {
    pub sheet: String,
    pub regions: Vec<String>,
}

impl SheetBatch {
    pub fn contains(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }
}

/// Output of grouping the selected regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    /// One batch per destination sheet, in order of first appearance
    pub batches: Vec<SheetBatch>,
    /// Regions skipped because they have no mapping (lenient mode)
    pub skipped: Vec<String>,
}

/// Group selected regions by destination sheet
///
/// Region names are canonicalized; duplicates collapse into one entry. An
/// unmapped region fails the run under `Strict` and is skipped under
/// `Lenient`.
pub fn group_regions(
    selected: &[String],
    map: &RegionSheetMap,
    policy: UnmappedPolicy,
) -> Result<Grouping, ReconcileError> {
    let mut grouping = Grouping::default();
    let mut batch_index: HashMap<String, usize> = HashMap::new();

    for raw in selected {
        let region = canonicalize(raw);

        let Some(sheet) = map.sheet_for(&region) else {
            match policy {
                UnmappedPolicy::Strict => {
                    return Err(ReconcileError::UnmappedRegion {
                        region: raw.trim().to_string(),
                    });
                }
                UnmappedPolicy::Lenient => {
                    warn!("No sheet mapping found for region '{}', skipping", raw.trim());
                    if !grouping.skipped.contains(&region) {
                        grouping.skipped.push(region);
                    }
                    continue;
                }
            }
        };

        let idx = *batch_index.entry(sheet.to_string()).or_insert_with(|| {
            grouping.batches.push(SheetBatch {
                sheet: sheet.to_string(),
                regions: Vec::new(),
            });
            grouping.batches.len() - 1
        });

        let batch = &mut grouping.batches[idx];
        if !batch.contains(&region) {
            batch.regions.push(region);
        }
    }

    Ok(grouping)
}
