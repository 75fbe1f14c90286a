//! Static Region -> destination sheet lookup

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

use crate::sheets::canonicalize;

/// Deployment map used when the config file carries no `[regions]` table
static DEFAULT_REGION_MAP: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("AHOADA", "Bayelsa"),
        ("ALPHA 1", "Alpha"),
        ("ALPHA 2", "Alpha"),
        ("BAYELSA", "Bayelsa"),
        ("BETA 1", "Beta"),
        ("BETA 2", "Beta"),
        ("CALABAR", "Calabar"),
        ("EKET REGION", "uyo"),
        ("GAMMA 1", "Gamma"),
        ("GAMMA 2", "Gamma"),
        ("IKOT EKPENE", "Calabar"),
        ("OGOJA", "Calabar"),
        ("UYO REGION", "Akwa_Ibom"),
    ]
});

/// Immutable mapping from canonical region name to sheet name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSheetMap {
    entries: HashMap<String, String>,
}

impl Default for RegionSheetMap {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_REGION_MAP.iter().copied())
    }
}

impl RegionSheetMap {
    /// Build a map; region keys are canonicalized, sheet names kept verbatim
    pub fn from_pairs<R, S>(pairs: impl IntoIterator<Item = (R, S)>) -> Self
    where
        R: AsRef<str>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(region, sheet)| (canonicalize(region.as_ref()), sheet.into()))
            .collect();
        Self { entries }
    }

    /// Sheet for a region; `region` must already be canonical
    pub fn sheet_for(&self, region: &str) -> Option<&str> {
        self.entries.get(region).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Regions grouped by sheet, both sorted, for display
    pub fn by_sheet(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (region, sheet) in &self.entries {
            grouped.entry(sheet.as_str()).or_default().push(region.as_str());
        }
        for regions in grouped.values_mut() {
            regions.sort_unstable();
        }
        grouped
    }
}
