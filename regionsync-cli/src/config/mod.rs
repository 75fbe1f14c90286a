//! Job configuration with builder pattern
//!
//! A single `ReconcileConfig` carries every policy the reconciler consults:
//! how unmapped regions are treated, whether one sheet's failure aborts the
//! run, the output column layout, the Region -> Sheet map and the store
//! back-end. Values come from defaults, then the TOML file, then CLI flags.

pub mod region_map;

pub use region_map::RegionSheetMap;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;

use crate::sheets::RetryConfig;

pub const DEFAULT_REFERENCE_SHEET: &str = "Reference";

/// What to do with a selected region missing from the Region -> Sheet map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Fail the whole run
    Strict,
    /// Log a warning and skip the region
    Lenient,
}

/// What to do when one destination sheet's batch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorPolicy {
    /// Stop the run at the first failing sheet
    Abort,
    /// Record the failure and carry on with the next sheet
    Continue,
}

/// Column order of appended rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnLayout {
    /// Staged columns as uploaded
    #[default]
    Passthrough,
    /// Exactly these columns in this order; missing ones are written blank
    Fixed(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Google Sheets REST API
    Google,
    /// Directory of .xlsx workbooks
    Workbook,
}

/// Store back-end selection and settings
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub workbook_dir: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub base_url: Option<String>,
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Google,
            workbook_dir: None,
            token_file: None,
            base_url: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration for one reconciliation run
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileConfig {
    pub reference_sheet: String,
    pub unmapped: UnmappedPolicy,
    pub on_batch_error: BatchErrorPolicy,
    pub columns: ColumnLayout,
    pub regions: RegionSheetMap,
    pub store: StoreConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl ReconcileConfig {
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::new()
    }

    /// Fail-fast: any unmapped region or failing sheet aborts the run
    pub fn strict() -> Self {
        Self {
            reference_sheet: DEFAULT_REFERENCE_SHEET.to_string(),
            unmapped: UnmappedPolicy::Strict,
            on_batch_error: BatchErrorPolicy::Abort,
            columns: ColumnLayout::Passthrough,
            regions: RegionSheetMap::default(),
            store: StoreConfig::default(),
        }
    }

    /// Batch-isolated: unmapped regions are skipped, failing sheets recorded
    pub fn isolated() -> Self {
        Self {
            unmapped: UnmappedPolicy::Lenient,
            on_batch_error: BatchErrorPolicy::Continue,
            ..Self::strict()
        }
    }

    /// Default config file location (`<config_dir>/regionsync/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("regionsync").join("config.toml"))
    }

    /// Load from an explicit file, or from the default location if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML on top of the strict defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse TOML")?;
        file.apply(Self::default())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    reference_sheet: Option<String>,
    unmapped_regions: Option<UnmappedPolicy>,
    on_batch_error: Option<BatchErrorPolicy>,
    columns: Option<ColumnsSection>,
    regions: BTreeMap<String, String>,
    store: StoreSection,
    retry: RetrySection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnsSection {
    mode: ColumnMode,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ColumnMode {
    Passthrough,
    Fixed,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StoreSection {
    backend: Option<StoreBackend>,
    workbook_dir: Option<PathBuf>,
    token_file: Option<PathBuf>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RetrySection {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    jitter: Option<bool>,
}

impl ConfigFile {
    fn apply(self, mut config: ReconcileConfig) -> Result<ReconcileConfig> {
        if let Some(sheet) = self.reference_sheet {
            config.reference_sheet = sheet;
        }
        if let Some(policy) = self.unmapped_regions {
            config.unmapped = policy;
        }
        if let Some(policy) = self.on_batch_error {
            config.on_batch_error = policy;
        }
        if let Some(columns) = self.columns {
            config.columns = match columns.mode {
                ColumnMode::Passthrough => ColumnLayout::Passthrough,
                ColumnMode::Fixed if columns.names.is_empty() => {
                    bail!("columns.mode = \"fixed\" requires a non-empty columns.names list")
                }
                ColumnMode::Fixed => ColumnLayout::Fixed(columns.names),
            };
        }
        if !self.regions.is_empty() {
            config.regions = RegionSheetMap::from_pairs(self.regions);
        }

        let store = &mut config.store;
        if let Some(backend) = self.store.backend {
            store.backend = backend;
        }
        store.workbook_dir = self.store.workbook_dir.or(store.workbook_dir.take());
        store.token_file = self.store.token_file.or(store.token_file.take());
        store.base_url = self.store.base_url.or(store.base_url.take());

        let retry = &mut store.retry;
        if let Some(attempts) = self.retry.max_attempts {
            retry.max_attempts = attempts;
        }
        if let Some(ms) = self.retry.base_delay_ms {
            retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry.max_delay_ms {
            retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(multiplier) = self.retry.backoff_multiplier {
            retry.backoff_multiplier = multiplier;
        }
        if let Some(jitter) = self.retry.jitter {
            retry.jitter = jitter;
        }

        Ok(config)
    }
}

/// Builder for ReconcileConfig
#[derive(Debug)]
pub struct ReconcileConfigBuilder {
    config: ReconcileConfig,
}

impl ReconcileConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReconcileConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn reference_sheet(mut self, name: impl Into<String>) -> Self {
        self.config.reference_sheet = name.into();
        self
    }

    pub fn unmapped(mut self, policy: UnmappedPolicy) -> Self {
        self.config.unmapped = policy;
        self
    }

    pub fn on_batch_error(mut self, policy: BatchErrorPolicy) -> Self {
        self.config.on_batch_error = policy;
        self
    }

    pub fn columns(mut self, layout: ColumnLayout) -> Self {
        self.config.columns = layout;
        self
    }

    pub fn store_backend(mut self, backend: StoreBackend) -> Self {
        self.config.store.backend = backend;
        self
    }

    pub fn workbook_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store.workbook_dir = Some(dir.into());
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.store.retry = retry;
        self
    }

    pub fn build(self) -> ReconcileConfig {
        self.config
    }
}

impl Default for ReconcileConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_strict() {
        let config = ReconcileConfig::default();
        assert_eq!(config.unmapped, UnmappedPolicy::Strict);
        assert_eq!(config.on_batch_error, BatchErrorPolicy::Abort);
        assert_eq!(config.reference_sheet, "Reference");
        assert_eq!(config.columns, ColumnLayout::Passthrough);
        assert_eq!(config.store.backend, StoreBackend::Google);
    }

    #[test]
    fn test_isolated_preset() {
        let config = ReconcileConfig::isolated();
        assert_eq!(config.unmapped, UnmappedPolicy::Lenient);
        assert_eq!(config.on_batch_error, BatchErrorPolicy::Continue);
    }

    #[test]
    fn test_from_toml() {
        let config = ReconcileConfig::from_toml(
            r#"
            reference_sheet = "Index"
            unmapped_regions = "lenient"
            on_batch_error = "continue"

            [columns]
            mode = "fixed"
            names = ["REGIONS", "NAME"]

            [regions]
            "delta 1" = "Delta"

            [store]
            backend = "workbook"
            workbook_dir = "/tmp/books"

            [retry]
            max_attempts = 5
            base_delay_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.reference_sheet, "Index");
        assert_eq!(config.unmapped, UnmappedPolicy::Lenient);
        assert_eq!(config.on_batch_error, BatchErrorPolicy::Continue);
        assert_eq!(
            config.columns,
            ColumnLayout::Fixed(vec!["REGIONS".into(), "NAME".into()])
        );
        assert_eq!(config.regions.len(), 1);
        assert_eq!(config.regions.sheet_for("DELTA 1"), Some("Delta"));
        assert_eq!(config.store.backend, StoreBackend::Workbook);
        assert_eq!(config.store.workbook_dir, Some(PathBuf::from("/tmp/books")));
        assert_eq!(config.store.retry.max_attempts, 5);
        assert_eq!(config.store.retry.base_delay, Duration::from_millis(100));
        assert!(config.store.retry.jitter);
    }

    #[test]
    fn test_empty_toml_keeps_defaults() {
        assert_eq!(ReconcileConfig::from_toml("").unwrap(), ReconcileConfig::default());
    }

    #[test]
    fn test_fixed_columns_require_names() {
        let err = ReconcileConfig::from_toml("[columns]\nmode = \"fixed\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("columns.names"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(ReconcileConfig::from_toml("on_error = \"abort\"").is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ReconcileConfig::builder()
            .reference_sheet("Index")
            .unmapped(UnmappedPolicy::Lenient)
            .on_batch_error(BatchErrorPolicy::Continue)
            .store_backend(StoreBackend::Workbook)
            .workbook_dir("/data")
            .retry(RetryConfig::disabled())
            .build();

        assert_eq!(config.reference_sheet, "Index");
        assert_eq!(config.unmapped, UnmappedPolicy::Lenient);
        assert_eq!(config.on_batch_error, BatchErrorPolicy::Continue);
        assert_eq!(config.store.workbook_dir, Some(PathBuf::from("/data")));
        assert_eq!(config.store.retry.max_attempts, 1);
    }
}
