use clap::ValueEnum;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chart_data::{DEFAULT_CHART_HEIGHT, DEFAULT_CHART_ROW_LIMIT, DEFAULT_CHART_WIDTH};
use crate::{ChartFormat, ExportFormat};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template, fully commented
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read config.toml from this directory. A missing file yields the defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub cleaning: CleaningConfig,
    pub chart: ChartConfig,
    pub export: ExportConfig,
    pub display: DisplayConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub infer_schema_length: Option<usize>,
    pub sheet: Option<String>,
    pub null_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CleaningConfig {
    pub remove_duplicates: bool,
    pub fill_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub row_limit: usize,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: String,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preview_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            cleaning: CleaningConfig::default(),
            chart: ChartConfig::default(),
            export: ExportConfig::default(),
            display: DisplayConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_CHART_ROW_LIMIT,
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
            format: "svg".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            output_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(user_config) = ConfigManager::new(app_name).and_then(|m| m.load_file()) {
            config.merge(user_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.cleaning.merge(other.cleaning);
        self.chart.merge(other.chart);
        self.export.merge(other.export);
        self.display.merge(other.display);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.chart.row_limit == 0 {
            return Err(eyre!("chart.row_limit must be greater than 0"));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(eyre!("chart.width and chart.height must be greater than 0"));
        }
        if self.file_loading.infer_schema_length == Some(0) {
            return Err(eyre!("file_loading.infer_schema_length must be greater than 0"));
        }

        self.chart.chart_format()?;
        self.export.export_format()?;
        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.sheet.is_some() {
            self.sheet = other.sheet;
        }
        if other.null_values.is_some() {
            self.null_values = other.null_values;
        }
    }
}

impl CleaningConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CleaningConfig::default();
        if other.remove_duplicates != default.remove_duplicates {
            self.remove_duplicates = other.remove_duplicates;
        }
        if other.fill_missing != default.fill_missing {
            self.fill_missing = other.fill_missing;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.row_limit != default.row_limit {
            self.row_limit = other.row_limit;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.format != default.format {
            self.format = other.format;
        }
    }

    pub fn chart_format(&self) -> Result<ChartFormat> {
        ChartFormat::from_str(&self.format, true).map_err(|_| {
            eyre!(
                "Invalid chart.format: {}. Must be 'svg', 'png', or 'vega-lite'",
                self.format
            )
        })
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ExportConfig::default();
        if other.format != default.format {
            self.format = other.format;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
    }

    pub fn export_format(&self) -> Result<ExportFormat> {
        ExportFormat::from_str(&self.format, true).map_err(|_| {
            eyre!(
                "Invalid export.format: {}. Must be 'csv' or 'excel'",
                self.format
            )
        })
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
