use std::fs;
use tempfile::TempDir;
use tidyfile::config::{AppConfig, ConfigManager};
use tidyfile::{ChartFormat, ExportFormat};

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert!(!config.cleaning.remove_duplicates);
    assert!(!config.cleaning.fill_missing);
    assert_eq!(config.chart.row_limit, 10_000);
    assert_eq!(config.chart.width, 700);
    assert_eq!(config.chart.height, 400);
    assert_eq!(config.chart.chart_format().unwrap(), ChartFormat::Svg);
    assert_eq!(config.export.export_format().unwrap(), ExportFormat::Csv);
    assert!(config.export.output_dir.is_none());
    assert_eq!(config.display.preview_rows, 5);
    assert!(config.file_loading.delimiter.is_none());
    assert!(!config.debug.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    for section in [
        "[file_loading]",
        "[cleaning]",
        "[chart]",
        "[export]",
        "[display]",
        "[debug]",
    ] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_default_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let parsed: AppConfig =
        toml::from_str(&config_manager.generate_default_config()).expect("template parses");
    assert!(parsed.validate().is_ok());
    assert_eq!(parsed.chart.width, AppConfig::default().chart.width);
    assert_eq!(parsed.export.format, "csv");
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[cleaning]"));

    // A second write without force is refused; with force it succeeds.
    let err = config_manager.write_default_config(false).unwrap_err();
    assert!(err.to_string().contains("--force"));
    config_manager
        .write_default_config(true)
        .expect("forced write");
}

#[test]
fn test_load_file_missing_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = config_manager.load_file().expect("load");
    assert_eq!(config.display.preview_rows, 5);
}

#[test]
fn test_partial_user_config_merges_over_defaults() {
    let (temp_dir, config_manager) = setup_test_config_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        r#"
[cleaning]
fill_missing = true

[chart]
format = "vega-lite"

[export]
format = "excel"
output_dir = "/tmp/out"
"#,
    )
    .unwrap();

    let user = config_manager.load_file().expect("load");
    let mut config = AppConfig::default();
    config.merge(user);

    assert!(config.cleaning.fill_missing);
    assert!(!config.cleaning.remove_duplicates);
    assert_eq!(config.chart.chart_format().unwrap(), ChartFormat::VegaLite);
    assert_eq!(config.chart.width, 700);
    assert_eq!(config.export.export_format().unwrap(), ExportFormat::Excel);
    assert_eq!(
        config.export.output_dir.as_deref(),
        Some(std::path::Path::new("/tmp/out"))
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_config_reports_path() {
    let (temp_dir, config_manager) = setup_test_config_dir();
    fs::write(temp_dir.path().join("config.toml"), "[chart\nwidth = ").unwrap();
    let err = config_manager.load_file().unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.export.format = "parquet".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.chart.row_limit = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.version = "9.0".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.file_loading.infer_schema_length = Some(0);
    assert!(config.validate().is_err());
}
