//! Per-file transform pipeline:
//! load → normalize → [dedupe] → [impute] → project → numeric view → [chart] → export.
//!
//! Each upload is processed on its own; a failure stops that file only.

use std::path::Path;

use color_eyre::eyre::eyre;
use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use crate::chart_data::{prepare_chart, ChartOutcome, ChartSettings, NumericView};
use crate::cleaning::{impute_numeric_means, remove_duplicates, ImputeSummary};
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{export_table, ExportArtifact};
use crate::loader::{load_table, LoadOptions};
use crate::normalize::normalize_columns;
use crate::projection::select_columns;
use crate::{Args, ExportFormat};

/// One uploaded file: its name (used for format detection and output naming) and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk. The upload is named after the file name, not the full path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Which optional steps run and how.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub load: LoadOptions,
    pub remove_duplicates: bool,
    pub fill_missing: bool,
    /// None keeps every column.
    pub columns: Option<Vec<String>>,
    /// None skips chart preparation.
    pub chart: Option<ChartSettings>,
    pub export_format: ExportFormat,
    /// Rows kept in the before/after previews.
    pub preview_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            remove_duplicates: false,
            fill_missing: false,
            columns: None,
            chart: None,
            export_format: ExportFormat::default(),
            preview_rows: 5,
        }
    }
}

impl PipelineOptions {
    /// Command-line flags layered over the config file.
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> color_eyre::Result<Self> {
        let mut load = LoadOptions {
            format: args.format,
            sheet: args.sheet.clone().or_else(|| config.file_loading.sheet.clone()),
            ..LoadOptions::default()
        };
        if let Some(delimiter) = args.delimiter.or(config.file_loading.delimiter) {
            load.delimiter = delimiter;
        }
        if let Some(n) = args
            .infer_schema_length
            .or(config.file_loading.infer_schema_length)
        {
            if n == 0 {
                return Err(eyre!("--infer-schema-length must be greater than 0"));
            }
            load.infer_schema_length = n;
        }
        if let Some(null_values) = &config.file_loading.null_values {
            load.null_values = null_values.clone();
        }

        let chart = (args.chart).then(|| ChartSettings {
            width: config.chart.width,
            height: config.chart.height,
            row_limit: Some(config.chart.row_limit),
        });
        let export_format = match args.to {
            Some(format) => format,
            None => config.export.export_format()?,
        };

        Ok(Self {
            load,
            remove_duplicates: args.remove_duplicates || config.cleaning.remove_duplicates,
            fill_missing: args.fill_missing || config.cleaning.fill_missing,
            columns: (!args.columns.is_empty()).then(|| args.columns.clone()),
            chart,
            export_format,
            preview_rows: args.preview_rows.unwrap_or(config.display.preview_rows),
        })
    }
}

/// Everything produced for one successfully processed file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_name: String,
    /// First rows of the table as loaded.
    pub original_preview: DataFrame,
    /// First rows of the table as exported.
    pub processed_preview: DataFrame,
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: Option<usize>,
    pub imputation: Option<ImputeSummary>,
    pub numeric_view: NumericView,
    pub chart: Option<ChartOutcome>,
    pub artifact: ExportArtifact,
}

impl FileReport {
    /// Human-readable lines describing what each optional step did.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(n) = self.duplicates_removed {
            out.push(format!("Removed {} duplicate row(s)", n));
        }
        if let Some(summary) = &self.imputation {
            out.push(format!(
                "Filled {} missing value(s) in {} numeric column(s)",
                summary.cells_filled(),
                summary.filled.len()
            ));
            for name in &summary.skipped_all_missing {
                out.push(format!(
                    "Column '{}' has no values; missing cells left as is",
                    name
                ));
            }
        }
        if self.numeric_view.synthesized {
            out.push(format!(
                "No numeric columns; added '{}'",
                crate::chart_data::GENERATED_NUMERIC_COLUMN
            ));
        }
        if let Some(warning) = self.chart.as_ref().and_then(ChartOutcome::warning) {
            out.push(warning.to_string());
        }
        out.push("File processed successfully!".to_string());
        out
    }
}

/// Run every step for one upload.
pub fn process_upload(upload: &Upload, options: &PipelineOptions) -> Result<FileReport> {
    let span = info_span!("file", name = %upload.name);
    let _guard = span.enter();

    let mut table = load_table(&upload.name, &upload.bytes, &options.load)?;
    let original_preview = table.preview(options.preview_rows);
    let rows_before = table.height();

    normalize_columns(&mut table)?;

    let duplicates_removed = if options.remove_duplicates {
        Some(remove_duplicates(&mut table)?)
    } else {
        None
    };
    let imputation = if options.fill_missing {
        Some(impute_numeric_means(&mut table)?)
    } else {
        None
    };

    select_columns(&mut table, options.columns.as_deref())?;

    let numeric_view = NumericView::ensure(&mut table)?;

    let chart = match &options.chart {
        Some(settings) => {
            let outcome = prepare_chart(&table, settings)?;
            if let Some(warning) = outcome.warning() {
                warn!("{}", warning);
            }
            Some(outcome)
        }
        None => None,
    };

    let artifact = export_table(&mut table, options.export_format)?;
    info!(
        rows = table.height(),
        columns = table.width(),
        output = %artifact.file_name,
        "file processed"
    );

    Ok(FileReport {
        file_name: upload.name.clone(),
        original_preview,
        processed_preview: table.preview(options.preview_rows),
        rows_before,
        rows_after: table.height(),
        duplicates_removed,
        imputation,
        numeric_view,
        chart,
        artifact,
    })
}

/// Result for one file of a batch.
#[derive(Debug)]
pub struct FileResult {
    pub file_name: String,
    pub outcome: Result<FileReport>,
}

/// Process uploads in order. Each file is independent: one failing does not stop the rest.
pub fn process_batch(uploads: &[Upload], options: &PipelineOptions) -> Vec<FileResult> {
    uploads
        .iter()
        .map(|upload| {
            let outcome = process_upload(upload, options);
            if let Err(err) = &outcome {
                warn!(file = %upload.name, kind = err.kind(), error = %err, "file failed");
            }
            FileResult {
                file_name: upload.name.clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_data::GENERATED_NUMERIC_COLUMN;
    use crate::PipelineError;
    use std::path::PathBuf;

    fn csv(name: &str, body: &str) -> Upload {
        Upload::new(name, body.as_bytes().to_vec())
    }

    #[test]
    fn defaults_keep_everything_and_export_csv() {
        let upload = csv("in.csv", " A ,B\n1,x\n1,x\n");
        let report = process_upload(&upload, &PipelineOptions::default()).unwrap();
        assert_eq!(report.rows_after, 2);
        assert_eq!(report.artifact.file_name, "in.csv");
        let text = String::from_utf8(report.artifact.bytes.clone()).unwrap();
        assert_eq!(text.lines().next(), Some("A,B"));
        assert!(report.duplicates_removed.is_none());
        assert!(report.chart.is_none());
    }

    #[test]
    fn text_only_table_gets_generated_column() {
        let upload = csv("names.csv", "name\nann\nbob\n");
        let report = process_upload(&upload, &PipelineOptions::default()).unwrap();
        assert!(report.numeric_view.synthesized);
        let text = String::from_utf8(report.artifact.bytes.clone()).unwrap();
        assert_eq!(
            text.lines().next(),
            Some(format!("name,{}", GENERATED_NUMERIC_COLUMN).as_str())
        );
        assert!(report.messages().iter().any(|m| m.contains(GENERATED_NUMERIC_COLUMN)));
    }

    #[test]
    fn bad_selection_fails_the_file() {
        let upload = csv("in.csv", "a,b\n1,2\n");
        let options = PipelineOptions {
            columns: Some(vec!["zzz".into()]),
            ..PipelineOptions::default()
        };
        let err = process_upload(&upload, &options).unwrap_err();
        assert!(matches!(err, PipelineError::Selection { .. }));
    }

    #[test]
    fn options_from_args_override_config() {
        let mut args = Args::for_paths(vec![PathBuf::from("x.csv")]);
        args.columns = vec!["a".into()];
        args.chart = true;
        args.to = Some(ExportFormat::Excel);
        args.preview_rows = Some(2);
        let mut config = AppConfig::default();
        config.cleaning.fill_missing = true;
        config.file_loading.delimiter = Some(b';');
        config.chart.row_limit = 50;

        let options = PipelineOptions::from_args_and_config(&args, &config).unwrap();
        assert!(options.fill_missing);
        assert!(!options.remove_duplicates);
        assert_eq!(options.columns, Some(vec!["a".to_string()]));
        assert_eq!(options.load.delimiter, b';');
        assert_eq!(options.export_format, ExportFormat::Excel);
        assert_eq!(options.preview_rows, 2);
        assert_eq!(options.chart.map(|c| c.row_limit), Some(Some(50)));
    }

    #[test]
    fn no_columns_flag_means_all_columns() {
        let args = Args::for_paths(vec![PathBuf::from("x.csv")]);
        let options = PipelineOptions::from_args_and_config(&args, &AppConfig::default()).unwrap();
        assert!(options.columns.is_none());
        assert!(options.chart.is_none());
        assert_eq!(options.export_format, ExportFormat::Csv);
        assert_eq!(options.preview_rows, 5);
    }
}
