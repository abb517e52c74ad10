//! Shared CLI definitions for tidyfile.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// Input file format. When `--format` is not specified, format is detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text (.csv, .tsv, .txt)
    Csv,
    /// Spreadsheet (.xls, .xlsx, .xlsm, .xlsb, .ods)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Format used for a file name. Anything that is not recognizably delimited text
    /// goes through the spreadsheet reader.
    pub fn detect(file_name: &str) -> Self {
        Self::from_path(Path::new(file_name)).unwrap_or(Self::Excel)
    }
}

/// Output format for the cleaned table.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Excel workbook (.xlsx, single sheet)
    Excel,
}

impl ExportFormat {
    pub const ALL: [Self; 2] = [Self::Csv, Self::Excel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Excel => "Excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Output format for a prepared chart.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum ChartFormat {
    /// Scalable vector graphics rendered with plotters
    #[default]
    Svg,
    /// PNG bitmap rendered with plotters
    Png,
    /// Vega-Lite JSON document
    VegaLite,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::VegaLite => "json",
        }
    }
}

/// Parse a single-byte delimiter such as `,`, `;` or `\t`.
fn parse_delimiter(s: &str) -> Result<u8, String> {
    let value = if s == "\\t" { "\t" } else { s };
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(format!(
            "delimiter must be a single ASCII character, got {:?}",
            s
        )),
    }
}

/// Command-line arguments for tidyfile
#[derive(Clone, Parser, Debug)]
#[command(
    name = "tidyfile",
    version,
    about = "Convert and clean CSV and Excel files",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path(s) to the file(s) to process. Each file is processed independently
    /// (not required with --generate-config)
    #[arg(required_unless_present = "generate_config", num_args = 1.., value_name = "PATH")]
    pub paths: Vec<std::path::PathBuf>,

    /// Remove rows that exactly duplicate an earlier row (first occurrence is kept)
    #[arg(long = "remove-duplicates", action)]
    pub remove_duplicates: bool,

    /// Fill missing values in numeric columns with the column mean
    #[arg(long = "fill-missing", action)]
    pub fill_missing: bool,

    /// Keep only this column. Repeat to keep several; output follows the given order. Default: all columns
    #[arg(long = "column", value_name = "COL")]
    pub columns: Vec<String>,

    /// Prepare a bar chart from the numeric columns
    #[arg(long = "chart", action)]
    pub chart: bool,

    /// Chart output format (svg, png, vega-lite). Overrides config [chart] format
    #[arg(long = "chart-format", value_enum)]
    pub chart_format: Option<ChartFormat>,

    /// Export format (csv, excel). Overrides config [export] format
    #[arg(long = "to", value_enum)]
    pub to: Option<ExportFormat>,

    /// Directory for exported files (default: next to each input file)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<std::path::PathBuf>,

    /// Force input format (csv, excel). By default format is detected from the file extension;
    /// unrecognized extensions are read as spreadsheets
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Delimiter for delimited text input, e.g. ";" or "\t"
    #[arg(long = "delimiter", value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Spreadsheet sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Sales")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub sheet: Option<String>,

    /// Number of rows to use when inferring CSV schema (default: 1000)
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Rows shown in each preview (0 disables previews)
    #[arg(long = "preview-rows", value_name = "N")]
    pub preview_rows: Option<usize>,

    /// Run every step but do not write any file
    #[arg(long = "dry-run", action)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/tidyfile/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

impl Args {
    /// Arguments for the given paths with every flag left at its default.
    pub fn for_paths(paths: Vec<std::path::PathBuf>) -> Self {
        Self {
            paths,
            remove_duplicates: false,
            fill_missing: false,
            columns: Vec::new(),
            chart: false,
            chart_format: None,
            to: None,
            output_dir: None,
            format: None,
            delimiter: None,
            sheet: None,
            infer_schema_length: None,
            preview_rows: None,
            dry_run: false,
            debug: false,
            generate_config: false,
            force: false,
        }
    }
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("report.XLSX")),
            Some(FileFormat::Excel)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("sheet.ods")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        assert_eq!(FileFormat::from_path(Path::new("data.parquet")), None);
    }

    #[test]
    fn test_detect_defaults_to_spreadsheet() {
        assert_eq!(FileFormat::detect("people.csv"), FileFormat::Csv);
        assert_eq!(FileFormat::detect("people.xls"), FileFormat::Excel);
        assert_eq!(FileFormat::detect("people.dat"), FileFormat::Excel);
        assert_eq!(FileFormat::detect("people"), FileFormat::Excel);
    }

    #[test]
    fn test_export_format_metadata() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
        assert_eq!(ExportFormat::Csv.mime_type(), "text/csv");
        assert_eq!(
            ExportFormat::Excel.mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(ExportFormat::default(), ExportFormat::Csv);
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn test_args_parse_pipeline_flags() {
        let args = Args::parse_from([
            "tidyfile",
            "a.csv",
            "b.xlsx",
            "--remove-duplicates",
            "--column",
            "B",
            "--column",
            "A",
            "--to",
            "excel",
            "--chart",
            "--chart-format",
            "vega-lite",
        ]);
        assert_eq!(args.paths.len(), 2);
        assert!(args.remove_duplicates);
        assert!(!args.fill_missing);
        assert_eq!(args.columns, vec!["B".to_string(), "A".to_string()]);
        assert_eq!(args.to, Some(ExportFormat::Excel));
        assert_eq!(args.chart_format, Some(ChartFormat::VegaLite));
    }

    #[test]
    fn test_paths_not_required_with_generate_config() {
        let args = Args::try_parse_from(["tidyfile", "--generate-config"]).unwrap();
        assert!(args.generate_config);
        assert!(Args::try_parse_from(["tidyfile"]).is_err());
    }

    #[test]
    fn test_options_markdown_lists_flags() {
        let md = render_options_markdown();
        assert!(md.contains("--remove-duplicates"));
        assert!(md.contains("--fill-missing"));
        assert!(md.contains("--to"));
    }
}
