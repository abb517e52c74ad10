use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::{Path, PathBuf};
use tidyfile::chart_data::ChartOutcome;
use tidyfile::chart_export::{chart_output_path, write_chart};
use tidyfile::error_display::user_message_from_report;
use tidyfile::logging::init_logging;
use tidyfile::{
    process_batch, AppConfig, Args, ChartFormat, ConfigManager, FileReport, PipelineOptions,
    Upload, APP_NAME,
};
use tracing::{info, warn};

/// Where the exported file goes. Never the input file itself: a clash gets a `.tidy` infix.
fn export_path(input: &Path, output_dir: Option<&Path>, file_name: &str) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let target = dir.join(file_name);
    if target == input {
        let name = Path::new(file_name);
        let stem = name.file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
        match name.extension().and_then(|e| e.to_str()) {
            Some(ext) => dir.join(format!("{}.tidy.{}", stem, ext)),
            None => dir.join(format!("{}.tidy", stem)),
        }
    } else {
        target
    }
}

fn print_report(report: &FileReport, preview_rows: usize) {
    println!("== {} ==", report.file_name);
    if preview_rows > 0 {
        println!("Original data (first {} rows):", preview_rows);
        println!("{}", report.original_preview);
        println!("Processed data (first {} rows):", preview_rows);
        println!("{}", report.processed_preview);
    }
    println!("Rows: {} -> {}", report.rows_before, report.rows_after);
    for message in report.messages() {
        println!("{}", message);
    }
}

struct RunSettings {
    options: PipelineOptions,
    chart_format: ChartFormat,
    output_dir: Option<PathBuf>,
    dry_run: bool,
}

/// Write the exported table, and the chart when one was drawn, for one processed file.
fn write_outputs(path: &Path, report: &FileReport, settings: &RunSettings) -> Result<()> {
    let out_path = export_path(
        path,
        settings.output_dir.as_deref(),
        &report.artifact.file_name,
    );
    if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&out_path, &report.artifact.bytes)?;
    println!("Wrote {} ({})", out_path.display(), report.artifact.mime_type);

    // Empty charts were already reported as warnings.
    if let Some(ChartOutcome::Chart(spec)) = &report.chart {
        let dir = out_path.parent().unwrap_or_else(|| Path::new(""));
        let chart_path = chart_output_path(dir, &report.file_name, settings.chart_format);
        write_chart(&chart_path, spec, settings.chart_format)?;
        println!("Wrote chart {}", chart_path.display());
    }
    info!(input = %path.display(), output = %out_path.display(), "done");
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }
    if args.paths.is_empty() {
        return Err(eyre!("No input files given"));
    }

    let config = AppConfig::load(APP_NAME)?;
    init_logging(args.debug || config.debug.enabled);

    let settings = RunSettings {
        options: PipelineOptions::from_args_and_config(&args, &config)?,
        chart_format: match args.chart_format {
            Some(format) => format,
            None => config.chart.chart_format()?,
        },
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| config.export.output_dir.clone()),
        dry_run: args.dry_run,
    };

    let mut failed = 0usize;
    let mut paths = Vec::with_capacity(args.paths.len());
    let mut uploads = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        match Upload::from_path(path) {
            Ok(upload) => {
                paths.push(path.as_path());
                uploads.push(upload);
            }
            Err(err) => {
                failed += 1;
                eprintln!("Error: {}: {}", path.display(), err);
            }
        }
    }

    for (path, result) in paths.into_iter().zip(process_batch(&uploads, &settings.options)) {
        let report = match result.outcome {
            Ok(report) => report,
            Err(err) => {
                failed += 1;
                eprintln!("Error: {}: {}", path.display(), err);
                continue;
            }
        };
        print_report(&report, settings.options.preview_rows);
        if settings.dry_run {
            continue;
        }
        if let Err(err) = write_outputs(path, &report, &settings) {
            failed += 1;
            warn!(file = %path.display(), "writing outputs failed");
            eprintln!("Error: {}", user_message_from_report(&err, Some(path)));
        }
    }

    if failed > 0 {
        eprintln!("{} of {} file(s) failed", failed, args.paths.len());
        std::process::exit(1);
    }
    Ok(())
}
