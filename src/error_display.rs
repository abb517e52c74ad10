//! Short messages for the errors a file run can hit: polars read/write failures, file system
//! errors, and the pipeline's own error type.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::PipelineError;

/// One-line message for a polars error raised while reading or writing a table.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::NoData(_) => "the file has no data".to_string(),
        PE::ComputeError(msg) | PE::SchemaMismatch(msg) | PE::ShapeMismatch(msg) => {
            first_line(msg)
        }
        PE::ColumnNotFound(msg) => format!("column not found: {}", msg),
        PE::IO { error, .. } => user_message_from_io(error.as_ref()),
        PE::Context { error, msg } => format!("{}: {}", msg, user_message_from_polars(error)),
        #[allow(unreachable_patterns)]
        _ => first_line(&err.to_string()),
    }
}

/// One-line message for a file system error.
pub fn user_message_from_io(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "file not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        io::ErrorKind::UnexpectedEof => "unexpected end of file".to_string(),
        _ => err.to_string(),
    }
}

/// Message for a failure outside the pipeline proper (reading input, writing output),
/// prefixed with the file it concerns.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let message = report
        .chain()
        .find_map(|cause| {
            if let Some(err) = cause.downcast_ref::<PipelineError>() {
                Some(err.to_string())
            } else if let Some(err) = cause.downcast_ref::<PolarsError>() {
                Some(user_message_from_polars(err))
            } else {
                cause.downcast_ref::<io::Error>().map(user_message_from_io)
            }
        })
        .unwrap_or_else(|| first_line(&report.to_string()));
    match path {
        Some(p) => format!("{}: {}", p.display(), message),
        None => message,
    }
}

/// First line of a message, without polars' trailing "Try ..." hint.
fn first_line(msg: &str) -> String {
    let first = msg.lines().next().unwrap_or(msg).trim();
    match first.find(". Try ") {
        Some(idx) => first[..idx].to_string(),
        None => first.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_short() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        assert_eq!(user_message_from_io(&err), "file not found");
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(user_message_from_io(&err), "permission denied");
    }

    #[test]
    fn polars_compute_error_keeps_first_line_only() {
        let err = PolarsError::ComputeError(
            "could not parse `x` as dtype i64. Try increasing infer_schema_length\nmore".into(),
        );
        assert_eq!(
            user_message_from_polars(&err),
            "could not parse `x` as dtype i64"
        );
    }

    #[test]
    fn polars_no_data() {
        let err = PolarsError::NoData("empty CSV".into());
        assert_eq!(user_message_from_polars(&err), "the file has no data");
    }

    #[test]
    fn report_prefers_pipeline_error() {
        let report = color_eyre::eyre::Report::new(PipelineError::export("boom"));
        let msg = user_message_from_report(&report, Some(Path::new("a.csv")));
        assert_eq!(msg, "a.csv: Export failed: boom");
    }

    #[test]
    fn report_of_io_error() {
        let report = color_eyre::eyre::Report::new(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "nope",
        ));
        assert_eq!(user_message_from_report(&report, None), "permission denied");
    }
}
