//! Error kinds for the per-file pipeline.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::error_display::{user_message_from_io, user_message_from_polars};

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input could not be read as a table.
    #[error("Failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    /// Requested columns that are not in the table (or requested twice).
    #[error("{}", selection_message(.missing, .repeated))]
    Selection {
        missing: Vec<String>,
        repeated: Vec<String>,
    },

    /// The table could not be serialized.
    #[error("Export failed: {0}")]
    Export(String),

    /// The chart could not be rendered.
    #[error("Chart failed: {0}")]
    Chart(String),

    #[error("{}", user_message_from_io(.0))]
    Io(#[from] std::io::Error),

    #[error("{}", user_message_from_polars(.0))]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub fn parse(file: &str, message: impl ToString) -> Self {
        Self::Parse {
            file: file.to_string(),
            message: message.to_string(),
        }
    }

    pub fn export(message: impl ToString) -> Self {
        Self::Export(message.to_string())
    }

    pub fn chart(message: impl ToString) -> Self {
        Self::Chart(message.to_string())
    }

    /// Short name of the error kind, used in the per-file report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "ParseError",
            Self::Selection { .. } => "SelectionError",
            Self::Export(_) => "ExportError",
            Self::Chart(_) => "ChartError",
            Self::Io(_) => "IoError",
            Self::Polars(_) => "DataError",
        }
    }
}

fn selection_message(missing: &[String], repeated: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Unknown column(s): {}", missing.join(", ")));
    }
    if !repeated.is_empty() {
        parts.push(format!("Column(s) selected more than once: {}", repeated.join(", ")));
    }
    if parts.is_empty() {
        "Invalid column selection".to_string()
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_message_lists_missing_columns() {
        let err = PipelineError::Selection {
            missing: vec!["x".into(), "y".into()],
            repeated: vec![],
        };
        assert_eq!(err.to_string(), "Unknown column(s): x, y");
        assert_eq!(err.kind(), "SelectionError");
    }

    #[test]
    fn parse_error_names_file() {
        let err = PipelineError::parse("data.csv", "unexpected end of input");
        assert_eq!(
            err.to_string(),
            "Failed to parse data.csv: unexpected end of input"
        );
    }

    #[test]
    fn io_error_uses_friendly_message() {
        let err = PipelineError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(err.to_string(), "file not found");
    }
}
