//! Restrict a table to a chosen subset and order of columns.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Keep exactly `requested`, in that order. `None` keeps every column in table order.
///
/// Unknown or repeated names fail with [`PipelineError::Selection`] and leave the table as it was.
pub fn select_columns(table: &mut Table, requested: Option<&[String]>) -> Result<()> {
    let Some(requested) = requested else {
        return Ok(());
    };
    let existing: HashSet<String> = table.column_names().into_iter().collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(requested.len());
    let mut missing = Vec::new();
    let mut repeated = Vec::new();
    for name in requested {
        if !existing.contains(name) {
            missing.push(name.clone());
        } else if !seen.insert(name.as_str()) && !repeated.contains(name) {
            repeated.push(name.clone());
        }
    }
    if !missing.is_empty() || !repeated.is_empty() {
        return Err(PipelineError::Selection { missing, repeated });
    }

    table.df = table.df.select(requested.iter().map(|s| s.as_str()))?;
    debug!(file = %table.source_name, columns = ?requested, "selected columns");
    Ok(())
}
