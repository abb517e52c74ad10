//! Optional cleaning steps: duplicate-row removal and mean imputation of numeric columns.

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::table::Table;

/// Remove rows that exactly duplicate an earlier row, keeping the first occurrence and
/// the original row order. Returns the number of rows removed.
pub fn remove_duplicates(table: &mut Table) -> Result<usize> {
    if table.width() == 0 {
        return Ok(0);
    }
    let before = table.height();
    table.apply_lazy(|lf| lf.unique_stable(None, UniqueKeepStrategy::First))?;
    let removed = before - table.height();
    debug!(file = %table.source_name, removed, "removed duplicate rows");
    Ok(removed)
}

/// One numeric column that had missing values replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFill {
    pub column: String,
    pub mean: f64,
    pub filled: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputeSummary {
    pub filled: Vec<ColumnFill>,
    /// Numeric columns with no values at all; their mean is undefined so they stay missing.
    pub skipped_all_missing: Vec<String>,
}

impl ImputeSummary {
    pub fn cells_filled(&self) -> usize {
        self.filled.iter().map(|f| f.filled).sum()
    }
}

/// Replace missing cells of every numeric column with that column's mean over its
/// non-missing values. Non-numeric columns and columns without missing values are left
/// untouched. Integer columns that receive a fill become Float64.
pub fn impute_numeric_means(table: &mut Table) -> Result<ImputeSummary> {
    let mut summary = ImputeSummary::default();
    let mut exprs: Vec<Expr> = Vec::new();

    for name in table.numeric_columns() {
        let column = table.df.column(&name)?;
        let missing = column.null_count();
        if missing == 0 {
            continue;
        }
        match column.as_materialized_series().mean() {
            Some(mean) if mean.is_finite() => {
                exprs.push(col(name.as_str()).fill_null(lit(mean)));
                summary.filled.push(ColumnFill {
                    column: name,
                    mean,
                    filled: missing,
                });
            }
            _ => {
                warn!(
                    file = %table.source_name,
                    column = %name,
                    "numeric column has no values; leaving it missing"
                );
                summary.skipped_all_missing.push(name);
            }
        }
    }

    if !exprs.is_empty() {
        table.apply_lazy(|lf| lf.with_columns(exprs))?;
    }
    debug!(
        file = %table.source_name,
        columns = summary.filled.len(),
        cells = summary.cells_filled(),
        "filled missing numeric values with column means"
    );
    Ok(summary)
}
