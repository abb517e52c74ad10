//! Numeric view of a table and the bar-chart description built from it.

use polars::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::table::Table;

/// Name of the column appended when a table has no numeric column.
pub const GENERATED_NUMERIC_COLUMN: &str = "Generated_Numeric_Column";
/// 1-based row position used as the x-axis when only one numeric column exists.
pub const INDEX_FIELD: &str = "Index";
/// 0-based row identity carried in the chart data for tooltips.
pub const ROW_ID_FIELD: &str = "index";

pub const DEFAULT_CHART_WIDTH: u32 = 700;
pub const DEFAULT_CHART_HEIGHT: u32 = 400;
/// Default maximum rows used for chart data.
pub const DEFAULT_CHART_ROW_LIMIT: usize = 10_000;

/// The numeric columns of a table, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericView {
    pub columns: Vec<String>,
    /// True when the only column is [`GENERATED_NUMERIC_COLUMN`], appended by [`NumericView::ensure`].
    pub synthesized: bool,
}

impl NumericView {
    /// Numeric columns of the table, without touching it.
    pub fn of(table: &Table) -> Self {
        Self {
            columns: table.numeric_columns(),
            synthesized: false,
        }
    }

    /// Numeric columns of the table. When there are none, a column of consecutive integers
    /// `1..=rows` named [`GENERATED_NUMERIC_COLUMN`] is appended to the table and used instead.
    pub fn ensure(table: &mut Table) -> Result<Self> {
        let view = Self::of(table);
        if !view.is_empty() {
            return Ok(view);
        }
        let rows = table.height() as i64;
        let generated = Series::new(
            GENERATED_NUMERIC_COLUMN.into(),
            (1..=rows).collect::<Vec<i64>>(),
        );
        table.df.with_column(generated)?;
        info!(
            file = %table.source_name,
            column = GENERATED_NUMERIC_COLUMN,
            "no numeric columns; appended generated column"
        );
        Ok(Self {
            columns: vec![GENERATED_NUMERIC_COLUMN.to_string()],
            synthesized: true,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Size and row cap for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    /// None = every row.
    pub row_limit: Option<usize>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
            row_limit: Some(DEFAULT_CHART_ROW_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisBinding {
    pub field: String,
    pub title: String,
}

impl AxisBinding {
    fn new(field: &str, title: &str) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
        }
    }
}

/// One bar: the row it came from and its x/y values (None when missing or not finite).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub row: usize,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// A two-axis bar chart over the numeric view of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: Option<String>,
    pub x: AxisBinding,
    pub y: AxisBinding,
    /// Fields shown on hover, in order.
    pub tooltip: Vec<String>,
    /// Data field holding the 0-based row number. None when x is already the row position.
    pub row_id_field: Option<String>,
    pub width: u32,
    pub height: u32,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Chart(ChartSpec),
    /// No numeric column to plot; shown to the user as a warning.
    NoNumericData,
    /// Numeric columns exist but no row has both coordinates, e.g. a header-only file.
    NoDataPoints,
}

impl ChartOutcome {
    pub const NO_NUMERIC_WARNING: &'static str = "No numeric columns available for chart.";
    pub const NO_POINTS_WARNING: &'static str = "No data points available for chart.";

    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Self::Chart(_) => None,
            Self::NoNumericData => Some(Self::NO_NUMERIC_WARNING),
            Self::NoDataPoints => Some(Self::NO_POINTS_WARNING),
        }
    }
}

/// Build the bar chart for a table. The table is not modified.
///
/// With two or more numeric columns the first is the x-axis and the second the y-axis.
/// With one, the x-axis is the 1-based row position ([`INDEX_FIELD`]).
pub fn prepare_chart(table: &Table, settings: &ChartSettings) -> Result<ChartOutcome> {
    let view = NumericView::of(table);
    let limit = settings.row_limit.unwrap_or(usize::MAX).min(table.height());

    let (x, y, tooltip, row_id_field, xs, ys) = match view.columns.as_slice() {
        [] => {
            debug!(file = %table.source_name, "chart skipped: no numeric data");
            return Ok(ChartOutcome::NoNumericData);
        }
        [only] => {
            let ys = numeric_values(table, only, limit)?;
            let xs: Vec<Option<f64>> = (1..=limit).map(|i| Some(i as f64)).collect();
            let index = free_field(INDEX_FIELD, &[only]);
            (
                AxisBinding::new(&index, "Index"),
                AxisBinding::new(only, "Value"),
                vec![index.clone(), only.clone()],
                None,
                xs,
                ys,
            )
        }
        [first, second, ..] => {
            let row_id = free_field(ROW_ID_FIELD, &[first, second]);
            (
                AxisBinding::new(first, "Category"),
                AxisBinding::new(second, "Value"),
                vec![row_id.clone(), first.clone(), second.clone()],
                Some(row_id),
                numeric_values(table, first, limit)?,
                numeric_values(table, second, limit)?,
            )
        }
    };

    let points: Vec<ChartPoint> = xs
        .into_iter()
        .zip(ys)
        .enumerate()
        .map(|(row, (x, y))| ChartPoint { row, x, y })
        .collect();
    if points.iter().all(|p| p.x.is_none() || p.y.is_none()) {
        debug!(file = %table.source_name, "chart skipped: no data points");
        return Ok(ChartOutcome::NoDataPoints);
    }
    Ok(ChartOutcome::Chart(ChartSpec {
        title: Some(table.source_name.clone()),
        x,
        y,
        tooltip,
        row_id_field,
        width: settings.width,
        height: settings.height,
        points,
    }))
}

/// `base`, or `base_2`, `base_3`, ... when a plotted column already uses the name.
fn free_field(base: &str, taken: &[&String]) -> String {
    let mut candidate = base.to_string();
    let mut n = 2;
    while taken.iter().any(|t| **t == candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    candidate
}

/// First `limit` values of a column as f64; non-finite values become None.
fn numeric_values(table: &Table, name: &str, limit: usize) -> Result<Vec<Option<f64>>> {
    let column = table.df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .take(limit)
        .map(|v| v.filter(|f| f.is_finite()))
        .collect();
    Ok(values)
}

impl ChartSpec {
    /// The x values of every point.
    pub fn x_values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.x).collect()
    }

    /// The y values of every point.
    pub fn y_values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// Points with both coordinates present.
    pub fn drawable_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| Some((p.x?, p.y?)))
            .collect()
    }

    /// Vega-Lite document for the chart, with the data inlined.
    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self
            .points
            .iter()
            .map(|p| {
                let mut row = Map::new();
                if let Some(field) = &self.row_id_field {
                    row.insert(field.clone(), json!(p.row));
                }
                row.insert(self.x.field.clone(), json!(p.x));
                row.insert(self.y.field.clone(), json!(p.y));
                Value::Object(row)
            })
            .collect();
        let tooltip: Vec<Value> = self
            .tooltip
            .iter()
            .map(|f| json!({ "field": f, "type": "quantitative" }))
            .collect();
        let mut doc = json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "width": self.width,
            "height": self.height,
            "mark": "bar",
            "data": { "values": values },
            "encoding": {
                "x": { "field": self.x.field, "title": self.x.title, "type": "quantitative" },
                "y": { "field": self.y.field, "title": self.y.title, "type": "quantitative" },
                "tooltip": tooltip,
            },
        });
        if let (Some(title), Value::Object(map)) = (&self.title, &mut doc) {
            map.insert("title".to_string(), json!(title));
        }
        doc
    }
}

/// Format a numeric axis tick.
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}
