//! Parse an uploaded byte stream into a [`Table`].
//!
//! Delimited text goes through the polars CSV reader; everything else goes through
//! calamine, with a per-column type inference pass over the cells.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::io::csv::read::NullValues;
use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::error_display::user_message_from_polars;
use crate::normalize::unique_names;
use crate::table::Table;
use crate::FileFormat;

/// Tokens read as missing values (the set pandas uses by default).
pub const DEFAULT_NULL_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "-NaN", "-nan", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

/// How to read one file. Built by the pipeline from CLI args over config.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Force a reader instead of detecting one from the file extension.
    pub format: Option<FileFormat>,
    pub delimiter: u8,
    pub infer_schema_length: usize,
    /// Try to parse ISO date/datetime strings in CSV input.
    pub parse_dates: bool,
    /// Spreadsheet sheet: 0-based index or sheet name. Default is the first sheet.
    pub sheet: Option<String>,
    pub null_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: b',',
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
            parse_dates: true,
            sheet: None,
            null_values: DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    fn is_null_token(&self, s: &str) -> bool {
        self.null_values.iter().any(|v| v == s)
    }
}

/// Load a table from raw bytes. The reader is picked from `options.format`, or from the
/// extension of `file_name` when no format is forced.
pub fn load_table(file_name: &str, bytes: &[u8], options: &LoadOptions) -> Result<Table> {
    let format = options
        .format
        .unwrap_or_else(|| FileFormat::detect(file_name));
    let df = match format {
        FileFormat::Csv => read_csv(bytes, options)
            .map_err(|e| PipelineError::parse(file_name, user_message_from_polars(&e)))?,
        FileFormat::Excel => read_spreadsheet(file_name, bytes, options)?,
    };
    debug!(
        file = file_name,
        ?format,
        rows = df.height(),
        columns = df.width(),
        "loaded table"
    );
    Ok(Table::new(file_name, df))
}

fn read_csv(bytes: &[u8], options: &LoadOptions) -> PolarsResult<DataFrame> {
    let null_values = if options.null_values.is_empty() {
        None
    } else {
        Some(NullValues::AllColumns(
            options
                .null_values
                .iter()
                .map(|s| PlSmallStr::from(s.as_str()))
                .collect(),
        ))
    };
    let mut read_options = CsvReadOptions::default();
    read_options.has_header = true;
    read_options.infer_schema_length = Some(options.infer_schema_length);
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(options.delimiter)
            .with_try_parse_dates(options.parse_dates)
            .with_null_values(null_values.clone())
    });
    let mut df = CsvReader::new(Cursor::new(bytes.to_vec()))
        .with_options(read_options)
        .finish()?;
    blank_columns_to_float(&mut df)?;
    Ok(df)
}

/// A column with rows but no values carries no type of its own; read it as Float64 so it
/// counts as numeric.
fn blank_columns_to_float(df: &mut DataFrame) -> PolarsResult<()> {
    let blank: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String && c.len() > 0 && c.null_count() == c.len())
        .map(|c| c.name().clone())
        .collect();
    for name in blank {
        let cast = df.column(&name)?.cast(&DataType::Float64)?;
        df.with_column(cast)?;
    }
    Ok(())
}

/// Column type chosen for a spreadsheet column after looking at every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
    Date,
    Datetime,
}

fn read_spreadsheet(file_name: &str, bytes: &[u8], options: &LoadOptions) -> Result<DataFrame> {
    let parse_err = |e: calamine::Error| PipelineError::parse(file_name, e);
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(parse_err)?;
    if workbook.sheet_names().is_empty() {
        return Err(PipelineError::parse(file_name, "workbook has no worksheets"));
    }
    let range = match options.sheet.as_deref() {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| PipelineError::parse(file_name, format!("no sheet at index {}", idx)))?
                .map_err(parse_err)?,
            Err(_) => workbook.worksheet_range(sel).map_err(parse_err)?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PipelineError::parse(file_name, "no first sheet"))?
            .map_err(parse_err)?,
    };

    let rows: Vec<&[Data]> = range.rows().collect();
    let Some((header_row, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };
    let headers = unique_names(
        header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell_to_header(cell) {
                h if h.is_empty() => format!("column_{}", idx + 1),
                h => h,
            })
            .collect(),
    );

    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (col_idx, name) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(col_idx).filter(|c| !is_missing_cell(c, options)))
            .collect();
        let inferred = infer_column_type(&cells);
        let series = column_to_series(name, &cells, inferred)
            .map_err(|e| PipelineError::parse(file_name, user_message_from_polars(&e)))?;
        columns.push(series.into());
    }
    DataFrame::new(columns)
        .map_err(|e| PipelineError::parse(file_name, user_message_from_polars(&e)))
}

fn cell_to_header(cell: &Data) -> String {
    use calamine::DataType as CellType;
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{}", *f as i64),
        _ => CellType::as_string(cell).unwrap_or_else(|| cell.to_string()),
    }
}

fn is_missing_cell(cell: &Data, options: &LoadOptions) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => options.is_null_token(s.trim()),
        _ => false,
    }
}

/// Prefers Int64 for whole-number floats; infers Date/Datetime for spreadsheet dates or for
/// string columns where every value parses as an ISO date/datetime.
fn infer_column_type(cells: &[Option<&Data>]) -> SheetColType {
    use calamine::DataType as CellType;
    if !cells.is_empty() && cells.iter().all(Option::is_none) {
        return SheetColType::Float64;
    }
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if CellType::is_string(*cell) {
            has_string = true;
            break;
        }
        if CellType::is_datetime(*cell) || CellType::is_datetime_iso(*cell) {
            has_datetime = true;
        } else if CellType::is_float(*cell) {
            has_float = true;
        }
        if CellType::is_int(*cell) {
            has_int = true;
        }
        if CellType::is_bool(*cell) {
            has_bool = true;
        }
    }
    let mixed_with_bool = has_bool && (has_int || has_float || has_datetime);
    if has_string || mixed_with_bool {
        let all_parse = cells.iter().flatten().any(|c| cell_to_datetime(c).is_some())
            && cells.iter().flatten().all(|c| cell_to_datetime(c).is_some());
        if all_parse {
            if all_midnight(cells) {
                SheetColType::Date
            } else {
                SheetColType::Datetime
            }
        } else {
            SheetColType::Utf8
        }
    } else if has_datetime {
        if has_int || has_float {
            SheetColType::Utf8
        } else if all_midnight(cells) {
            SheetColType::Date
        } else {
            SheetColType::Datetime
        }
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            cell.as_f64()
                .is_none_or(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            SheetColType::Int64
        } else {
            SheetColType::Float64
        }
    } else if has_int {
        SheetColType::Int64
    } else if has_bool {
        SheetColType::Boolean
    } else {
        SheetColType::Utf8
    }
}

fn all_midnight(cells: &[Option<&Data>]) -> bool {
    let midnight = NaiveTime::MIN;
    cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_datetime(c))
        .all(|dt| dt.time() == midnight)
}

/// Converts a cell to NaiveDateTime (spreadsheet serial date, ISO datetime, or parseable string).
fn cell_to_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType as CellType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime_str(s)
}

/// Parses an ISO-style date/datetime string; tries FORMATS in order.
fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: SheetColType,
) -> PolarsResult<Series> {
    use calamine::DataType as CellType;
    let series = match col_type {
        SheetColType::Int64 => {
            let v: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_i64())).collect();
            Series::new(name.into(), v)
        }
        SheetColType::Float64 => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_f64())).collect();
            Series::new(name.into(), v)
        }
        SheetColType::Boolean => {
            let v: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|cell| cell.get_bool())).collect();
            Series::new(name.into(), v)
        }
        SheetColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| {
                    c.map(|cell| CellType::as_string(cell).unwrap_or_else(|| cell.to_string()))
                })
                .collect();
            Series::new(name.into(), v)
        }
        SheetColType::Date => {
            let epoch = NaiveDate::default();
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| cell_to_datetime(cell))
                        .map(|dt| (dt.date() - epoch).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        SheetColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| cell_to_datetime(cell))
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}
