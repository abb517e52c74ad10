//! Serialize a processed table for download: CSV through polars, XLSX as a single-sheet
//! workbook written with zip and quick-xml.

use std::io::{Cursor, Write};
use std::path::Path;

use polars::prelude::*;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipWriter};

use crate::error::{PipelineError, Result};
use crate::table::Table;
use crate::ExportFormat;

/// A serialized table ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Output file name: the original name with its last extension replaced by the export
/// format's extension, or with the extension appended when there is none.
pub fn output_file_name(original: &str, format: ExportFormat) -> String {
    let ext = format.extension();
    let path = Path::new(original);
    match (path.file_stem().and_then(|s| s.to_str()), path.extension()) {
        (Some(stem), Some(_)) if !stem.is_empty() => {
            let stem_end = original.len() - path.extension().map_or(0, |e| e.len() + 1);
            format!("{}.{}", &original[..stem_end], ext)
        }
        _ => format!("{}.{}", original, ext),
    }
}

/// Serialize the table in the chosen format. Only the header row and the data rows are
/// written; there is no index column.
pub fn export_table(table: &mut Table, format: ExportFormat) -> Result<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Csv => write_csv(&mut table.df)?,
        ExportFormat::Excel => write_xlsx(&table.df)?,
    };
    let file_name = output_file_name(&table.source_name, format);
    debug!(file = %file_name, bytes = bytes.len(), format = format.as_str(), "exported table");
    Ok(ExportArtifact {
        file_name,
        mime_type: format.mime_type(),
        bytes,
    })
}

fn write_csv(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(df)
        .map_err(|e| PipelineError::export(crate::error_display::user_message_from_polars(&e)))?;
    Ok(buf)
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Style 1 is a date (built-in format 14), style 2 a date-time (built-in format 22).
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Spreadsheet serial of 1970-01-01.
const UNIX_EPOCH_SERIAL: f64 = 25569.0;
const STYLE_DATE: &str = "1";
const STYLE_DATETIME: &str = "2";

#[derive(Debug, Clone, PartialEq)]
enum XlsxCell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Date(f64),
    DateTime(f64),
}

fn write_xlsx(df: &DataFrame) -> Result<Vec<u8>> {
    let sheet = sheet_xml(df)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("xl/workbook.xml", WORKBOOK_XML.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes()),
        ("xl/styles.xml", STYLES_XML.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_slice()),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)
            .map_err(|e| PipelineError::export(format!("{}: {}", name, e)))?;
        zip.write_all(body)?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| PipelineError::export(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn sheet_xml(df: &DataFrame) -> Result<Vec<u8>> {
    let columns: Vec<Vec<XlsxCell>> = df
        .get_columns()
        .iter()
        .map(column_cells)
        .collect::<Result<_>>()?;
    let letters: Vec<String> = (0..df.width()).map(column_letter).collect();

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", MAIN_NS));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    if df.width() > 0 {
        let header: Vec<XlsxCell> = df
            .get_column_names()
            .iter()
            .map(|n| storable_text(n.as_str(), n.as_str()).map(XlsxCell::Text))
            .collect::<Result<_>>()?;
        write_row(&mut writer, 1, &letters, header.iter())?;
        for row in 0..df.height() {
            write_row(&mut writer, row + 2, &letters, columns.iter().map(|c| &c[row]))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

fn write_row<'a>(
    writer: &mut Writer<Vec<u8>>,
    row_number: usize,
    letters: &[String],
    cells: impl Iterator<Item = &'a XlsxCell>,
) -> Result<()> {
    let r = row_number.to_string();
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", r.as_str()));
    writer.write_event(Event::Start(row))?;
    for (letter, cell) in letters.iter().zip(cells) {
        let reference = format!("{}{}", letter, row_number);
        write_cell(writer, &reference, cell)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_cell(writer: &mut Writer<Vec<u8>>, reference: &str, cell: &XlsxCell) -> Result<()> {
    let mut c = BytesStart::new("c");
    c.push_attribute(("r", reference));
    let value = match cell {
        XlsxCell::Empty => return Ok(()),
        XlsxCell::Text(s) => {
            c.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            if s.trim() != s {
                t.push_attribute(("xml:space", "preserve"));
            }
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(s)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
            return Ok(());
        }
        XlsxCell::Bool(b) => {
            c.push_attribute(("t", "b"));
            if *b { "1".to_string() } else { "0".to_string() }
        }
        XlsxCell::Number(n) => n.to_string(),
        XlsxCell::Date(serial) => {
            c.push_attribute(("s", STYLE_DATE));
            serial.to_string()
        }
        XlsxCell::DateTime(serial) => {
            c.push_attribute(("s", STYLE_DATETIME));
            serial.to_string()
        }
    };
    writer.write_event(Event::Start(c))?;
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(&value)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Characters an XML 1.0 document can carry. Tabs and line breaks are the only allowed
/// control characters.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn storable_text(column: &str, s: &str) -> Result<String> {
    if s.chars().all(is_xml_char) {
        Ok(s.to_string())
    } else {
        Err(PipelineError::export(format!(
            "column '{}' contains a character that cannot be stored in a spreadsheet",
            column
        )))
    }
}

fn text_cells(column: &Column, values: &StringChunked) -> Result<Vec<XlsxCell>> {
    values
        .into_iter()
        .map(|v| match v {
            Some(s) => storable_text(column.name(), s).map(XlsxCell::Text),
            None => Ok(XlsxCell::Empty),
        })
        .collect()
}

/// 0 -> A, 25 -> Z, 26 -> AA.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn column_cells(column: &Column) -> Result<Vec<XlsxCell>> {
    let dtype = column.dtype().clone();
    let cells = match &dtype {
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.map_or(XlsxCell::Empty, XlsxCell::Bool))
            .collect(),
        DataType::String => text_cells(column, column.str()?)?,
        DataType::Date => column
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .map(|v| v.map_or(XlsxCell::Empty, |d| XlsxCell::Date(d as f64 + UNIX_EPOCH_SERIAL)))
            .collect(),
        DataType::Datetime(unit, _) => {
            let per_day = match unit {
                TimeUnit::Nanoseconds => 86_400_000_000_000.0,
                TimeUnit::Microseconds => 86_400_000_000.0,
                TimeUnit::Milliseconds => 86_400_000.0,
            };
            column
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| {
                    v.map_or(XlsxCell::Empty, |t| {
                        XlsxCell::DateTime(t as f64 / per_day + UNIX_EPOCH_SERIAL)
                    })
                })
                .collect()
        }
        dt if dt.is_numeric() => column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(f) if f.is_finite() => XlsxCell::Number(f),
                _ => XlsxCell::Empty,
            })
            .collect(),
        other => {
            let as_text = column.cast(&DataType::String).map_err(|_| {
                PipelineError::export(format!(
                    "column '{}' has type {} which cannot be written to a spreadsheet",
                    column.name(),
                    other
                ))
            })?;
            text_cells(column, as_text.str()?)?
        }
    };
    Ok(cells)
}
