#![allow(dead_code)]

use polars::prelude::*;
use tidyfile::export::export_table;
use tidyfile::{ExportFormat, Table, Upload};

/// CSV upload from an in-memory body.
pub fn csv_upload(name: &str, body: &str) -> Upload {
    Upload::new(name, body.as_bytes().to_vec())
}

/// XLSX upload built from a DataFrame with the crate's own writer.
pub fn xlsx_upload(name: &str, df: DataFrame) -> Upload {
    let mut table = Table::new(name, df);
    let artifact = export_table(&mut table, ExportFormat::Excel).unwrap();
    Upload::new(name, artifact.bytes)
}

/// Sales-like fixture with a duplicate row, a missing price and a text column.
pub fn sales_csv() -> Upload {
    csv_upload(
        "sales.csv",
        " region ,units,price,note:text\n\
         north,3,2.5,a\n\
         north,3,2.5,a\n\
         south,5,,b\n\
         east,7,4.5,c\n",
    )
}

pub fn read_csv_bytes(bytes: &[u8]) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(std::io::Cursor::new(bytes.to_vec()))
        .finish()
        .unwrap()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}
