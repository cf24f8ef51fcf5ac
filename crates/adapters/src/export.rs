use std::fs;
use std::path::Path;

use querydeck_core::table::{display_cell, TableData};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn export_table(path: &Path, table: &TableData, format: ExportFormat) -> Result<usize, ExportError> {
    match format {
        ExportFormat::Csv => export_table_to_csv(path, table),
        ExportFormat::Json => export_table_to_json(path, table),
    }
}

pub fn export_table_to_csv(path: &Path, table: &TableData) -> Result<usize, ExportError> {
    let mut content = table
        .columns
        .iter()
        .map(|column| csv_escape(column))
        .collect::<Vec<_>>()
        .join(",");
    content.push('\n');

    for row in &table.rows {
        let line = row
            .iter()
            .map(|cell| match cell {
                Value::Null => String::new(),
                other => csv_escape(&display_cell(other)),
            })
            .collect::<Vec<_>>()
            .join(",");
        content.push_str(&line);
        content.push('\n');
    }

    write_file(path, content)?;
    Ok(table.rows.len())
}

pub fn export_table_to_json(path: &Path, table: &TableData) -> Result<usize, ExportError> {
    let records = table
        .rows
        .iter()
        .map(|row| {
            let object = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.clone(), cell.clone()))
                .collect::<Map<_, _>>();
            Value::Object(object)
        })
        .collect::<Vec<_>>();

    let payload = serde_json::to_string_pretty(&records)?;
    write_file(path, payload)?;
    Ok(table.rows.len())
}

fn write_file(path: &Path, content: String) -> Result<(), ExportError> {
    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
