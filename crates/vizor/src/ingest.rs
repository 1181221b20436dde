// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{IngestError, IngestResult};
use crate::table::{format_timestamp, ColumnBuilder, Table, TemporalFormats, Value};
use base64::{engine::general_purpose, Engine as _};
use calamine::{Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("csv") {
            Some(SourceFormat::Csv)
        } else if extension.eq_ignore_ascii_case("xlsx") {
            Some(SourceFormat::Xlsx)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "text/csv",
            SourceFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// A file as handed over by the UI layer: a `data:<mime>;base64,<payload>`
/// string plus the original file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub contents: String,
    pub filename: String,
}

impl Upload {
    pub fn new(contents: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            filename: filename.into(),
        }
    }

    /// Wraps raw file bytes the way a browser upload widget delivers them.
    pub fn from_bytes(raw: &[u8], filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime = SourceFormat::from_filename(&filename)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        let payload = general_purpose::STANDARD.encode(raw);
        Self {
            contents: format!("data:{mime};base64,{payload}"),
            filename,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableDecoder {
    formats: TemporalFormats,
}

impl TableDecoder {
    pub fn new(formats: TemporalFormats) -> Self {
        Self { formats }
    }

    pub fn decode_upload(&self, upload: &Upload) -> IngestResult<Table> {
        let (_, payload) = upload
            .contents
            .split_once(',')
            .ok_or_else(|| IngestError::parse("Upload payload is missing its content-type marker"))?;
        let raw = general_purpose::STANDARD.decode(payload.trim())?;
        self.decode(&raw, &upload.filename)
    }

    pub fn decode(&self, raw: &[u8], filename: &str) -> IngestResult<Table> {
        let format =
            SourceFormat::from_filename(filename).ok_or_else(|| IngestError::UnsupportedFormat {
                filename: filename.to_string(),
            })?;
        let table = match format {
            SourceFormat::Csv => self.decode_csv(raw),
            SourceFormat::Xlsx => self.decode_xlsx(raw),
        }
        .inspect_err(|e| warn!(filename, error = %e, "Failed to decode upload"))?;
        debug!(
            filename,
            rows = table.row_count(),
            columns = table.column_count(),
            "Decoded upload"
        );
        Ok(table)
    }

    fn decode_csv(&self, raw: &[u8]) -> IngestResult<Table> {
        let text = std::str::from_utf8(raw).map_err(IngestError::parse)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(IngestError::parse("No columns to parse from file"));
        }
        let width = headers.len();
        let mut builders = self.builders_for(headers);
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Short records are padded with nulls; long ones cannot be placed.
            if record.len() > width {
                return Err(IngestError::parse(format!(
                    "Expected {width} fields in line {}, saw {}",
                    record.position().map_or(index as u64 + 2, |p| p.line()),
                    record.len()
                )));
            }
            for (column, builder) in builders.iter_mut().enumerate() {
                match record.get(column) {
                    Some(field) => builder.push_text(field),
                    None => builder.push(Value::Null),
                }
            }
        }
        self.assemble(builders)
    }

    fn decode_xlsx(&self, raw: &[u8]) -> IngestResult<Table> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(raw))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::parse("Workbook contains no worksheets"))??;
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| IngestError::parse("No columns to parse from file"))?;
        let headers: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();
        let mut builders = self.builders_for(headers);
        for row in rows {
            for (index, builder) in builders.iter_mut().enumerate() {
                builder.push(row.get(index).map(convert_cell).unwrap_or(Value::Null));
            }
        }
        self.assemble(builders)
    }

    fn builders_for(&self, headers: Vec<String>) -> Vec<ColumnBuilder> {
        unique_headers(headers)
            .into_iter()
            .map(ColumnBuilder::new)
            .collect()
    }

    fn assemble(&self, builders: Vec<ColumnBuilder>) -> IngestResult<Table> {
        let columns = builders
            .into_iter()
            .map(|builder| builder.build(&self.formats))
            .collect();
        Ok(Table::new(columns)?)
    }
}

pub fn decode(raw: &[u8], filename: &str) -> IngestResult<Table> {
    TableDecoder::default().decode(raw, filename)
}

pub fn decode_upload(upload: &Upload) -> IngestResult<Table> {
    TableDecoder::default().decode_upload(upload)
}

/// Writes a table as CSV. Decoding the output gives back an equal table as long
/// as every column already holds its settled type: a text column of values
/// such as `"001"` or `"2024-01-01"` reads back as numbers or timestamps.
pub fn encode_csv(table: &Table) -> IngestResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns().iter().map(|c| c.name()))?;
    for row in 0..table.row_count() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| match column.get(row) {
                Some(Value::Timestamp(ts)) => format_timestamp(ts),
                Some(value) => value.to_string(),
                None => String::new(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| IngestError::parse(e.error()))
}

fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) => Value::Number(*v),
        Data::String(v) => Value::Text(v.clone()),
        Data::Bool(v) => Value::Text(v.to_string()),
        Data::DateTime(v) => v
            .as_datetime()
            .map(Value::Timestamp)
            .unwrap_or(Value::Number(v.as_f64())),
        Data::DateTimeIso(v) => Value::Text(v.clone()),
        Data::DurationIso(v) => Value::Text(v.clone()),
    }
}

/// Blank headers become `Unnamed: <index>`; repeats get `.1`, `.2`, ... suffixes.
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            name
        };
        let mut candidate = base.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{base}.{count}");
        }
        seen.insert(candidate.clone(), 0);
        names.push(candidate);
    }
    names
}
