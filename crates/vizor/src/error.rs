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

use llm_contracts::LLMError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VizorError {
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Summary error: {0}")]
    Summary(#[from] SummaryError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Generation service error: {0}")]
    Generation(#[from] LLMError),
}

/// Failures turning an upload into a table. Display strings are shown to the
/// user verbatim.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file type. Please upload a CSV or Excel file.")]
    UnsupportedFormat { filename: String },
    #[error("Error processing file: {reason}")]
    Parse { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate column name: '{column}'")]
    DuplicateColumn { column: String },
    #[error("Column names must not be empty (position {index})")]
    EmptyColumnName { index: usize },
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Cannot describe a dataset without columns")]
    NoColumns,
    #[error("Failed to compute statistics for column '{column}': {source}")]
    Statistics {
        column: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Value of '{column}' is not the name of a column in the dataset")]
    MissingColumn { column: String },
    #[error("Column '{column}' must be numeric, found '{value}'")]
    NonNumericValues { column: String, value: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, VizorError>;
pub type IngestResult<T> = std::result::Result<T, IngestError>;
pub type RenderResult<T> = std::result::Result<T, RenderError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl IngestError {
    pub fn parse(reason: impl std::fmt::Display) -> Self {
        IngestError::Parse {
            reason: reason.to_string(),
        }
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::parse(err)
    }
}

impl From<calamine::XlsxError> for IngestError {
    fn from(err: calamine::XlsxError) -> Self {
        IngestError::parse(err)
    }
}

impl From<base64::DecodeError> for IngestError {
    fn from(err: base64::DecodeError) -> Self {
        IngestError::parse(err)
    }
}

impl From<TableError> for IngestError {
    fn from(err: TableError) -> Self {
        IngestError::parse(err)
    }
}

impl VizorError {
    pub fn category(&self) -> &'static str {
        match self {
            VizorError::Ingest(IngestError::UnsupportedFormat { .. }) => "UnsupportedFormat",
            VizorError::Ingest(IngestError::Parse { .. }) => "ParseError",
            VizorError::Summary(_) | VizorError::Generation(_) => "GenerationServiceError",
            VizorError::Render(_) => "RenderError",
        }
    }

    /// Text for the narrative slot of the UI.
    pub fn user_message(&self) -> String {
        match self {
            VizorError::Ingest(e) => e.to_string(),
            VizorError::Summary(e) => format!("Error processing query: {e}"),
            VizorError::Generation(e) => format!("Error processing query: {e}"),
            VizorError::Render(e) => format!("Error generating visualization: {e}"),
        }
    }

    /// Only narration failures leave the rest of a request usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VizorError::Summary(_) | VizorError::Generation(_))
    }
}
