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

pub mod column;
pub mod value;

pub use column::{Column, ColumnBuilder};
pub use value::{format_timestamp, parse_number, ColumnType, TemporalFormats, Value};

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, named, equal-length columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let expected = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if column.name().is_empty() {
                return Err(TableError::EmptyColumnName { index });
            }
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn {
                    column: column.name().to_string(),
                });
            }
            if column.len() != expected {
                return Err(TableError::LengthMismatch {
                    column: column.name().to_string(),
                    expected,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Built-in dataset shown before anything is uploaded.
    pub fn sample() -> Self {
        Self {
            columns: vec![
                Column::texts(
                    "Player",
                    &["Player A", "Player B", "Player C", "Player D", "Player E"],
                ),
                Column::numbers("Runs", &[450.0, 400.0, 380.0, 350.0, 340.0]),
                Column::numbers("Matches", &[10.0, 10.0, 10.0, 10.0, 10.0]),
                Column::numbers("Strike Rate", &[140.0, 135.0, 130.0, 125.0, 120.0]),
            ],
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_dataset_shape() {
        let table = Table::sample();
        assert_eq!(
            table.column_names(),
            vec!["Player", "Runs", "Matches", "Strike Rate"]
        );
        assert_eq!(table.row_count(), 5);
        assert_eq!(
            table.column("Runs").and_then(|c| c.get(0)),
            Some(&Value::Number(450.0))
        );
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::numbers("a", &[1.0, 2.0]),
            Column::numbers("b", &[1.0]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                column: "b".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_and_blank_names() {
        let dup = Table::new(vec![
            Column::numbers("a", &[1.0]),
            Column::numbers("a", &[2.0]),
        ]);
        assert!(matches!(dup, Err(TableError::DuplicateColumn { .. })));

        let blank = Table::new(vec![Column::numbers("", &[1.0])]);
        assert_eq!(blank, Err(TableError::EmptyColumnName { index: 0 }));
    }
}
