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

use crate::table::value::{format_timestamp, parse_number, ColumnType, TemporalFormats, Value};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Builds a column whose declared type is settled from the values themselves.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let mut builder = ColumnBuilder::with_capacity(name, values.len());
        for value in values {
            builder.push(value);
        }
        builder.build(&TemporalFormats::new(Vec::new()))
    }

    pub fn numbers(name: impl Into<String>, values: &[f64]) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Number,
            values: values.iter().map(|v| Value::Number(*v)).collect(),
        }
    }

    pub fn texts(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Text,
            values: values.iter().map(|v| Value::Text((*v).to_string())).collect(),
        }
    }

    pub fn timestamps(name: impl Into<String>, values: &[NaiveDateTime]) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Timestamp,
            values: values.iter().map(|v| Value::Timestamp(*v)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// Accumulates raw cells and settles a uniform declared type on `build`:
/// numbers first, then timestamps, otherwise text.
#[derive(Debug)]
pub struct ColumnBuilder {
    name: String,
    values: Vec<Value>,
}

impl ColumnBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: Value) {
        let value = match value {
            Value::Text(s) if s.trim().is_empty() => Value::Null,
            other => other,
        };
        self.values.push(value);
    }

    pub fn push_text(&mut self, raw: &str) {
        self.push(Value::Text(raw.to_string()));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn build(self, formats: &TemporalFormats) -> Column {
        let column_type = Self::settle_type(&self.values, formats);
        let values = self
            .values
            .into_iter()
            .map(|value| Self::coerce(value, column_type, formats))
            .collect();
        Column {
            name: self.name,
            column_type,
            values,
        }
    }

    fn settle_type(values: &[Value], formats: &TemporalFormats) -> ColumnType {
        if values.iter().all(Value::is_null) {
            return ColumnType::Text;
        }
        let all_numeric = values
            .iter()
            .filter(|v| !v.is_null())
            .all(|v| v.as_f64().is_some());
        if all_numeric {
            return ColumnType::Number;
        }
        let all_temporal = values.iter().filter(|v| !v.is_null()).all(|v| match v {
            Value::Timestamp(_) => true,
            Value::Text(s) => formats.parse(s).is_some(),
            _ => false,
        });
        if all_temporal {
            ColumnType::Timestamp
        } else {
            ColumnType::Text
        }
    }

    fn coerce(value: Value, column_type: ColumnType, formats: &TemporalFormats) -> Value {
        match (column_type, value) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Number, Value::Text(s)) => {
                parse_number(&s).map(Value::Number).unwrap_or(Value::Null)
            }
            (ColumnType::Timestamp, Value::Text(s)) => {
                formats.parse(&s).map(Value::Timestamp).unwrap_or(Value::Null)
            }
            (ColumnType::Text, Value::Number(n)) => Value::Text(n.to_string()),
            (ColumnType::Text, Value::Timestamp(ts)) => Value::Text(format_timestamp(&ts)),
            (_, other) => other,
        }
    }
}
