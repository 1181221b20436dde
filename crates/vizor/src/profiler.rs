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

//! Descriptive statistics rendered as a plain-text table, used as the dataset
//! summary inside the narration prompt.

use crate::error::SummaryError;
use crate::table::{ColumnType, Table, Value};
use polars::prelude::QuantileMethod;
use polars::prelude::*;
use std::collections::HashMap;

const NUMERIC_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const CATEGORICAL_ROWS: [&str; 4] = ["count", "unique", "top", "freq"];

/// Per-column numeric statistics. Missing entries come from empty or
/// single-valued columns.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl NumericSummary {
    fn cells(&self) -> Vec<String> {
        let mut cells = vec![format!("{:.6}", self.count as f64)];
        cells.extend(
            [
                self.mean, self.std, self.min, self.q25, self.median, self.q75, self.max,
            ]
            .iter()
            .map(|v| match v {
                Some(v) if v.is_finite() => format!("{v:.6}"),
                _ => "NaN".to_string(),
            }),
        );
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

impl CategoricalSummary {
    fn cells(&self) -> Vec<String> {
        vec![
            self.count.to_string(),
            self.unique.to_string(),
            self.top.clone().unwrap_or_else(|| "NaN".to_string()),
            self.freq.to_string(),
        ]
    }
}

pub fn summarise_numeric(name: &str, values: &[Value]) -> Result<NumericSummary, SummaryError> {
    let stats_err = |source: PolarsError| SummaryError::Statistics {
        column: name.to_string(),
        source,
    };
    let cells: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
    let series = Series::new(name.into(), cells);
    let s_f64 = series.f64().map_err(stats_err)?;
    let count = s_f64.len() - s_f64.null_count();
    let quantile = |q: f64| {
        s_f64
            .quantile(q, QuantileMethod::Linear)
            .map_err(stats_err)
    };
    Ok(NumericSummary {
        count,
        mean: s_f64.mean(),
        std: if count > 1 { s_f64.std(1) } else { None },
        min: s_f64.min(),
        q25: quantile(0.25)?,
        median: quantile(0.5)?,
        q75: quantile(0.75)?,
        max: s_f64.max(),
    })
}

pub fn summarise_categorical(values: &[Value]) -> CategoricalSummary {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for value in values.iter().filter(|v| !v.is_null()) {
        let key = value.to_string();
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }
    let mut top: Option<(&String, usize)> = None;
    for key in &order {
        let freq = counts.get(key).copied().unwrap_or(0);
        if top.map_or(true, |(_, best)| freq > best) {
            top = Some((key, freq));
        }
    }
    CategoricalSummary {
        count: counts.values().sum(),
        unique: order.len(),
        top: top.map(|(key, _)| key.clone()),
        freq: top.map(|(_, freq)| freq).unwrap_or(0),
    }
}

/// Describes the numeric columns; a table without any describes its other
/// columns by count, distinct values and most frequent value instead.
pub fn describe(table: &Table) -> Result<String, SummaryError> {
    if table.is_empty() {
        return Err(SummaryError::NoColumns);
    }
    let numeric: Vec<_> = table
        .columns()
        .iter()
        .filter(|c| c.column_type() == ColumnType::Number)
        .collect();

    if numeric.is_empty() {
        let columns = table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), summarise_categorical(c.values()).cells()))
            .collect::<Vec<_>>();
        return Ok(render_grid(&CATEGORICAL_ROWS, &columns));
    }

    let mut columns = Vec::with_capacity(numeric.len());
    for column in numeric {
        let summary = summarise_numeric(column.name(), column.values())?;
        columns.push((column.name().to_string(), summary.cells()));
    }
    Ok(render_grid(&NUMERIC_ROWS, &columns))
}

fn render_grid(labels: &[&str], columns: &[(String, Vec<String>)]) -> String {
    let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    let widths: Vec<usize> = columns
        .iter()
        .map(|(name, cells)| {
            cells
                .iter()
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(labels.len() + 1);
    let mut header = " ".repeat(label_width);
    for ((name, _), &width) in columns.iter().zip(&widths) {
        header.push_str(&format!("  {name:>width$}"));
    }
    lines.push(header);
    for (row, label) in labels.iter().enumerate() {
        let mut line = format!("{label:<label_width$}");
        for ((_, cells), &width) in columns.iter().zip(&widths) {
            let cell = cells.get(row).map(String::as_str).unwrap_or("");
            line.push_str(&format!("  {cell:>width$}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn test_numeric_statistics_match_describe() {
        let summary = summarise_numeric(
            "Runs",
            &[450.0, 400.0, 380.0, 350.0, 340.0].map(Value::Number),
        )
        .unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.mean, Some(384.0));
        assert_eq!(summary.min, Some(340.0));
        assert_eq!(summary.q25, Some(350.0));
        assert_eq!(summary.median, Some(380.0));
        assert_eq!(summary.q75, Some(400.0));
        assert_eq!(summary.max, Some(450.0));
        let std = summary.std.unwrap();
        assert!((std - 43.931765).abs() < 1e-6);
    }

    #[test]
    fn test_nulls_are_excluded_from_count() {
        let summary =
            summarise_numeric("x", &[Value::Number(1.0), Value::Null, Value::Number(3.0)]).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, Some(2.0));
    }

    #[test]
    fn test_describe_sample_dataset() {
        let text = describe(&Table::sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].ends_with("Runs    Matches  Strike Rate"));
        assert_eq!(lines[1], "count    5.000000   5.000000     5.000000");
        assert!(lines[2].starts_with("mean   384.000000"));
        assert!(lines[5].starts_with("25%"));
        assert!(!text.contains("Player"));
    }

    #[test]
    fn test_describe_without_numeric_columns() {
        let table = Table::new(vec![Column::texts("Fruit", &["apple", "pear", "apple"])]).unwrap();
        let text = describe(&table).unwrap();
        assert!(text.contains("unique"));
        assert!(text.contains("apple"));
        let summary = summarise_categorical(table.columns()[0].values());
        assert_eq!(summary.unique, 2);
        assert_eq!(summary.freq, 2);
    }

    #[test]
    fn test_describe_single_row_reports_missing_std() {
        let table = Table::new(vec![Column::numbers("Only", &[7.0])]).unwrap();
        let text = describe(&table).unwrap();
        assert!(text.lines().any(|l| l.starts_with("std") && l.ends_with("NaN")));
    }

    #[test]
    fn test_describe_rejects_tables_without_columns() {
        let table = Table::new(Vec::new()).unwrap();
        assert!(matches!(describe(&table), Err(SummaryError::NoColumns)));
    }
}
