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

use crate::table::{Column, Table, TemporalFormats, Value};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Datetime,
}

/// Column names bucketed by kind, each bucket in table column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeMap {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub datetime: Vec<String>,
}

impl ColumnTypeMap {
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        if self.numeric.iter().any(|c| c == name) {
            Some(ColumnKind::Numeric)
        } else if self.datetime.iter().any(|c| c == name) {
            Some(ColumnKind::Datetime)
        } else if self.categorical.iter().any(|c| c == name) {
            Some(ColumnKind::Categorical)
        } else {
            None
        }
    }

    pub fn first_numeric(&self) -> Option<&str> {
        self.numeric.first().map(String::as_str)
    }

    pub fn first_categorical(&self) -> Option<&str> {
        self.categorical.first().map(String::as_str)
    }

    pub fn first_datetime(&self) -> Option<&str> {
        self.datetime.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len() + self.datetime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, name: String, kind: ColumnKind) {
        match kind {
            ColumnKind::Numeric => self.numeric.push(name),
            ColumnKind::Categorical => self.categorical.push(name),
            ColumnKind::Datetime => self.datetime.push(name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeClassifier {
    formats: TemporalFormats,
}

impl TypeClassifier {
    pub fn new(formats: TemporalFormats) -> Self {
        Self { formats }
    }

    pub fn classify(&self, table: &Table) -> ColumnTypeMap {
        let kinds: Vec<(String, ColumnKind)> = table
            .columns()
            .par_iter()
            .map(|column| (column.name().to_string(), self.classify_column(column)))
            .collect();
        let mut map = ColumnTypeMap::default();
        for (name, kind) in kinds {
            map.insert(name, kind);
        }
        map
    }

    /// Numeric, then datetime, otherwise categorical. Null cells do not vote.
    pub fn classify_column(&self, column: &Column) -> ColumnKind {
        let mut cells = column.non_null().peekable();
        if cells.peek().is_none() {
            return ColumnKind::Categorical;
        }
        if column.non_null().all(|v| v.as_f64().is_some()) {
            return ColumnKind::Numeric;
        }
        if column.non_null().all(|v| self.is_temporal(v)) {
            return ColumnKind::Datetime;
        }
        ColumnKind::Categorical
    }

    fn is_temporal(&self, value: &Value) -> bool {
        match value {
            Value::Timestamp(_) => true,
            Value::Text(text) => self.formats.parse(text).is_some(),
            _ => false,
        }
    }
}

pub fn classify(table: &Table) -> ColumnTypeMap {
    TypeClassifier::default().classify(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_dataset_buckets() {
        let map = classify(&Table::sample());
        assert_eq!(map.numeric, vec!["Runs", "Matches", "Strike Rate"]);
        assert_eq!(map.categorical, vec!["Player"]);
        assert!(map.datetime.is_empty());
        assert_eq!(map.kind_of("Player"), Some(ColumnKind::Categorical));
        assert_eq!(map.kind_of("Wickets"), None);
    }

    #[test]
    fn test_text_cells_are_tested_by_content() {
        let table = Table::new(vec![
            Column::texts("Count", &["1", "2.5", "-3"]),
            Column::texts("When", &["2024-01-01", "01/02/2024", "2024-03-01T10:00:00Z"]),
            Column::texts("Label", &["a", "2024-01-01", "3"]),
        ])
        .unwrap();
        let map = classify(&table);
        assert_eq!(map.numeric, vec!["Count"]);
        assert_eq!(map.datetime, vec!["When"]);
        assert_eq!(map.categorical, vec!["Label"]);
    }

    #[test]
    fn test_nulls_do_not_vote_and_empty_columns_are_categorical() {
        let table = Table::new(vec![
            Column::new("Sparse", vec![Value::Null, Value::Number(2.0), Value::Null]),
            Column::new("Blank", vec![Value::Null, Value::Null, Value::Null]),
        ])
        .unwrap();
        let map = classify(&table);
        assert_eq!(map.numeric, vec!["Sparse"]);
        assert_eq!(map.categorical, vec!["Blank"]);
    }

    #[test]
    fn test_custom_formats_limit_datetime_detection() {
        let table = Table::new(vec![Column::texts("Day", &["2024/05/01", "2024/05/02"])]).unwrap();
        assert_eq!(classify(&table).categorical, vec!["Day"]);
        let classifier = TypeClassifier::new(TemporalFormats::new(vec!["%Y/%m/%d".to_string()]));
        assert_eq!(classifier.classify(&table).datetime, vec!["Day"]);
    }

    fn cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            (-1.0e6f64..1.0e6).prop_map(Value::Number),
            "[a-z]{1,6}".prop_map(Value::Text),
            (0u32..28).prop_map(|d| Value::Text(format!("2024-02-{:02}", d + 1))),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_column_lands_in_exactly_one_bucket(
            columns in prop::collection::vec(prop::collection::vec(cell(), 4), 1..6)
        ) {
            let columns: Vec<Column> = columns
                .into_iter()
                .enumerate()
                .map(|(i, values)| Column::new(format!("c{i}"), values))
                .collect();
            let table = Table::new(columns).unwrap();
            let map = classify(&table);
            prop_assert_eq!(map.len(), table.column_count());
            for column in table.columns() {
                let name = column.name().to_string();
                let hits = [&map.numeric, &map.categorical, &map.datetime]
                    .iter()
                    .filter(|bucket| bucket.contains(&name))
                    .count();
                prop_assert_eq!(hits, 1);
            }
        }

        #[test]
        fn prop_numeric_columns_are_never_categorical(
            values in prop::collection::vec(-1.0e9f64..1.0e9, 1..20)
        ) {
            let table = Table::new(vec![Column::numbers("n", &values)]).unwrap();
            let map = classify(&table);
            prop_assert_eq!(map.kind_of("n"), Some(ColumnKind::Numeric));
        }
    }
}
