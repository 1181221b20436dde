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

use crate::classifier::ColumnTypeMap;
use serde::{Deserialize, Serialize};

/// The (x, y) column pair driving a chart. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    pub x: Option<String>,
    pub y: Option<String>,
}

impl AxisSelection {
    pub fn new(x: Option<&str>, y: Option<&str>) -> Self {
        Self {
            x: x.map(str::to_string),
            y: y.map(str::to_string),
        }
    }

    /// Explicit user choices replace the suggested axes as given.
    pub fn with_overrides(self, x: Option<String>, y: Option<String>) -> Self {
        Self {
            x: x.or(self.x),
            y: y.or(self.y),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRule {
    DatetimeThenCategorical,
    Categorical,
}

impl XRule {
    fn pick<'a>(&self, types: &'a ColumnTypeMap) -> Option<&'a str> {
        match self {
            XRule::DatetimeThenCategorical => {
                types.first_datetime().or_else(|| types.first_categorical())
            }
            XRule::Categorical => types.first_categorical(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AxisRule {
    pub keywords: &'static [&'static str],
    pub x: XRule,
}

impl AxisRule {
    fn matches(&self, query: &str) -> bool {
        self.keywords.iter().any(|k| query.contains(k))
    }
}

/// Keyword rules evaluated top to bottom; the first match wins.
#[derive(Debug, Clone)]
pub struct AxisSelector {
    rules: Vec<AxisRule>,
    fallback: XRule,
}

impl Default for AxisSelector {
    fn default() -> Self {
        Self {
            rules: vec![
                AxisRule {
                    keywords: &["trend", "time"],
                    x: XRule::DatetimeThenCategorical,
                },
                AxisRule {
                    keywords: &["compare", "categories"],
                    x: XRule::Categorical,
                },
            ],
            fallback: XRule::Categorical,
        }
    }
}

impl AxisSelector {
    pub fn new(rules: Vec<AxisRule>, fallback: XRule) -> Self {
        Self { rules, fallback }
    }

    pub fn select(&self, query: &str, types: &ColumnTypeMap) -> AxisSelection {
        let query = query.to_lowercase();
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(&query))
            .map(|rule| rule.x)
            .unwrap_or(self.fallback);
        AxisSelection::new(rule.pick(types), types.first_numeric())
    }
}

pub fn select_axes(query: &str, types: &ColumnTypeMap) -> AxisSelection {
    AxisSelector::default().select(query, types)
}
