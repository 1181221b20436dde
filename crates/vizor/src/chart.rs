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

use crate::axis::AxisSelection;
use crate::error::{RenderError, RenderResult};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Pie,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "line" => Some(ChartKind::Line),
            "bar" => Some(ChartKind::Bar),
            "scatter" => Some(ChartKind::Scatter),
            "pie" => Some(ChartKind::Pie),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "Line Graph",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Pie => "Pie Chart",
        }
    }

    pub fn title(&self, x: &str, y: &str) -> String {
        match self {
            ChartKind::Pie => format!("{}: {y} distribution", self.label()),
            _ => format!("{}: {y} vs {x}", self.label()),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A chart ready for display. For pies `x` names the label column and `y`
/// the slice sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub title: String,
    pub x_values: Vec<Value>,
    pub y_values: Vec<Value>,
}

impl ChartSpec {
    pub fn to_plotly(&self) -> JsonValue {
        let xs: Vec<JsonValue> = self.x_values.iter().map(Value::to_json).collect();
        let ys: Vec<JsonValue> = self.y_values.iter().map(Value::to_json).collect();
        let trace = match self.kind {
            ChartKind::Line => json!({
                "type": "scatter",
                "mode": "lines",
                "x": xs,
                "y": ys,
                "name": self.y,
            }),
            ChartKind::Scatter => json!({
                "type": "scatter",
                "mode": "markers",
                "x": xs,
                "y": ys,
                "name": self.y,
            }),
            ChartKind::Bar => json!({
                "type": "bar",
                "x": xs,
                "y": ys,
                "name": self.y,
            }),
            ChartKind::Pie => json!({
                "type": "pie",
                "labels": xs,
                "values": ys,
            }),
        };
        let layout = match self.kind {
            ChartKind::Pie => json!({
                "title": { "text": self.title },
                "showlegend": true,
            }),
            _ => json!({
                "title": { "text": self.title },
                "xaxis": { "title": { "text": self.x } },
                "yaxis": { "title": { "text": self.y } },
            }),
        };
        json!({ "data": [trace], "layout": layout })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderedChart {
    Chart(ChartSpec),
    Placeholder,
}

impl RenderedChart {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            RenderedChart::Chart(spec) => Some(spec),
            RenderedChart::Placeholder => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderedChart::Placeholder)
    }

    pub fn title(&self) -> Option<&str> {
        self.spec().map(|s| s.title.as_str())
    }

    /// Plotly figure JSON; the placeholder is the empty figure `{}`.
    pub fn to_plotly(&self) -> JsonValue {
        match self {
            RenderedChart::Chart(spec) => spec.to_plotly(),
            RenderedChart::Placeholder => json!({}),
        }
    }
}

/// Unknown chart kinds and absent axes yield the placeholder. Axes that name
/// no column, or a pie over non-numeric sizes, are errors.
pub fn render(
    table: &Table,
    axes: &AxisSelection,
    chart_kind: Option<&str>,
) -> RenderResult<RenderedChart> {
    let Some(kind) = chart_kind.and_then(ChartKind::parse) else {
        return Ok(RenderedChart::Placeholder);
    };
    let (Some(x), Some(y)) = (axes.x.as_deref(), axes.y.as_deref()) else {
        return Ok(RenderedChart::Placeholder);
    };
    let x_column = lookup(table, x)?;
    let y_column = lookup(table, y)?;
    if kind == ChartKind::Pie {
        ensure_numeric(y_column)?;
    }
    Ok(RenderedChart::Chart(ChartSpec {
        kind,
        x: x.to_string(),
        y: y.to_string(),
        title: kind.title(x, y),
        x_values: x_column.values().to_vec(),
        y_values: y_column.values().to_vec(),
    }))
}

fn lookup<'a>(table: &'a Table, name: &str) -> RenderResult<&'a Column> {
    table.column(name).ok_or_else(|| RenderError::MissingColumn {
        column: name.to_string(),
    })
}

fn ensure_numeric(column: &Column) -> RenderResult<()> {
    match column.non_null().find(|v| v.as_f64().is_none()) {
        Some(value) => Err(RenderError::NonNumericValues {
            column: column.name().to_string(),
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}
