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

pub mod axis;
pub mod chart;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod narrative;
pub mod profiler;
pub mod table;

pub use axis::{select_axes, AxisSelection, AxisSelector};
pub use chart::{render, ChartKind, ChartSpec, RenderedChart};
pub use classifier::{classify, ColumnKind, ColumnTypeMap, TypeClassifier};
pub use config::{DataConfig, VizorConfig};
pub use error::{
    ConfigError, IngestError, RenderError, Result, SummaryError, TableError, VizorError,
};
pub use ingest::{decode, decode_upload, encode_csv, SourceFormat, TableDecoder, Upload};
pub use narrative::{HttpTextGenerator, NarrativeGenerator, NarrativeResult};
pub use table::{Column, ColumnType, Table, Value};

use llm_contracts::TextGenerator;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One press of "generate": the query, optional axis overrides, the chart
/// kind tag and the uploaded file, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualisationRequest {
    pub query: String,
    pub x: Option<String>,
    pub y: Option<String>,
    pub chart_kind: Option<String>,
    pub upload: Option<Upload>,
}

/// The three texts and figure shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualisationOutput {
    pub narrative: String,
    pub chart: RenderedChart,
    pub insights: String,
}

impl VisualisationOutput {
    fn failed(message: String) -> Self {
        Self {
            narrative: message,
            chart: RenderedChart::Placeholder,
            insights: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOptions {
    pub x_options: Vec<String>,
    pub y_options: Vec<String>,
    pub x_default: Option<String>,
    pub y_default: Option<String>,
}

/// Stateless between calls; every request re-decodes its own upload.
#[derive(Debug, Clone)]
pub struct VisualisationPipeline {
    config: VizorConfig,
    decoder: TableDecoder,
    classifier: TypeClassifier,
    selector: AxisSelector,
    narrator: NarrativeGenerator,
}

impl VisualisationPipeline {
    pub fn new(config: VizorConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let formats = config.data.temporal_formats.clone();
        let narrator =
            NarrativeGenerator::new(generator).with_max_new_tokens(config.generation.max_new_tokens);
        Self {
            decoder: TableDecoder::new(formats.clone()),
            classifier: TypeClassifier::new(formats),
            selector: AxisSelector::default(),
            narrator,
            config,
        }
    }

    pub fn from_config(config: VizorConfig) -> Result<Self> {
        let generator = HttpTextGenerator::new(&config.generation)?;
        Ok(Self::new(config, Arc::new(generator)))
    }

    pub fn config(&self) -> &VizorConfig {
        &self.config
    }

    pub fn upload_feedback(&self, upload: Option<&Upload>) -> String {
        match upload {
            Some(upload) if !upload.contents.is_empty() && !upload.filename.is_empty() => {
                format!("File '{}' uploaded successfully.", upload.filename)
            }
            _ => "No file uploaded yet.".to_string(),
        }
    }

    /// The uploaded table, or the configured default when nothing was uploaded.
    pub fn active_table(
        &self,
        upload: Option<&Upload>,
    ) -> std::result::Result<Cow<'_, Table>, IngestError> {
        match upload {
            Some(upload) if !upload.contents.is_empty() => {
                self.decoder.decode_upload(upload).map(Cow::Owned)
            }
            _ => Ok(Cow::Borrowed(&self.config.default_table)),
        }
    }

    pub fn suggest_axes(&self, table: &Table, query: &str) -> AxisSelection {
        let types = self.classifier.classify(table);
        self.selector.select(query, &types)
    }

    pub fn column_options(&self, upload: Option<&Upload>, query: &str) -> ColumnOptions {
        let table = match self.active_table(upload) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Cannot offer column options for upload");
                return ColumnOptions::default();
            }
        };
        let names = table.column_names();
        let suggested = self.suggest_axes(&table, query);
        ColumnOptions {
            x_options: names.clone(),
            y_options: names,
            x_default: suggested.x,
            y_default: suggested.y,
        }
    }

    pub async fn generate_visualisation(
        &self,
        request: VisualisationRequest,
    ) -> VisualisationOutput {
        let request_id = Uuid::new_v4();
        let table = match self.active_table(request.upload.as_ref()) {
            Ok(table) => table,
            Err(e) => {
                warn!(%request_id, error = %e, "Rejected upload");
                return VisualisationOutput::failed(VizorError::from(e).user_message());
            }
        };
        info!(
            %request_id,
            rows = table.row_count(),
            columns = table.column_count(),
            chart_kind = request.chart_kind.as_deref().unwrap_or(""),
            "Generating visualisation"
        );

        let axes = self
            .suggest_axes(&table, &request.query)
            .with_overrides(request.x, request.y);
        let narrative = self.narrator.narrate(&table, &request.query).await;

        match render(&table, &axes, request.chart_kind.as_deref()) {
            Ok(chart) => {
                info!(%request_id, placeholder = chart.is_placeholder(), "Visualisation ready");
                VisualisationOutput {
                    insights: narrative.insights_text(),
                    narrative: narrative.message,
                    chart,
                }
            }
            Err(e) => {
                warn!(%request_id, error = %e, "Failed to render chart");
                VisualisationOutput::failed(VizorError::from(e).user_message())
            }
        }
    }
}
