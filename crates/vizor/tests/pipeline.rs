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

use async_trait::async_trait;
use llm_contracts::{LLMError, LLMResult, TextGenerator};
use std::sync::{Arc, Mutex};
use vizor::{
    ChartKind, RenderedChart, Table, Upload, VisualisationPipeline, VisualisationRequest,
    VizorConfig,
};

const SALES_CSV: &[u8] = b"Month,Sales\nJan,10\nFeb,20\nMar,15\n";

struct FakeGenerator {
    reply: LLMResult<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    fn replying(reply: LLMResult<String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, _max_new_tokens: u32) -> LLMResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(LLMError::Network(e.to_string())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

fn request(query: &str, chart: &str, upload: Option<Upload>) -> VisualisationRequest {
    VisualisationRequest {
        query: query.to_string(),
        chart_kind: Some(chart.to_string()),
        upload,
        ..VisualisationRequest::default()
    }
}

#[tokio::test]
async fn sales_trend_falls_back_to_categorical_month() {
    let fake = FakeGenerator::replying(Ok("Sales peak in February.".to_string()));
    let pipeline = VisualisationPipeline::new(VizorConfig::default(), fake.clone());
    let upload = Upload::from_bytes(SALES_CSV, "sales.csv");

    assert_eq!(
        pipeline.upload_feedback(Some(&upload)),
        "File 'sales.csv' uploaded successfully."
    );
    let options = pipeline.column_options(Some(&upload), "show sales trend");
    assert_eq!(options.x_default.as_deref(), Some("Month"));
    assert_eq!(options.y_default.as_deref(), Some("Sales"));

    let output = pipeline
        .generate_visualisation(request("show sales trend", "line", Some(upload)))
        .await;
    assert_eq!(output.narrative, "LLM Analysis: Sales peak in February.");
    assert_eq!(output.insights, "");
    let spec = output.chart.spec().unwrap();
    assert_eq!(spec.kind, ChartKind::Line);
    assert_eq!(spec.title, "Line Graph: Sales vs Month");
    assert_eq!(spec.x_values.len(), 3);

    let prompts = fake.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Sales"));
    assert!(prompts[0].contains("User query: show sales trend"));
}

#[tokio::test]
async fn narration_failure_does_not_block_the_chart() {
    let fake = FakeGenerator::replying(Err(LLMError::Timeout));
    let pipeline = VisualisationPipeline::new(VizorConfig::default(), fake);
    let output = pipeline
        .generate_visualisation(request("", "pie", None))
        .await;
    assert!(output.narrative.starts_with("Error processing query:"));
    assert!(output.insights.starts_with("Error: "));
    assert_eq!(output.chart.title(), Some("Pie Chart: Runs distribution"));
}

#[tokio::test]
async fn empty_generation_is_reported() {
    let pipeline =
        VisualisationPipeline::new(VizorConfig::default(), FakeGenerator::replying(Ok(String::new())));
    let output = pipeline
        .generate_visualisation(request("compare", "scatter", None))
        .await;
    assert_eq!(output.narrative, "The query couldn't be processed by the AI.");
    assert_eq!(output.insights, "No insights generated.");
    assert_eq!(output.chart.title(), Some("Scatter Plot: Runs vs Player"));
}

#[tokio::test]
async fn unsupported_upload_short_circuits() {
    let fake = FakeGenerator::replying(Ok("unused".to_string()));
    let pipeline = VisualisationPipeline::new(VizorConfig::default(), fake.clone());
    let upload = Upload::from_bytes(b"{}", "data.json");
    let output = pipeline
        .generate_visualisation(request("trend", "line", Some(upload)))
        .await;
    assert_eq!(
        output.narrative,
        "Unsupported file type. Please upload a CSV or Excel file."
    );
    assert_eq!(output.chart, RenderedChart::Placeholder);
    assert_eq!(output.insights, "");
    assert!(fake.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_csv_is_a_parse_error() {
    let pipeline = VisualisationPipeline::new(
        VizorConfig::default(),
        FakeGenerator::replying(Ok("unused".to_string())),
    );
    let upload = Upload::from_bytes(b"a,b\n1,2,3\n", "broken.csv");
    let output = pipeline
        .generate_visualisation(request("", "bar", Some(upload)))
        .await;
    assert!(output.narrative.starts_with("Error processing file:"));
    assert!(output.chart.is_placeholder());
}

#[tokio::test]
async fn stale_override_becomes_render_error() {
    let pipeline = VisualisationPipeline::new(
        VizorConfig::default(),
        FakeGenerator::replying(Ok("ok".to_string())),
    );
    let output = pipeline
        .generate_visualisation(VisualisationRequest {
            x: Some("Wickets".to_string()),
            ..request("", "bar", None)
        })
        .await;
    assert!(output
        .narrative
        .starts_with("Error generating visualization:"));
    assert!(output.chart.is_placeholder());
    assert_eq!(output.insights, "");
}

#[tokio::test]
async fn unknown_chart_kind_gives_placeholder_with_narrative() {
    let pipeline = VisualisationPipeline::new(
        VizorConfig::default(),
        FakeGenerator::replying(Ok("ok".to_string())),
    );
    let output = pipeline
        .generate_visualisation(request("", "heatmap", None))
        .await;
    assert_eq!(output.narrative, "LLM Analysis: ok");
    assert_eq!(output.chart.to_plotly(), serde_json::json!({}));
}

#[tokio::test]
async fn configured_default_table_replaces_sample() {
    let table = vizor::decode(SALES_CSV, "sales.csv").unwrap();
    let config = VizorConfig::default().with_default_table(table);
    let pipeline = VisualisationPipeline::new(config, FakeGenerator::replying(Ok("ok".to_string())));
    let output = pipeline
        .generate_visualisation(request("", "bar", None))
        .await;
    assert_eq!(output.chart.title(), Some("Bar Chart: Sales vs Month"));
    assert_ne!(pipeline.config().default_table, Table::sample());
}
