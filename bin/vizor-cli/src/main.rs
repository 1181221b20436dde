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

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vizor::{ChartKind, Upload, VisualisationPipeline, VisualisationRequest, VizorConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "vizor")]
#[command(about = "Pick a chart for a CSV or Excel file from a free-text query and narrate it.")]
struct Cli {
    /// CSV or XLSX file; the built-in player dataset is used when omitted.
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long, default_value = "")]
    query: String,
    #[arg(
        long,
        default_value = "line",
        value_parser = PossibleValuesParser::new(ChartKind::ALL.map(|kind| kind.tag()))
    )]
    chart: String,
    #[arg(long)]
    x: Option<String>,
    #[arg(long)]
    y: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the Plotly figure JSON here.
    #[arg(long)]
    figure_out: Option<PathBuf>,
    /// Only print the column choices and suggested axes.
    #[arg(long, default_value_t = false)]
    options: bool,
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args = Cli::parse();

    let filter = if args.debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("debug,reqwest=info,hyper=info,hyper_util=info"))
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = VizorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = VisualisationPipeline::from_config(config)?;

    let upload = match &args.file {
        Some(path) => {
            let raw = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(Upload::from_bytes(&raw, filename))
        }
        None => None,
    };

    println!("{}", pipeline.upload_feedback(upload.as_ref()));

    let options = pipeline.column_options(upload.as_ref(), &args.query);
    if args.options {
        println!("Columns: {}", options.x_options.join(", "));
        println!("Suggested x: {}", options.x_default.as_deref().unwrap_or("-"));
        println!("Suggested y: {}", options.y_default.as_deref().unwrap_or("-"));
        return Ok(());
    }

    info!(query = %args.query, chart = %args.chart, "Generating visualisation");
    let output = pipeline
        .generate_visualisation(VisualisationRequest {
            query: args.query,
            x: args.x,
            y: args.y,
            chart_kind: Some(args.chart),
            upload,
        })
        .await;

    println!("{}", output.narrative);
    match output.chart.title() {
        Some(title) => println!("Chart: {title}"),
        None => println!("Chart: (empty)"),
    }
    if !output.insights.is_empty() {
        println!("{}", output.insights);
    }

    if let Some(path) = args.figure_out {
        let figure = serde_json::to_string_pretty(&output.chart.to_plotly())?;
        std::fs::write(&path, figure)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote figure");
    }

    Ok(())
}
