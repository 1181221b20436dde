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
use llm_contracts::{
    extract_generated_text, EndpointConfig, GenerationRequest, LLMError, LLMResult, TextGenerator,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text generation over the hosted inference HTTP API. One POST per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpTextGenerator {
    pub fn new(config: &EndpointConfig) -> LLMResult<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|e| LLMError::Configuration(format!("Failed to create HTTP client: {e}")))?;
        if !config.has_credentials() {
            warn!(api_url = %config.api_url, "No API key configured for text generation");
        }
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn post(&self, request: &GenerationRequest) -> LLMResult<Value> {
        let mut call = self.client.post(&self.api_url).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await.map_err(map_transport_error)?;

        let status = response.status();
        info!(%status, "Received response from inference API");
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Authentication(format!(
                "Inference API rejected credentials {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider(format!(
                "Inference API error {status}: {body}"
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| LLMError::Serialisation(format!("Failed to parse JSON response: {e}")))
    }
}

fn map_transport_error(err: reqwest::Error) -> LLMError {
    if err.is_timeout() {
        warn!("Request to inference API timed out");
        LLMError::Timeout
    } else {
        LLMError::Network(format!("Request failed: {err}"))
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> LLMResult<String> {
        debug!(
            prompt_chars = prompt.len(),
            max_new_tokens, "Sending request to inference API"
        );
        let request = GenerationRequest::new(prompt, max_new_tokens);
        let body = self.post(&request).await?;
        extract_generated_text(&body)
    }

    fn provider_name(&self) -> &'static str {
        "huggingface"
    }
}
