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

pub mod client;

pub use client::HttpTextGenerator;

use crate::profiler::describe;
use crate::table::Table;
use llm_contracts::{TextGenerator, DEFAULT_MAX_NEW_TOKENS};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

const ANALYSIS_PREFIX: &str = "LLM Analysis: ";
const EMPTY_OUTPUT_MESSAGE: &str = "The query couldn't be processed by the AI.";
const EMPTY_OUTPUT_INSIGHT: &str = "No insights generated.";

/// Advisory text for the user. Successful narration leaves `insights` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeResult {
    pub message: String,
    pub insights: Vec<String>,
}

impl NarrativeResult {
    pub fn analysis(generated: &str) -> Self {
        Self {
            message: format!("{ANALYSIS_PREFIX}{generated}"),
            insights: Vec::new(),
        }
    }

    pub fn empty_output() -> Self {
        Self {
            message: EMPTY_OUTPUT_MESSAGE.to_string(),
            insights: vec![EMPTY_OUTPUT_INSIGHT.to_string()],
        }
    }

    pub fn failure(diagnostic: impl Display) -> Self {
        Self {
            message: format!("Error processing query: {diagnostic}"),
            insights: vec![format!("Error: {diagnostic}")],
        }
    }

    pub fn insights_text(&self) -> String {
        self.insights.join(" ")
    }
}

pub fn build_prompt(summary: &str, query: &str) -> String {
    format!(
        "Here is a dataset:\n{summary}\nUser query: {}\n\n Provide a detailed interpretation and insights.",
        query.to_lowercase()
    )
}

#[derive(Clone)]
pub struct NarrativeGenerator {
    generator: Arc<dyn TextGenerator>,
    max_new_tokens: u32,
}

impl NarrativeGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator.provider_name()
    }

    /// Never fails: summary and service errors come back as a displayable result.
    pub async fn narrate(&self, table: &Table, query: &str) -> NarrativeResult {
        let summary = match describe(table) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Failed to summarise dataset for narration");
                return NarrativeResult::failure(e);
            }
        };
        let prompt = build_prompt(&summary, query);
        debug!(
            provider = self.generator.provider_name(),
            prompt_chars = prompt.len(),
            "Requesting narrative"
        );
        match self.generator.generate(&prompt, self.max_new_tokens).await {
            Ok(text) if text.trim().is_empty() => NarrativeResult::empty_output(),
            Ok(text) => NarrativeResult::analysis(&text),
            Err(e) => {
                warn!(
                    provider = self.generator.provider_name(),
                    error = %e,
                    "Text generation failed"
                );
                NarrativeResult::failure(e)
            }
        }
    }
}

impl std::fmt::Debug for NarrativeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeGenerator")
            .field("provider", &self.generator.provider_name())
            .field("max_new_tokens", &self.max_new_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm_contracts::{LLMError, LLMResult};
    use std::sync::Mutex;

    struct ScriptedGenerator {
        reply: fn() -> LLMResult<String>,
        seen: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedGenerator {
        fn new(reply: fn() -> LLMResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, max_new_tokens: u32) -> LLMResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_new_tokens));
            (self.reply)()
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("SUMMARY", "Show Sales TREND");
        assert_eq!(
            prompt,
            "Here is a dataset:\nSUMMARY\nUser query: show sales trend\n\n Provide a detailed interpretation and insights."
        );
    }

    #[tokio::test]
    async fn test_success_prefixes_analysis_and_leaves_insights_empty() {
        let fake = ScriptedGenerator::new(|| Ok("Runs decline across players.".to_string()));
        let narrator = NarrativeGenerator::new(fake.clone());
        let result = narrator.narrate(&Table::sample(), "Compare runs").await;
        assert_eq!(result.message, "LLM Analysis: Runs decline across players.");
        assert!(result.insights.is_empty());
        assert_eq!(result.insights_text(), "");

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, 200);
        assert!(seen[0].0.contains("User query: compare runs"));
        assert!(seen[0].0.contains("Strike Rate"));
    }

    #[tokio::test]
    async fn test_empty_output_degrades() {
        let narrator = NarrativeGenerator::new(ScriptedGenerator::new(|| Ok(String::new())));
        let result = narrator.narrate(&Table::sample(), "anything").await;
        assert_eq!(result, NarrativeResult::empty_output());
        assert_eq!(result.insights_text(), "No insights generated.");
    }

    #[tokio::test]
    async fn test_transport_error_never_raises() {
        let narrator = NarrativeGenerator::new(ScriptedGenerator::new(|| {
            Err(LLMError::Network("connection refused".to_string()))
        }));
        let result = narrator.narrate(&Table::sample(), "trend").await;
        assert!(result.message.starts_with("Error processing query:"));
        assert_eq!(
            result.insights,
            vec!["Error: Network error: connection refused".to_string()]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_and_custom_budget() {
        let fake = ScriptedGenerator::new(|| Err(LLMError::Timeout));
        let narrator = NarrativeGenerator::new(fake.clone()).with_max_new_tokens(64);
        let _ = narrator.narrate(&Table::sample(), "q").await;
        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, 64);
    }

    #[tokio::test]
    async fn test_summary_failure_degrades() {
        let fake = ScriptedGenerator::new(|| Ok("unused".to_string()));
        let narrator = NarrativeGenerator::new(fake.clone());
        let empty = Table::new(Vec::new()).unwrap();
        let result = narrator.narrate(&empty, "q").await;
        assert!(result.message.starts_with("Error processing query:"));
        assert!(fake.seen.lock().unwrap().is_empty());
    }
}
