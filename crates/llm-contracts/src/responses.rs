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

use crate::types::{LLMError, LLMResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// Pulls the generated span out of an inference response body.
///
/// The service answers with a JSON array whose first element holds a
/// `generated_text` string; anything else is reported as a serialisation error.
pub fn extract_generated_text(body: &Value) -> LLMResult<String> {
    let first = body
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| {
            LLMError::Serialisation("Expected a non-empty JSON array in response".to_string())
        })?;
    let parsed: GeneratedText = serde_json::from_value(first.clone()).map_err(|e| {
        LLMError::Serialisation(format!("Missing generated_text in response: {e}"))
    })?;
    Ok(parsed.generated_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_first_element() {
        let body = json!([{"generated_text": "Runs fall steadily."}, {"generated_text": "ignored"}]);
        assert_eq!(extract_generated_text(&body).unwrap(), "Runs fall steadily.");
    }

    #[test]
    fn test_rejects_unexpected_shapes() {
        for body in [
            json!({"error": "Model is loading"}),
            json!([]),
            json!([{"text": "wrong key"}]),
            json!([{"generated_text": 42}]),
        ] {
            let err = extract_generated_text(&body).unwrap_err();
            assert!(matches!(err, LLMError::Serialisation(_)), "{body}");
        }
    }
}
