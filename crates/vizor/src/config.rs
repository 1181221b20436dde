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

use crate::error::{ConfigError, ConfigResult};
use crate::table::{Table, TemporalFormats};
use llm_contracts::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const ENV_API_URL: &str = "VIZOR_API_URL";
pub const ENV_API_KEY: &str = "VIZOR_API_KEY";
pub const ENV_MAX_NEW_TOKENS: &str = "VIZOR_MAX_NEW_TOKENS";
pub const ENV_TIMEOUT_SECONDS: &str = "VIZOR_TIMEOUT_SECONDS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub temporal_formats: TemporalFormats,
}

/// Process-wide settings handed to the pipeline at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizorConfig {
    #[serde(default)]
    pub generation: EndpointConfig,
    #[serde(default)]
    pub data: DataConfig,
    /// Dataset used when nothing has been uploaded.
    #[serde(skip, default = "Table::sample")]
    pub default_table: Table,
}

impl Default for VizorConfig {
    fn default() -> Self {
        Self {
            generation: EndpointConfig::default(),
            data: DataConfig::default(),
            default_table: Table::sample(),
        }
    }
}

impl VizorConfig {
    /// Defaults, then the optional TOML file, then `VIZOR_*` environment variables.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!(generation = ?config.generation.redacted(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.generation.api_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.generation.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_MAX_NEW_TOKENS) {
            self.generation.max_new_tokens = parse_field(ENV_MAX_NEW_TOKENS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECONDS) {
            self.generation.timeout_seconds = Some(parse_field(ENV_TIMEOUT_SECONDS, &raw)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.generation.api_url.trim().is_empty() {
            return Err(invalid("generation.api_url", ""));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(invalid("generation.max_new_tokens", "0"));
        }
        if self.generation.timeout_seconds == Some(0) {
            return Err(invalid("generation.timeout_seconds", "0"));
        }
        if self.data.temporal_formats.is_empty() {
            return Err(invalid("data.temporal_formats", "[]"));
        }
        Ok(())
    }

    pub fn with_default_table(mut self, table: Table) -> Self {
        self.default_table = table;
        self
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| invalid(field, raw))
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
