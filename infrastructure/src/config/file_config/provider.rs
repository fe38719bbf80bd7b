//! Provider configuration from TOML (`[provider]` section)

use crate::providers::openai::OpenAiGatewayConfig;
use parley_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Base URL of the Chat Completions server (without `/v1/...`).
    pub base_url: String,
    /// Environment variable name for the API key (default: "OPENAI_API_KEY").
    pub api_key_env: String,
    /// Direct API key. Prefer `api_key_env`.
    pub api_key: Option<String>,
    /// Model for conversation turns.
    pub model: String,
    /// Model for feedback and suggestions; defaults to `model`.
    pub analysis_model: Option<String>,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            model: "gpt-4.1-mini".to_string(),
            analysis_model: None,
            max_tokens: 1024,
            request_timeout_secs: 60,
        }
    }
}

impl FileProviderConfig {
    /// The configured key, else the one in `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Build the gateway settings; `chunk_timeout_secs` comes from `[engine]`.
    pub fn to_gateway_config(&self, chunk_timeout_secs: u64) -> OpenAiGatewayConfig {
        OpenAiGatewayConfig {
            base_url: self.base_url.trim().to_string(),
            api_key: self.resolve_api_key(),
            model: self.model.trim().to_string(),
            analysis_model: self
                .analysis_model
                .as_ref()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            max_tokens: (self.max_tokens > 0).then_some(self.max_tokens),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            chunk_timeout: Duration::from_secs(chunk_timeout_secs),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "provider.base_url".to_string(),
                },
                "provider.base_url must not be empty",
            ));
        } else if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::Unparsable {
                    field: "provider.base_url".to_string(),
                    value: self.base_url.clone(),
                },
                format!("provider.base_url: '{}' is not an http(s) URL", self.base_url),
            ));
        }

        if self.model.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "provider.model".to_string(),
                },
                "provider.model must not be empty",
            ));
        }

        if let Some(model) = &self.analysis_model
            && model.trim().is_empty()
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::EmptyValue {
                    field: "provider.analysis_model".to_string(),
                },
                "provider.analysis_model is empty, falling back to provider.model",
            ));
        }

        if self.request_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue {
                    field: "provider.request_timeout_secs".to_string(),
                },
                "provider.request_timeout_secs must be greater than 0",
            ));
        }

        issues
    }

    /// Warn when no key is available. Local servers often need none.
    pub fn check_api_key(&self) -> Option<ConfigIssue> {
        if self.resolve_api_key().is_some() {
            return None;
        }
        Some(ConfigIssue::warning(
            ConfigIssueCode::MissingApiKey {
                env: self.api_key_env.clone(),
            },
            format!(
                "No API key: set provider.api_key or ${}; requests go out unauthenticated",
                self.api_key_env
            ),
        ))
    }
}
