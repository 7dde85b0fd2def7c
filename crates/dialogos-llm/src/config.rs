// Configuration layer for provider-agnostic client creation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::compat::CompatProvider;
use crate::openai::OpenAiProvider;
use crate::traits::Provider;
use crate::types::Role;

/// Type of LLM provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    OpenAi,
    Compatible,
}

/// Configuration for the OpenAI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL (optional, defaults to https://api.openai.com/v1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }
}

/// Configuration for an OpenAI-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    /// Alternate auth header name (key sent verbatim under it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,
    /// Role string the endpoint uses for generated turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_role: Option<Role>,
}

impl CompatConfig {
    pub fn new(base_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            default_model: default_model.into(),
            auth_header: None,
            assistant_role: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    pub fn with_assistant_role(mut self, role: Role) -> Self {
        self.assistant_role = Some(role);
        self
    }
}

/// Provider-specific configuration details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderDetails {
    OpenAi(OpenAiConfig),
    Compatible(CompatConfig),
}

/// Complete provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
}

impl ProviderConfig {
    /// Create OpenAI provider config
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::OpenAi(OpenAiConfig::new(api_key)),
        }
    }

    /// Create config for an OpenAI-compatible endpoint
    pub fn compatible(base_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::Compatible(CompatConfig::new(base_url, default_model)),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::OpenAi(_) => ProviderType::OpenAi,
            ProviderDetails::Compatible(_) => ProviderType::Compatible,
        }
    }
}

/// Factory for creating providers from configuration
///
/// Provider identity is fixed at construction; dialect behavior lives in
/// the concrete client, never in shared types.
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
        match config.details {
            ProviderDetails::OpenAi(config) => {
                let mut provider = OpenAiProvider::new(config.api_key)?;
                if let Some(base_url) = config.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(model) = config.default_model {
                    provider = provider.with_default_model(model);
                }
                Ok(Arc::new(provider))
            }
            ProviderDetails::Compatible(config) => {
                let mut builder = CompatProvider::builder()
                    .base_url(config.base_url)
                    .default_model(config.default_model);
                if let Some(api_key) = config.api_key {
                    builder = builder.api_key(api_key);
                }
                if let Some(header) = config.auth_header {
                    builder = builder.auth_header(header);
                }
                if let Some(role) = config.assistant_role {
                    builder = builder.assistant_role(role);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }
}
