use anyhow::{Context, Result};

use dialogos_llm::{
    Bot, CallParams, ClientFactory, ProviderConfig, QueueMode,
};

/// Builder assembling a provider and a `Bot` in one go
///
/// Points at OpenAI by default; `compatible` switches to any endpoint
/// speaking the same dialect.
#[derive(Default)]
pub struct BotBuilder {
    openai_key: Option<String>,
    compatible: Option<(String, String)>,
    api_key: Option<String>,
    model: Option<String>,
    mode: Option<QueueMode>,
    defaults: CallParams,
}

impl BotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use OpenAI with this API key
    pub fn openai_key(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = Some(api_key.into());
        self
    }

    /// Use an OpenAI-compatible endpoint instead
    pub fn compatible(
        mut self,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        self.compatible = Some((base_url.into(), default_model.into()));
        self
    }

    /// API key for a compatible endpoint
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Default model for every turn (overridable per call)
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Stateless chat (default) or stateful response chaining
    pub fn mode(mut self, mode: QueueMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Conversation-wide default parameters
    pub fn defaults(mut self, defaults: CallParams) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> Result<Bot> {
        let config = match (self.compatible.clone(), self.openai_key.clone()) {
            (Some((base_url, default_model)), _) => {
                let mut config = dialogos_llm::CompatConfig::new(base_url, default_model);
                if let Some(api_key) = self.api_key.clone() {
                    config = config.with_api_key(api_key);
                }
                ProviderConfig {
                    details: dialogos_llm::config::ProviderDetails::Compatible(config),
                }
            }
            (None, Some(api_key)) => ProviderConfig::openai(api_key),
            (None, None) => anyhow::bail!("BotBuilder needs an API key or a compatible endpoint"),
        };

        let provider = ClientFactory::create_provider(config)
            .context("Failed to create provider from configuration")?;

        let mut defaults = self.defaults;
        if defaults.model.is_none() {
            defaults.model = self.model;
        }

        let mut bot = Bot::new(provider).with_defaults(defaults);
        if let Some(mode) = self.mode {
            bot = bot.with_mode(mode);
        }
        Ok(bot)
    }
}
