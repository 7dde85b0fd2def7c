// OpenAI-compatible provider for third-party endpoints
//
// Many hosted and local runtimes speak the chat-completions dialect at a
// different base URL, sometimes with a different auth header and a
// different role string for generated turns. This client covers them with
// a builder instead of one struct per vendor.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use crate::openai::{byte_stream, check_status, message_to_value};
use crate::traits::{
    ByteStream, ChatProvider, ChatRequest, CompletionOutcome, Provider, ResponseOutcome,
    ResponseProvider, ResponseRequest,
};
use crate::types::Role;

/// Provider for OpenAI-compatible endpoints
pub struct CompatProvider {
    http_client: reqwest::Client,
    base_url: String,
    default_model: String,
    assistant_role: Role,
}

impl CompatProvider {
    pub fn builder() -> CompatProviderBuilder {
        CompatProviderBuilder::default()
    }
}

#[derive(Default)]
pub struct CompatProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    auth_header: Option<String>,
    default_model: Option<String>,
    assistant_role: Option<Role>,
}

impl CompatProviderBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Base URL up to and including the version segment,
    /// e.g. `http://localhost:11434/v1`
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Alternate auth header name; the key is sent verbatim under it
    /// instead of as `Authorization: Bearer <key>`
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Role string this endpoint uses for generated turns
    pub fn assistant_role(mut self, role: Role) -> Self {
        self.assistant_role = Some(role);
        self
    }

    pub fn build(self) -> Result<CompatProvider> {
        let base_url = self
            .base_url
            .context("Compatible endpoint requires a base URL")?;
        let default_model = self
            .default_model
            .context("Compatible endpoint requires a default model")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &self.api_key {
            match &self.auth_header {
                Some(name) => {
                    headers.insert(
                        HeaderName::try_from(name.as_str())
                            .context("Invalid auth header name")?,
                        HeaderValue::from_str(api_key).context("Invalid API key format")?,
                    );
                }
                None => {
                    headers.insert(
                        AUTHORIZATION,
                        HeaderValue::from_str(&format!("Bearer {}", api_key))
                            .context("Invalid API key format")?,
                    );
                }
            }
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(CompatProvider {
            http_client,
            base_url,
            default_model,
            assistant_role: self.assistant_role.unwrap_or(Role::Assistant),
        })
    }
}

impl CompatProvider {
    fn build_chat_payload(&self, request: &ChatRequest, stream: bool) -> Result<serde_json::Value> {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(message_to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });
        let obj = payload.as_object_mut().unwrap();
        crate::openai::apply_chat_params(obj, &request.model, &request.params);

        Ok(payload)
    }

    fn build_response_payload(
        &self,
        request: &ResponseRequest,
        stream: bool,
    ) -> Result<serde_json::Value> {
        let input: Vec<serde_json::Value> = request
            .input
            .iter()
            .map(message_to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut payload = json!({
            "model": request.model,
            "input": input,
            "stream": stream,
        });
        let obj = payload.as_object_mut().unwrap();
        if let Some(previous) = &request.previous_response_id {
            obj.insert("previous_response_id".to_string(), json!(previous));
        }
        if let Some(temperature) = request.params.temperature {
            obj.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.params.max_tokens {
            obj.insert("max_output_tokens".to_string(), json!(max_tokens));
        }

        Ok(payload)
    }

    async fn post(&self, path: &str, payload: &serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;
        check_status(response).await
    }

    /// Rewrite generated roles to this endpoint's dialect
    fn relabel(&self, mut outcome: CompletionOutcome) -> CompletionOutcome {
        if self.assistant_role != Role::Assistant {
            for message in outcome.messages.iter_mut() {
                if message.role == Role::Assistant {
                    message.role = self.assistant_role;
                }
            }
        }
        outcome
    }
}

#[async_trait]
impl ChatProvider for CompatProvider {
    async fn complete(&self, request: ChatRequest) -> Result<CompletionOutcome> {
        let payload = self.build_chat_payload(&request, false)?;
        let response = self.post("/chat/completions", &payload).await?;

        let document: crate::openai::ChatDocument = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(self.relabel(document.into_outcome()))
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        let payload = self.build_chat_payload(&request, true)?;
        let response = self.post("/chat/completions", &payload).await?;
        Ok(byte_stream(response))
    }
}

#[async_trait]
impl ResponseProvider for CompatProvider {
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutcome> {
        let payload = self.build_response_payload(&request, false)?;
        let response = self.post("/responses", &payload).await?;

        let document: crate::openai::ResponsesDocument = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(ResponseOutcome {
            id: Some(document.id.clone()),
            messages: document.to_messages(),
            usage: Some(document.token_usage()),
            status: Some(document.status.clone()),
            raw: serde_json::to_value(&document)?,
        })
    }

    async fn respond_stream(&self, request: ResponseRequest) -> Result<ByteStream> {
        let payload = self.build_response_payload(&request, true)?;
        let response = self.post("/responses", &payload).await?;
        Ok(byte_stream(response))
    }
}

impl Provider for CompatProvider {
    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn assistant_role(&self) -> Role {
        self.assistant_role
    }
}
