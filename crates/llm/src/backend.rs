//! Hosted conversational agent over HTTP
//!
//! `POST {endpoint}/v1/agents/{agent}/aliases/{alias}/sessions/{session}/text`
//! with `{input_text, session_attributes}` returns
//! `{completion, requires_handoff?, handoff_reason?}`. `DELETE` on the same
//! session path ends the agent session.

use async_trait::async_trait;
use media_gateway_config::DialogueConfig;
use media_gateway_core::{AgentReply, DialogueService, Result, SessionAttributes};
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

use crate::signals::interpret_reply;
use crate::LlmError;

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    input_text: &'a str,
    session_attributes: &'a SessionAttributes,
}

pub struct HttpDialogueBackend {
    client: Client,
    endpoint: Url,
    agent_id: String,
    alias_id: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpDialogueBackend {
    pub fn new(config: &DialogueConfig) -> std::result::Result<Self, LlmError> {
        if config.agent_id.is_empty() {
            return Err(LlmError::Configuration("dialogue.agent_id is empty".to_string()));
        }

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            LlmError::Configuration(format!("dialogue.endpoint `{}`: {}", config.endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(LlmError::Configuration(format!(
                "dialogue.endpoint `{}` is not a base URL",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            agent_id: config.agent_id.clone(),
            alias_id: config.alias_id.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        })
    }

    /// Session path under the endpoint; every id is one encoded segment
    fn session_url(&self, session_id: &str, tail: &[&str]) -> std::result::Result<Url, LlmError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| LlmError::Configuration("dialogue.endpoint is not a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v1", "agents", self.agent_id.as_str()])
            .extend(["aliases", self.alias_id.as_str()])
            .extend(["sessions", session_id])
            .extend(tail);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn invoke_inner(
        &self,
        session_id: &str,
        input: &str,
        attributes: &SessionAttributes,
    ) -> std::result::Result<AgentReply, LlmError> {
        let body = InvokeRequest {
            input_text: input,
            session_attributes: attributes,
        };

        let response = self
            .authorize(self.client.post(self.session_url(session_id, &["text"])?))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let reply: AgentReply = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(interpret_reply(reply))
    }
}

#[async_trait]
impl DialogueService for HttpDialogueBackend {
    async fn invoke(
        &self,
        session_id: &str,
        input: &str,
        attributes: &SessionAttributes,
    ) -> Result<AgentReply> {
        Ok(self.invoke_inner(session_id, input, attributes).await?)
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.session_url(session_id, &[])?))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {} ending session", response.status())).into());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
