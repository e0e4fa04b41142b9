//! Chat-completion client for AI-assisted content.
//!
//! Call sites never surface an LLM failure to the user: they log it at `warn`
//! and substitute fixed content.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Conversation roles. The system prompt is sent separately and is never a
/// turn, so client-supplied history cannot carry one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Ask the model for a single JSON object.
    pub json_mode: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: CompletionRequest) -> anyhow::Result<String>;
}

/// OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(serde_json::json!({ "role": "system", "content": request.system }));
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| serde_json::json!({ "role": m.role, "content": m.content })),
        );

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, request: CompletionRequest) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is not set");
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&self.request_body(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, body);
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .context("LLM response has no message content")?
            .trim()
            .to_string();

        if text.is_empty() {
            anyhow::bail!("LLM returned an empty message");
        }
        Ok(text)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Returns a canned reply, or fails every call when built with `failing`.
    pub struct StubLlm {
        reply: Option<String>,
    }

    impl StubLlm {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
            }
        }

        pub fn failing() -> Self {
            Self { reply: None }
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, _request: CompletionRequest) -> anyhow::Result<String> {
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("stub LLM failure"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str) -> Config {
        Config {
            openai_api_key: api_key.into(),
            openai_base_url: "https://api.openai.com/v1/".into(),
            ..Config::for_tests()
        }
    }

    fn request(json_mode: bool) -> CompletionRequest {
        CompletionRequest {
            system: "You are a coach.".into(),
            messages: vec![ChatTurn::user("Hi")],
            temperature: 0.7,
            max_tokens: 100,
            timeout: Duration::from_secs(1),
            json_mode,
        }
    }

    #[tokio::test]
    async fn test_empty_api_key_fails_without_network() {
        let client = OpenAiClient::new(&config("")).unwrap();
        let err = client.generate(request(false)).await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::new(&config("sk-test")).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");

        let body = client.request_body(&request(true));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["response_format"]["type"], "json_object");

        let plain = client.request_body(&request(false));
        assert!(plain.get("response_format").is_none());
    }
}
