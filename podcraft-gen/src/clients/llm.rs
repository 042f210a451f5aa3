//! Language-model client.
//!
//! Two call shapes: plain script completion (flat prose) and JSON chat
//! completion (structured scripts, enforced via `response_format`).

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Script-producing language model, consumed as a black box.
#[async_trait]
pub trait ScriptModel: Send + Sync {
    /// Complete a flat prose script.
    async fn complete_script(&self, system_prompt: &str, user_context: &str) -> Result<String>;

    /// Complete a chat expected to return a single JSON object.
    async fn complete_chat_json(&self, messages: Vec<ChatMessage>, temperature: f32)
        -> Result<Value>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiScriptModel {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiScriptModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Model(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.script_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn chat(&self, body: Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "requesting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("HTTP {}: {}", status, detail)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Model(e.to_string()))
    }
}

/// Pull the assistant message content out of a chat-completions response.
fn extract_content(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| Error::Model("response carries no message content".to_string()))
}

#[async_trait]
impl ScriptModel for OpenAiScriptModel {
    async fn complete_script(&self, system_prompt: &str, user_context: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_context},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self.chat(body).await?;
        let content = extract_content(&response)?;
        info!(len = content.len(), "script completion received");
        Ok(content)
    }

    async fn complete_chat_json(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let response = self.chat(body).await?;
        let content = extract_content(&response)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidScript(format!("model returned non-JSON content: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_serializes_role_and_content() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[test]
    fn extract_content_from_completion_response() {
        let response = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  hello world  "}}
            ]
        });
        assert_eq!(extract_content(&response).unwrap(), "hello world");
    }

    #[test]
    fn extract_content_rejects_malformed_response() {
        let response = json!({"choices": []});
        assert!(extract_content(&response).is_err());

        let response = json!({"error": {"message": "overloaded"}});
        assert!(extract_content(&response).is_err());
    }

    #[test]
    fn client_creation() {
        let config = crate::config::ModelConfig::default();
        assert!(OpenAiScriptModel::new(&config).is_ok());
    }
}
