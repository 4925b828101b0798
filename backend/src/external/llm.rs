//! Chat-completion client for free-text assessments

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, AdapterError};
use crate::config::LlmConfig;

const SERVICE: &str = "llm";

/// Language model producing free text from a prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AdapterError>;
}

/// OpenAI-compatible chat-completion client
#[derive(Clone)]
pub struct ChatCompletionClient {
    http_client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AdapterError> {
        Ok(Self {
            http_client: http_client(SERVICE, config.timeout_secs)?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AdapterError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::Unconfigured("language model"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        let parsed: ChatResponse = AdapterError::check(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::decode(SERVICE, e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AdapterError::decode(SERVICE, "response contained no text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape_decodes() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Likely compliant.  "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("  Likely compliant.  ")
        );
    }
}
