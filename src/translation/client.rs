use crate::utils::{LocaleFillError, Result, TranslationSessionConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Prompt in, free text out. Errors mean the service was unavailable,
/// rate limited, or rejected the credentials.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct AnthropicClient {
    client: Client,
    config: TranslationSessionConfig,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: TranslationSessionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LocaleFillError::ConfigError(
                "no API key configured for the completion service".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self { client, config })
    }

    fn build_request(&self, prompt: &str) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(self.config.temperature),
        }
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&self.config.api_endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| LocaleFillError::ServiceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LocaleFillError::ServiceError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LocaleFillError::ServiceError(e.to_string()))?;

        first_text_block(api_response)
            .ok_or_else(|| LocaleFillError::ServiceError("No text content in response".to_string()))
    }
}

fn first_text_block(response: AnthropicResponse) -> Option<String> {
    response.content.into_iter().find_map(|block| {
        if block.content_type == "text" {
            block.text
        } else {
            None
        }
    })
}
