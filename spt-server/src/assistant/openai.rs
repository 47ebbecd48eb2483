//! OpenAI chat completion client
//!
//! # API Reference
//! - Endpoint: https://api.openai.com/v1/chat/completions
//! - Auth: `Authorization: Bearer <api key>`

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ChatError, ChatModel};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const USER_AGENT: &str = concat!("spt-server/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = "Answer the user's question directly in one short sentence. \
No greetings, no filler, no explanations.";

pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point the client at another compatible endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, message: &str) -> Result<String, ChatError> {
        debug!(model = %self.model, "Sending chat completion request");

        let request = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: message,
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api(format!("returned error {}: {}", status, body)));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(format!("Failed to parse chat response: {}", e)))?;

        Ok(completion_text(body))
    }
}

impl ChatModel for OpenAiClient {
    fn complete<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<String, ChatError>> {
        self.chat(message).boxed()
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice, empty when there is none
fn completion_text(response: CompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_choice_content_is_returned() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Paris." } },
                { "index": 1, "message": { "role": "assistant", "content": "Lyon." } }
            ]
        }))
        .unwrap();
        assert_eq!(completion_text(response), "Paris.");
    }

    #[test]
    fn missing_choices_yield_empty_text() {
        let response: CompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(completion_text(response), "");

        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        }))
        .unwrap();
        assert_eq!(completion_text(response), "");
    }

    #[test]
    fn request_carries_system_prompt_and_question() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: "capital of France?",
                },
            ],
            temperature: 0.3,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "capital of France?");
    }
}
