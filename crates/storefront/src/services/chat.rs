//! `OpenRouter` chat completion client for the support assistant.
//!
//! The assistant's business facts live in [`lavistique_core::chat::SYSTEM_PROMPT`],
//! which is prepended to every conversation. Callers fall back to
//! [`lavistique_core::chat::fallback_reply`] when this client is missing or
//! fails.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use lavistique_core::chat::SYSTEM_PROMPT;

use crate::config::ChatConfig;

/// `OpenRouter` chat completions endpoint.
const COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Title reported to `OpenRouter` for usage attribution.
const APP_TITLE: &str = "La Vistique Chat";

/// Upper bound on reply length.
const MAX_TOKENS: u32 = 300;

/// Errors that can occur when calling the chat API.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the provider.
    #[error("Chat provider rate limited the request")]
    RateLimited,

    /// The completion contained no text.
    #[error("Chat completion was empty")]
    EmptyResponse,

    /// A configured value cannot be sent as a header.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Who wrote a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
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

/// Chat completion client.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    model: String,
}

impl ChatClient {
    /// Create a new chat client.
    ///
    /// `referer` is the public site URL sent as `HTTP-Referer`.
    ///
    /// # Errors
    ///
    /// Returns error if a header value is invalid or the HTTP client fails
    /// to build.
    pub fn new(config: &ChatConfig, referer: &str) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ChatError::InvalidHeader(format!("API key: {e}")))?,
        );
        headers.insert(
            "HTTP-Referer",
            HeaderValue::from_str(referer)
                .map_err(|e| ChatError::InvalidHeader(format!("referer: {e}")))?,
        );
        headers.insert("X-Title", HeaderValue::from_static(APP_TITLE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    /// Model identifier requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for the next assistant turn.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the provider rejects it, or the
    /// completion has no text.
    #[instrument(skip(self, messages), fields(model = %self.model, turns = messages.len()))]
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: with_system_prompt(messages),
            max_tokens: MAX_TOKENS,
        };

        let response = self.client.post(COMPLETIONS_URL).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        first_content(completion).ok_or(ChatError::EmptyResponse)
    }
}

/// Prepend the assistant's system prompt to a transcript.
fn with_system_prompt(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage::system(SYSTEM_PROMPT))
        .chain(messages.iter().cloned())
        .collect()
}

fn first_content(completion: CompletionResponse) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_is_prepended() {
        let transcript = vec![ChatMessage {
            role: ChatRole::User,
            content: "Do you ship to Germany?".to_string(),
        }];
        let messages = with_system_prompt(&transcript);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages.first().unwrap().role, ChatRole::System);
        assert_eq!(messages.get(1).unwrap(), transcript.first().unwrap());
    }

    #[test]
    fn test_request_serialization() {
        let body = CompletionRequest {
            model: "moonshotai/kimi-k2",
            messages: vec![ChatMessage::system("hi")],
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "moonshotai/kimi-k2");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_first_content() {
        let completion: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(completion).as_deref(), Some("Hello!"));

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_content(empty).is_none());

        let blank: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(first_content(blank).is_none());
    }

    #[test]
    fn test_role_deserialization() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"Hi"}"#).unwrap();
        assert_eq!(message.role, ChatRole::Assistant);
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"robot","content":"Hi"}"#).is_err());
    }
}
