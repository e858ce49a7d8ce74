//! Client for OpenAI-compatible chat completion endpoints.
//!
//! Any service that accepts `POST {endpoint}/chat/completions` with the usual
//! `model` / `messages` / `temperature` / `max_tokens` body works (OpenAI,
//! Azure OpenAI behind a gateway, Ollama, vLLM, ...).

use crate::error::{LlmError, Result};
use crate::prompts;
use crate::traits::{parse_boolean, ChatCompletion};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling settings for one completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    /// Yes/no classification
    pub const CLASSIFY: Self = Self {
        temperature: 0.0,
        max_tokens: 10,
    };
    /// Name extraction
    pub const EXTRACT: Self = Self {
        temperature: 0.0,
        max_tokens: 100,
    };
    /// Final answer
    pub const ANSWER: Self = Self {
        temperature: 0.7,
        max_tokens: 500,
    };
    /// Abstractive summary
    pub const SUMMARY: Self = Self {
        temperature: 0.0,
        max_tokens: 600,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

/// HTTP chat client.
///
/// Cheap to clone: the underlying reqwest `Client` is reference counted.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL, e.g. `https://api.openai.com/v1`
    /// * `model` - Model or deployment name
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Run one completion and return the trimmed text of the first choice
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion failed with HTTP {}: {}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        extract_content(&text)
    }

    async fn ask(&self, system: &str, user: &str, params: CompletionParams) -> Result<String> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        self.complete(&messages, params).await
    }
}

/// Pull the first choice's text out of a raw response body
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Service(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    #[instrument(skip_all)]
    async fn classify_boolean(&self, system_prompt: &str, user_prompt: &str) -> Result<bool> {
        let raw = self
            .ask(system_prompt, user_prompt, CompletionParams::CLASSIFY)
            .await?;
        debug!("Classifier replied {:?}", raw);
        parse_boolean(&raw)
    }

    #[instrument(skip_all)]
    async fn extract_names(&self, prompt: &str) -> Result<String> {
        // An empty reply is a legitimate "no movie mentioned"
        match self
            .ask(prompts::NAME_EXTRACTION_SYSTEM, prompt, CompletionParams::EXTRACT)
            .await
        {
            Ok(names) => Ok(names),
            Err(LlmError::EmptyResponse) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, fields(context_len = context.len()))]
    async fn generate_answer(&self, query: &str, context: &str) -> Result<String> {
        self.ask(&prompts::answer_system(context), query, CompletionParams::ANSWER)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  true \n"}},
                                   {"message":{"role":"assistant","content":"false"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "true");
    }

    #[test]
    fn test_extract_content_empty_or_missing() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content("not json"),
            Err(LlmError::Service(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: CompletionParams::CLASSIFY.temperature,
            max_tokens: CompletionParams::CLASSIFY.max_tokens,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 10);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = OpenAiChatClient::new("http://localhost:11434/v1/", "llama3").unwrap();
        assert_eq!(
            client.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
