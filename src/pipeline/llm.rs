//! Inference client: frame chat-completion requests and read the answer.
//!
//! Extraction and translation hit the same endpoint with the same transport
//! shape (a single `POST` with a JSON body and bearer credential) and differ only
//! in message content, temperature and token ceiling. Both public operations
//! are therefore thin policy wrappers over [`InferenceClient::send`], which is
//! the only place a [`ChatRequest`] is assembled.
//!
//! The network itself sits behind [`ChatTransport`] so the session can be
//! driven by an in-memory fake in tests. [`HttpTransport`] is the `reqwest`
//! implementation used in production.
//!
//! There is no retry: a failed attempt is terminal for that user action.

use crate::config::{ClientConfig, TargetLanguage};
use crate::error::ImgTransError;
use crate::pipeline::encode::ImagePayload;
use crate::pipeline::postprocess::clean_response;
use crate::prompts::{translate_prompt, EXTRACT_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── Wire types ───────────────────────────────────────────────────────────

/// Request body: `{model, messages, temperature, max_tokens}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Either a plain string or an array of typed parts (multimodal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a response body.
pub fn parse_response(body: &str) -> Result<String, ImgTransError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| ImgTransError::Parse {
        detail: format!("response is not valid JSON: {e}"),
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| ImgTransError::Parse {
            detail: "missing choices[0].message.content".to_string(),
        })
}

// ── Transport ────────────────────────────────────────────────────────────

/// Sends one chat-completion request and returns the message content.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest, api_key: &str)
        -> Result<String, ImgTransError>;
}

/// `reqwest`-backed transport for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ImgTransError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ImgTransError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat(
        &self,
        request: &ChatRequest,
        api_key: &str,
    ) -> Result<String, ImgTransError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ImgTransError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImgTransError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| ImgTransError::Transport {
            detail: e.to_string(),
        })?;
        parse_response(&body)
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Extraction and translation over a shared [`ChatTransport`].
#[derive(Clone)]
pub struct InferenceClient {
    transport: Arc<dyn ChatTransport>,
    config: ClientConfig,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("transport", &"<dyn ChatTransport>")
            .field("config", &self.config)
            .finish()
    }
}

impl InferenceClient {
    /// Client talking HTTP to `config.endpoint`.
    pub fn new(config: ClientConfig) -> Result<Self, ImgTransError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transcribe all text in `image`.
    ///
    /// The size ceiling is checked first; an oversized image fails with
    /// [`ImgTransError::PayloadTooLarge`] without touching the transport.
    pub async fn extract_text(
        &self,
        image: &ImagePayload,
        api_key: &str,
    ) -> Result<String, ImgTransError> {
        let size = image.ensure_within_limit(self.config.max_image_bytes)?;
        info!("Extracting text from '{}' ({} bytes)", image.name, size);

        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: EXTRACT_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ]);
        self.send(
            content,
            self.config.extract_temperature,
            self.config.extract_max_tokens,
            api_key,
        )
        .await
    }

    /// Translate `text` into `target`.
    pub async fn translate(
        &self,
        text: &str,
        target: TargetLanguage,
        api_key: &str,
    ) -> Result<String, ImgTransError> {
        info!("Translating {} chars into {}", text.chars().count(), target);
        let content = MessageContent::Text(translate_prompt(target, text));
        self.send(
            content,
            self.config.translate_temperature,
            self.config.translate_max_tokens,
            api_key,
        )
        .await
    }

    /// Build a single-turn request for `content`.
    pub fn build_request(
        &self,
        content: MessageContent,
        temperature: f32,
        max_tokens: u32,
    ) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(content)],
            temperature,
            max_tokens,
        }
    }

    /// Send one request and return the (optionally cleaned) answer.
    pub async fn send(
        &self,
        content: MessageContent,
        temperature: f32,
        max_tokens: u32,
        api_key: &str,
    ) -> Result<String, ImgTransError> {
        let request = self.build_request(content, temperature, max_tokens);
        let start = Instant::now();

        match self.transport.send_chat(&request, api_key).await {
            Ok(text) => {
                debug!(
                    "Chat request: {} chars back in {:?}",
                    text.len(),
                    start.elapsed()
                );
                if self.config.clean_output {
                    Ok(clean_response(&text))
                } else {
                    Ok(text)
                }
            }
            Err(e) => {
                warn!("Chat request failed after {:?}: {}", start.elapsed(), e);
                Err(e)
            }
        }
    }
}
