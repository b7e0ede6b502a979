//! Configuration types for the extract/translate pipeline.
//!
//! Every knob the inference client needs lives in [`ClientConfig`], built via
//! its [`ClientConfigBuilder`]. The two request kinds deliberately use
//! different sampling settings: extraction runs cold so the model transcribes
//! what it sees, translation runs slightly warmer and with a larger token
//! ceiling because translated text may expand.

use crate::error::ImgTransError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default OpenAI-compatible chat-completions endpoint (Groq).
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default vision-capable model served by the default endpoint.
pub const DEFAULT_MODEL: &str = "llama-3.2-11b-vision-preview";

/// Upload ceiling for the decoded image: 4 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for the inference client.
///
/// # Example
/// ```rust
/// use imgtrans::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .model("llama-3.2-90b-vision-preview")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.extract_max_tokens, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chat-completions URL. Must be http or https.
    pub endpoint: String,

    /// Model identifier sent in every request body.
    pub model: String,

    /// Sampling temperature for extraction. Default: 0.1.
    pub extract_temperature: f32,

    /// Token ceiling for extraction. Default: 1024.
    pub extract_max_tokens: u32,

    /// Sampling temperature for translation. Default: 0.3.
    pub translate_temperature: f32,

    /// Token ceiling for translation. Default: 2048.
    pub translate_max_tokens: u32,

    /// Maximum decoded image size in bytes. Default: 4 MiB.
    pub max_image_bytes: usize,

    /// Per-request timeout in seconds. `None` keeps the transport default.
    pub api_timeout_secs: Option<u64>,

    /// Run the deterministic response cleanup. Default: false (answers are
    /// kept verbatim).
    pub clean_output: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            extract_temperature: 0.1,
            extract_max_tokens: 1024,
            translate_temperature: 0.3,
            translate_max_tokens: 2048,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            api_timeout_secs: None,
            clean_output: false,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn extract_temperature(mut self, t: f32) -> Self {
        self.config.extract_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn extract_max_tokens(mut self, n: u32) -> Self {
        self.config.extract_max_tokens = n;
        self
    }

    pub fn translate_temperature(mut self, t: f32) -> Self {
        self.config.translate_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn translate_max_tokens(mut self, n: u32) -> Self {
        self.config.translate_max_tokens = n;
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ImgTransError> {
        let c = &self.config;
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(ImgTransError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ImgTransError::InvalidConfig("model must not be empty".into()));
        }
        if c.extract_max_tokens == 0 || c.translate_max_tokens == 0 {
            return Err(ImgTransError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_image_bytes == 0 {
            return Err(ImgTransError::InvalidConfig(
                "max_image_bytes must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ImgTransError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output language for the translation step.
///
/// The label, not the code, is what gets embedded in the translation prompt;
/// the prompt itself is written in Chinese so the labels are too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    En,
    Zh,
    Ja,
    Ko,
}

impl TargetLanguage {
    /// Every selectable language, in menu order.
    pub const ALL: [TargetLanguage; 4] = [
        TargetLanguage::En,
        TargetLanguage::Zh,
        TargetLanguage::Ja,
        TargetLanguage::Ko,
    ];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            TargetLanguage::En => "en",
            TargetLanguage::Zh => "zh",
            TargetLanguage::Ja => "ja",
            TargetLanguage::Ko => "ko",
        }
    }

    /// Display label, as shown in the selector and sent to the model.
    pub fn label(self) -> &'static str {
        match self {
            TargetLanguage::En => "英语",
            TargetLanguage::Zh => "中文",
            TargetLanguage::Ja => "日语",
            TargetLanguage::Ko => "韩语",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = ImgTransError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        TargetLanguage::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| {
                ImgTransError::InvalidInput(format!(
                    "unknown target language '{s}' (expected en, zh, ja or ko)"
                ))
            })
    }
}
