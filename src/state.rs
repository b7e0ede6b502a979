//! The pipeline state machine.
//!
//! [`PipelineState`] is the single record the front end renders. It is an
//! explicit value: every transition is a method on it, so transitions can be
//! unit-tested without a network, a runtime, or a UI.
//!
//! ## Phases
//!
//! ```text
//!            begin_extract            finish_extract
//!   Idle ─────────────────▶ ExtractingText ─────────▶ Idle
//!     │
//!     │      begin_translate          finish_translate
//!     └───────────────────▶ Translating ────────────▶ Idle
//! ```
//!
//! The busy flag is simply "phase != Idle". `begin_*` is a synchronous,
//! non-reentrant guard: calling it while any request is in flight fails with
//! [`ImgTransError::Busy`]. A failed precondition changes nothing but the
//! error field.
//!
//! ## Failure asymmetry
//!
//! A failed extraction empties the extracted text. A failed translation keeps
//! whatever translation was there before. Both record the error.

use crate::config::TargetLanguage;
use crate::error::ImgTransError;
use crate::pipeline::encode::ImagePayload;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Which request, if any, is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    ExtractingText,
    Translating,
}

/// Everything an extraction request needs, captured at `begin_extract`.
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub image: Arc<ImagePayload>,
    pub api_key: String,
}

/// Everything a translation request needs, captured at `begin_translate`.
#[derive(Debug, Clone)]
pub struct TranslateJob {
    pub text: String,
    pub target: TargetLanguage,
    pub api_key: String,
}

/// The mutable record driving the front end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    #[serde(serialize_with = "serialize_image_name")]
    image: Option<Arc<ImagePayload>>,
    extracted_text: String,
    translated_text: String,
    target_language: Option<TargetLanguage>,
    phase: Phase,
    error: Option<String>,
}

fn serialize_image_name<S: serde::Serializer>(
    image: &Option<Arc<ImagePayload>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match image {
        Some(img) => s.serialize_some(&img.name),
        None => s.serialize_none(),
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_deref()
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    pub fn target_language(&self) -> Option<TargetLanguage> {
        self.target_language
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the extract trigger should be enabled. Front ends use the
    /// `can_*` gates to enable controls; the `begin_*` transitions enforce
    /// the same conditions regardless.
    pub fn can_extract(&self, has_credential: bool) -> bool {
        !self.is_busy() && has_credential && self.image.is_some()
    }

    /// Whether the translate trigger should be enabled.
    pub fn can_translate(&self, has_credential: bool) -> bool {
        !self.is_busy()
            && has_credential
            && !self.extracted_text.is_empty()
            && self.target_language.is_some()
    }

    /// Whether the export menu should be enabled.
    pub fn can_export(&self) -> bool {
        !self.translated_text.is_empty()
    }

    // ── Transitions ────────────────────────────────────────────────────────

    /// Replace the selected image. Derived text and the error are cleared.
    pub fn select_image(&mut self, image: ImagePayload) -> Result<(), ImgTransError> {
        if self.is_busy() {
            return self.reject(ImgTransError::Busy);
        }
        self.image = Some(Arc::new(image));
        self.extracted_text.clear();
        self.translated_text.clear();
        self.error = None;
        Ok(())
    }

    /// Choose the translation target. Allowed at any time.
    pub fn select_target_language(&mut self, target: TargetLanguage) {
        self.target_language = Some(target);
    }

    /// Record an error raised outside a transition (e.g. an unreadable file).
    pub fn record_error(&mut self, error: &ImgTransError) {
        self.error = Some(error.to_string());
    }

    /// Enter `ExtractingText` if the preconditions hold.
    ///
    /// Entering the phase also clears the previous translation and error:
    /// a new extraction invalidates them whatever its outcome.
    pub fn begin_extract(&mut self, api_key: Option<&str>) -> Result<ExtractJob, ImgTransError> {
        if self.is_busy() {
            return self.reject(ImgTransError::Busy);
        }
        let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
            return self.reject(ImgTransError::MissingCredential);
        };
        let Some(image) = self.image.clone() else {
            return self.reject(ImgTransError::MissingInput { what: "image" });
        };

        self.phase = Phase::ExtractingText;
        self.translated_text.clear();
        self.error = None;
        Ok(ExtractJob {
            image,
            api_key: api_key.to_string(),
        })
    }

    /// Apply the outcome of an extraction and return to `Idle`.
    pub fn finish_extract(&mut self, result: Result<String, ImgTransError>) {
        if self.phase != Phase::ExtractingText {
            warn!("finish_extract called in phase {:?}; ignoring", self.phase);
            return;
        }
        self.phase = Phase::Idle;
        match result {
            Ok(text) => {
                self.extracted_text = text;
                self.translated_text.clear();
                self.error = None;
            }
            Err(e) => {
                self.extracted_text.clear();
                self.error = Some(e.to_string());
            }
        }
    }

    /// Enter `Translating` if the preconditions hold.
    pub fn begin_translate(
        &mut self,
        api_key: Option<&str>,
    ) -> Result<TranslateJob, ImgTransError> {
        if self.is_busy() {
            return self.reject(ImgTransError::Busy);
        }
        let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
            return self.reject(ImgTransError::MissingCredential);
        };
        if self.extracted_text.is_empty() {
            return self.reject(ImgTransError::MissingInput {
                what: "extracted text",
            });
        }
        let Some(target) = self.target_language else {
            return self.reject(ImgTransError::MissingInput {
                what: "target language",
            });
        };

        self.phase = Phase::Translating;
        Ok(TranslateJob {
            text: self.extracted_text.clone(),
            target,
            api_key: api_key.to_string(),
        })
    }

    /// Apply the outcome of a translation and return to `Idle`.
    ///
    /// On failure the previous translation is kept.
    pub fn finish_translate(&mut self, result: Result<String, ImgTransError>) {
        if self.phase != Phase::Translating {
            warn!("finish_translate called in phase {:?}; ignoring", self.phase);
            return;
        }
        self.phase = Phase::Idle;
        match result {
            Ok(text) => {
                self.translated_text = text;
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
    }

    fn reject<T>(&mut self, error: ImgTransError) -> Result<T, ImgTransError> {
        self.error = Some(error.to_string());
        Err(error)
    }
}
