//! Action handlers: the glue between user actions and the pipeline.
//!
//! A [`Session`] owns the [`PipelineState`], the credential store and the
//! inference client. Each handler validates preconditions through the state
//! machine, runs the request, and writes the outcome back into the state.
//!
//! Handlers never return errors. Whatever goes wrong ends up as a message in
//! [`PipelineState::error`]; the returned `bool` only tells the caller
//! whether the action succeeded, e.g. to pick an exit status.

use crate::config::TargetLanguage;
use crate::credential::CredentialStore;
use crate::error::ImgTransError;
use crate::export::{self, ExportFormat};
use crate::pipeline::encode::ImagePayload;
use crate::pipeline::llm::InferenceClient;
use crate::state::PipelineState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Session {
    state: PipelineState,
    credentials: Arc<dyn CredentialStore>,
    client: InferenceClient,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("credentials", &"<dyn CredentialStore>")
            .field("client", &self.client)
            .finish()
    }
}

impl Session {
    /// Start a session. A missing credential is reported in the error field
    /// straight away so the front end can prompt for one.
    pub async fn new(credentials: Arc<dyn CredentialStore>, client: InferenceClient) -> Self {
        let mut session = Self {
            state: PipelineState::new(),
            credentials,
            client,
        };
        if session.credential().await.is_none() {
            session.state.record_error(&ImgTransError::MissingCredential);
        }
        session
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Current API key; read errors count as "no key" and are logged.
    pub async fn credential(&self) -> Option<String> {
        match self.credentials.get().await {
            Ok(key) => key.filter(|k| !k.is_empty()),
            Err(e) => {
                warn!("Could not read API key: {}", e);
                None
            }
        }
    }

    /// Whether [`Self::extract`] would get past its preconditions.
    pub async fn can_extract(&self) -> bool {
        let has_key = self.credential().await.is_some();
        self.state.can_extract(has_key)
    }

    /// Whether [`Self::translate`] would get past its preconditions.
    pub async fn can_translate(&self) -> bool {
        let has_key = self.credential().await.is_some();
        self.state.can_translate(has_key)
    }

    /// Persist a new API key.
    pub async fn save_credential(&mut self, secret: &str) -> bool {
        match self.credentials.set(secret).await {
            Ok(()) => true,
            Err(e) => {
                self.state.record_error(&e);
                false
            }
        }
    }

    /// Read and select an image file.
    pub async fn select_image_file(&mut self, path: impl AsRef<Path>) -> bool {
        match ImagePayload::from_path(path).await {
            Ok(image) => self.select_image(image),
            Err(e) => {
                warn!("Image selection failed: {}", e);
                self.state.record_error(&e);
                false
            }
        }
    }

    /// Select an already-loaded image.
    pub fn select_image(&mut self, image: ImagePayload) -> bool {
        let name = image.name.clone();
        match self.state.select_image(image) {
            Ok(()) => {
                info!("Selected image '{}'", name);
                true
            }
            Err(_) => false,
        }
    }

    pub fn select_target_language(&mut self, target: TargetLanguage) {
        self.state.select_target_language(target);
    }

    /// Extract text from the selected image.
    pub async fn extract(&mut self) -> bool {
        let key = self.credential().await;
        let job = match self.state.begin_extract(key.as_deref()) {
            Ok(job) => job,
            Err(e) => {
                warn!("Extract rejected: {}", e);
                return false;
            }
        };

        let result = self.client.extract_text(&job.image, &job.api_key).await;
        let ok = result.is_ok();
        match result {
            Err(ref e) if e.is_precondition() => warn!("Extract rejected: {}", e),
            Err(ref e) => warn!("Extraction failed: {}", e),
            Ok(_) => {}
        }
        self.state.finish_extract(result);
        if ok {
            info!(
                "Extracted {} chars",
                self.state.extracted_text().chars().count()
            );
        }
        ok
    }

    /// Translate the extracted text into the selected language.
    pub async fn translate(&mut self) -> bool {
        let key = self.credential().await;
        let job = match self.state.begin_translate(key.as_deref()) {
            Ok(job) => job,
            Err(e) => {
                warn!("Translate rejected: {}", e);
                return false;
            }
        };

        let result = self
            .client
            .translate(&job.text, job.target, &job.api_key)
            .await;
        let ok = result.is_ok();
        if let Err(ref e) = result {
            warn!("Translation failed: {}", e);
        }
        self.state.finish_translate(result);
        ok
    }

    /// Write the current pair into `dir`. Requires a translation.
    pub async fn export(&mut self, format: ExportFormat, dir: impl AsRef<Path>) -> Option<PathBuf> {
        if !self.state.can_export() {
            self.state.record_error(&ImgTransError::MissingInput {
                what: "translated text",
            });
            return None;
        }
        let doc = export::export(
            self.state.extracted_text(),
            self.state.translated_text(),
            format,
        );
        match doc.write_to_dir(dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Export failed: {}", e);
                self.state.record_error(&e);
                None
            }
        }
    }
}
