//! # imgtrans
//!
//! Extract text from an image with a Vision Language Model, translate it, and
//! export the original/translated pair.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image file
//!  │
//!  ├─ 1. Encode     read bytes → base64 data URL, enforce the 4 MiB ceiling
//!  ├─ 2. Extract    multimodal chat request (instruction + image), temp 0.1
//!  ├─ 3. Translate  text-only chat request into en / zh / ja / ko, temp 0.3
//!  └─ 4. Export     "原文：…\n\n译文：…" as translation.txt or translation.md
//! ```
//!
//! Steps 2 and 3 are coordinated by an explicit state machine
//! ([`PipelineState`]) that allows exactly one request in flight at a time.
//! Steps 2 and 3 talk to any OpenAI-compatible chat-completions endpoint;
//! the default is Groq.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgtrans::{ClientConfig, FileCredentialStore, InferenceClient, Session, TargetLanguage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileCredentialStore::open_default()?);
//!     let client = InferenceClient::new(ClientConfig::default())?;
//!     let mut session = Session::new(store, client).await;
//!
//!     session.select_image_file("receipt.jpg").await;
//!     session.select_target_language(TargetLanguage::En);
//!     if session.extract().await && session.translate().await {
//!         println!("{}", session.state().translated_text());
//!     } else if let Some(err) = session.state().error() {
//!         eprintln!("{err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgtrans` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credential;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, TargetLanguage};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ImgTransError;
pub use export::{ExportDocument, ExportFormat};
pub use pipeline::encode::ImagePayload;
pub use pipeline::llm::{ChatRequest, ChatTransport, HttpTransport, InferenceClient};
pub use session::Session;
pub use state::{Phase, PipelineState};
