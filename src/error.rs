//! Error types for the imgtrans library.
//!
//! A single error type, [`ImgTransError`], covers every failure the pipeline
//! can hit. The variants fall into three groups:
//!
//! * **Local preconditions**: [`ImgTransError::MissingCredential`],
//!   [`ImgTransError::MissingInput`], [`ImgTransError::Busy`] and
//!   [`ImgTransError::PayloadTooLarge`]. These are detected before any network
//!   call is attempted.
//!
//! * **Remote failures**: [`ImgTransError::Http`], [`ImgTransError::Parse`]
//!   and [`ImgTransError::Transport`]. Only possible after a round-trip to the
//!   inference endpoint.
//!
//! * **Local I/O**: reading the image, the credential file, or writing an
//!   export.
//!
//! The session's action handlers never propagate these: they are rendered via
//! `Display` into the pipeline state's error field, so every message below is
//! written for an end user rather than a developer.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the imgtrans library.
#[derive(Debug, Error)]
pub enum ImgTransError {
    // ── Precondition errors ───────────────────────────────────────────────
    /// No API key has been saved yet.
    #[error("No API key configured.\nSave one first with: imgtrans key set <KEY>")]
    MissingCredential,

    /// A required input (image, extracted text, target language) is absent.
    #[error("Missing input: {what}")]
    MissingInput { what: &'static str },

    /// Another extraction or translation is still in flight.
    #[error("Another request is still in progress; wait for it to finish")]
    Busy,

    /// The decoded image exceeds the upload ceiling.
    #[error("Image is {size} bytes, which exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The image could not be read or its base64 form could not be decoded.
    #[error("Failed to read image: {detail}")]
    Encoding { detail: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The endpoint answered with a non-success status code.
    #[error("API request failed: HTTP {status}")]
    Http { status: u16 },

    /// The response body did not contain `choices[0].message.content`.
    #[error("Unexpected API response: {detail}")]
    Parse { detail: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("Could not reach the inference endpoint: {detail}")]
    Transport { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The credential file could not be read, parsed or written.
    #[error("Credential store '{path}' failed: {detail}")]
    CredentialStoreFailed { path: PathBuf, detail: String },

    /// Could not create or write the export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-supplied value was rejected (e.g. an empty API key).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ImgTransError {
    /// True for errors raised before any network call was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ImgTransError::MissingCredential
                | ImgTransError::MissingInput { .. }
                | ImgTransError::Busy
                | ImgTransError::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_carries_status() {
        let e = ImgTransError::Http { status: 401 };
        assert!(e.to_string().contains("401"), "got: {e}");
    }

    #[test]
    fn payload_too_large_display() {
        let e = ImgTransError::PayloadTooLarge {
            size: 5_000_000,
            limit: 4_194_304,
        };
        let msg = e.to_string();
        assert!(msg.contains("5000000"));
        assert!(msg.contains("4194304"));
    }

    #[test]
    fn missing_input_names_what() {
        let e = ImgTransError::MissingInput { what: "image" };
        assert_eq!(e.to_string(), "Missing input: image");
    }

    #[test]
    fn precondition_classification() {
        assert!(ImgTransError::MissingCredential.is_precondition());
        assert!(ImgTransError::Busy.is_precondition());
        assert!(!ImgTransError::Http { status: 500 }.is_precondition());
        assert!(!ImgTransError::Parse {
            detail: "x".into()
        }
        .is_precondition());
    }
}
