//! Image encoding: raw image bytes → base64 payload for the multimodal request.
//!
//! Chat-completion APIs accept images as base64 data URLs embedded in the
//! JSON body. The bytes are sent as-is (no re-encoding) so the model sees
//! exactly the file the user picked; only the MIME type is sniffed from the
//! magic bytes to label the data URL correctly.
//!
//! The size ceiling is enforced on the *decoded* length of the base64 string,
//! after encoding and before any network call, so an oversized image is never
//! transmitted.

use crate::error::ImgTransError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// MIME type used when the format cannot be sniffed.
const FALLBACK_MIME: &str = "image/jpeg";

/// The currently selected image, as bytes plus its derived base64 form.
#[derive(Clone)]
pub struct ImagePayload {
    /// Display name (file name, or a caller-supplied label).
    pub name: String,
    /// MIME type used in the data URL.
    pub mime_type: &'static str,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Standard base64 encoding of `bytes`.
    pub base64: String,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .field("base64", &self.base64.len())
            .finish()
    }
}

impl ImagePayload {
    /// Read an image file and encode it.
    ///
    /// Fails with [`ImgTransError::Encoding`] if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ImgTransError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ImgTransError::Encoding {
                detail: format!("{}: {}", path.display(), e),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    /// Encode an in-memory image.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let base64 = encode(&bytes);
        let mime_type = sniff_mime(&bytes);
        debug!(
            "Encoded image → {} bytes raw, {} bytes base64 ({})",
            bytes.len(),
            base64.len(),
            mime_type
        );
        Self {
            name: name.into(),
            mime_type,
            bytes,
            base64,
        }
    }

    /// `data:<mime>;base64,<payload>` for the `image_url` content part.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Verify the decoded payload fits within `limit` bytes.
    ///
    /// Returns the decoded size on success.
    pub fn ensure_within_limit(&self, limit: usize) -> Result<usize, ImgTransError> {
        let size = decoded_len(&self.base64)?;
        if size > limit {
            return Err(ImgTransError::PayloadTooLarge { size, limit });
        }
        Ok(size)
    }
}

/// Base64-encode raw bytes with the standard alphabet and padding.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Length in bytes of the data a base64 string decodes to.
pub fn decoded_len(b64: &str) -> Result<usize, ImgTransError> {
    STANDARD
        .decode(b64)
        .map(|d| d.len())
        .map_err(|e| ImgTransError::Encoding {
            detail: format!("invalid base64 payload: {e}"),
        })
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => FALLBACK_MIME,
    }
}
