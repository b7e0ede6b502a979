//! Export of the original/translated pair.
//!
//! Both formats share one layout:
//!
//! ```text
//! 原文：
//! <extracted text>
//!
//! 译文：
//! <translated text>
//! ```
//!
//! The format only picks the file extension and MIME hint.

use crate::error::ImgTransError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Label preceding the extracted text.
pub const ORIGINAL_LABEL: &str = "原文：";

/// Label preceding the translated text.
pub const TRANSLATED_LABEL: &str = "译文：";

/// Base file name; the extension comes from [`ExportFormat`].
pub const EXPORT_STEM: &str = "translation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Md,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Md => "md",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain;charset=utf-8",
            ExportFormat::Md => "text/markdown;charset=utf-8",
        }
    }

    pub fn file_name(self) -> String {
        format!("{EXPORT_STEM}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A rendered export, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

impl ExportDocument {
    /// Write the document into `dir` (created if missing) and return its path.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ImgTransError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.file_name);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ImgTransError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source,
            })?;
        tokio::fs::write(&path, self.content.as_bytes())
            .await
            .map_err(|source| ImgTransError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;
        info!("Exported {} bytes to {}", self.content.len(), path.display());
        Ok(path)
    }
}

/// Render the two-section content.
pub fn render(extracted: &str, translated: &str) -> String {
    format!("{ORIGINAL_LABEL}\n{extracted}\n\n{TRANSLATED_LABEL}\n{translated}")
}

/// Build the export for the given pair and format.
pub fn export(extracted: &str, translated: &str, format: ExportFormat) -> ExportDocument {
    ExportDocument {
        file_name: format.file_name(),
        mime_type: format.mime_type(),
        content: render(extracted, translated),
    }
}
