//! API-key persistence.
//!
//! Exactly one secret is stored, under the fixed key [`CREDENTIAL_KEY`]. The
//! durable store keeps it as a one-entry JSON object in the user's config
//! directory; there is no encryption and no namespacing. A missing key is a
//! normal state, not an error: callers turn it into a precondition failure
//! when an action needs the network.

use crate::error::ImgTransError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Key under which the secret is persisted.
pub const CREDENTIAL_KEY: &str = "GROQ_API_KEY";

/// Storage for the single API key.
///
/// `set` must make the value visible to the next `get` immediately.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>, ImgTransError>;
    async fn set(&self, secret: &str) -> Result<(), ImgTransError>;
}

fn validate(secret: &str) -> Result<(), ImgTransError> {
    if secret.trim().is_empty() {
        return Err(ImgTransError::InvalidInput(
            "API key must not be empty".into(),
        ));
    }
    Ok(())
}

/// Mask a secret for display: keep the first and last four characters.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

// ── File-backed store ─────────────────────────────────────────────────────

/// Durable store: `{"GROQ_API_KEY": "<secret>"}` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/imgtrans/credentials.json`.
    pub fn default_path() -> Result<PathBuf, ImgTransError> {
        dirs::config_dir()
            .map(|d| d.join("imgtrans").join("credentials.json"))
            .ok_or_else(|| {
                ImgTransError::InvalidConfig(
                    "could not determine the user config directory; pass --credentials".into(),
                )
            })
    }

    /// Store at [`Self::default_path`].
    pub fn open_default() -> Result<Self, ImgTransError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failed(&self, detail: impl ToString) -> ImgTransError {
        ImgTransError::CredentialStoreFailed {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<String>, ImgTransError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No credential file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.failed(e)),
        };
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&data).map_err(|e| self.failed(e))?;
        Ok(entries.get(CREDENTIAL_KEY).cloned())
    }

    async fn set(&self, secret: &str) -> Result<(), ImgTransError> {
        validate(secret)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.failed(e))?;
        }
        let mut entries = BTreeMap::new();
        entries.insert(CREDENTIAL_KEY.to_string(), secret.to_string());
        let json = serde_json::to_string_pretty(&entries).map_err(|e| self.failed(e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.failed(e))?;
        info!("Saved API key to {}", self.path.display());
        Ok(())
    }
}

// ── In-memory store ───────────────────────────────────────────────────────

/// Process-lifetime store.
///
/// A poisoned lock still holds a complete `Option<String>` (writes are a
/// single assignment), so it is recovered rather than reported.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    secret: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: RwLock::new(Some(secret.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<String>, ImgTransError> {
        let guard = self.secret.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    async fn set(&self, secret: &str) -> Result<(), ImgTransError> {
        validate(secret)?;
        let mut guard = self.secret.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(secret.to_string());
        Ok(())
    }
}
