//! Browser storage state in the Playwright `storage_state.json` layout.
//!
//! CI runs receive a base64 copy of this file captured from a logged-in
//! desktop browser. After a headless login the same layout is written back so
//! the file can be reused by later runs.

use crate::error::ScrapeError;
use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Saved cookies and per-origin storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<BrowserCookie>,
    /// Local storage per origin. Carried through untouched.
    #[serde(default)]
    pub origins: Vec<serde_json::Value>,
}

/// One browser cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
    /// Unix seconds; `-1` for a session cookie.
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn root_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl BrowserCookie {
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: root_path(),
            expires: session_expiry(),
            http_only: false,
            secure: false,
            same_site: None,
        }
    }
}

impl StorageState {
    /// Parse a storage-state document.
    pub fn from_slice(data: &[u8]) -> Result<Self, ScrapeError> {
        serde_json::from_slice(data).map_err(|e| ScrapeError::StorageState(e.to_string()))
    }

    /// Read a storage-state file.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::from_slice(&data)?)
    }

    /// Write the state as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Decode the base64 secret into raw storage-state bytes.
pub fn decode_b64(b64: &str) -> Result<Vec<u8>, ScrapeError> {
    base64::engine::general_purpose::STANDARD
        .decode(b64.trim().as_bytes())
        .map_err(|e| ScrapeError::StorageState(format!("bad base64: {e}")))
}

/// Decode `b64`, write the bytes verbatim to `path`, and parse them.
pub fn write_from_b64(path: &Path, b64: &str) -> Result<StorageState> {
    let data = decode_b64(b64)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
    info!(
        "wrote storage state to {} from UNIT_HISTORY_STORAGE_STATE_B64",
        path.display()
    );
    Ok(StorageState::from_slice(&data)?)
}
