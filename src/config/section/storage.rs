//! `[storage]` section configuration.
//!
//! Selects and configures the asset storage backend.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! backend = "local"           # "local" or "remote"
//! root = "storage"            # Object directory (local backend)
//!
//! # Remote object gateway:
//! # backend = "remote"
//! # endpoint = "https://objects.example.com/mailforge"
//! # token = "..."             # Optional bearer token
//! ```
//!
//! `root` accepts `~` and is resolved relative to the config file when
//! relative.

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Asset storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Objects as files under `storage.root`.
    Local,
    /// Objects behind an HTTP gateway at `storage.endpoint`.
    Remote,
}

/// Asset storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend persists uploaded assets.
    pub backend: StorageBackend,

    /// Object directory for the local backend.
    pub root: PathBuf,

    /// Base URL of the remote object gateway.
    pub endpoint: String,

    /// Bearer token sent to the remote gateway.
    pub token: Option<String>,
}

impl StorageConfig {
    pub const F_ROOT: FieldPath = FieldPath::new("storage.root");
    pub const F_ENDPOINT: FieldPath = FieldPath::new("storage.endpoint");
    pub const F_TOKEN: FieldPath = FieldPath::new("storage.token");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match self.backend {
            StorageBackend::Local => {
                if self.root.as_os_str().is_empty() {
                    diag.error(Self::F_ROOT, "must not be empty for the local backend");
                }
                if !self.endpoint.is_empty() {
                    diag.warn(Self::F_ENDPOINT, "ignored by the local backend".to_string());
                }
            }
            StorageBackend::Remote => {
                if self.endpoint.is_empty() {
                    diag.error_with_hint(
                        Self::F_ENDPOINT,
                        "required for the remote backend",
                        "set the gateway base URL, e.g. `https://objects.example.com/mailforge`",
                    );
                } else {
                    match url::Url::parse(&self.endpoint) {
                        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                        Ok(parsed) => diag.error(
                            Self::F_ENDPOINT,
                            format!("unsupported scheme `{}`", parsed.scheme()),
                        ),
                        Err(err) => {
                            diag.error(Self::F_ENDPOINT, format!("not a valid URL: {err}"));
                        }
                    }
                }
                if self.token.as_deref() == Some("") {
                    diag.warn(Self::F_TOKEN, "empty token, omit the field instead".to_string());
                }
            }
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: PathBuf::from("storage"),
            endpoint: String::new(),
            token: None,
        }
    }
}
