//! Asset storage backends.
//!
//! Everything the service persists goes through the [`AssetStore`] trait so
//! the pipelines never know whether bytes land on the local filesystem or
//! behind an HTTP object gateway. Backend selection happens once at startup
//! from `[storage]` config.

mod local;
#[cfg(test)]
pub mod memory;
mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key `{0}`")]
    InvalidKey(String),

    #[error("object `{0}` not found")]
    Missing(String),

    #[error("gateway returned status {status} for `{key}`")]
    Gateway { key: String, status: u16 },

    #[error("gateway request for `{key}` failed: {reason}")]
    Transport { key: String, reason: String },

    #[error(
        "copy incomplete: {} of {} objects failed",
        .report.failed.len(),
        .report.total()
    )]
    CopyIncomplete { report: CopyReport },
}

impl StoreError {
    pub(crate) fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}

// =============================================================================
// Copy Reporting
// =============================================================================

/// Outcome of a prefix copy. Every object under the source prefix is
/// attempted; the report keeps the keys that made it and, per failed key,
/// the reason it did not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub copied: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl CopyReport {
    pub fn total(&self) -> usize {
        self.copied.len() + self.failed.len()
    }

    /// Collapse into a result so partial success cannot pass for total
    /// success further up the stack.
    pub fn into_result(self) -> Result<CopyReport, StoreError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(StoreError::CopyIncomplete { report: self })
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Uniform interface over asset storage backends.
///
/// Keys are flat, forward-slash separated relative paths. `list` and `copy`
/// take a key prefix in the plain string sense, so `mailing-7` matches
/// `mailing-7-abc.png`.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist an object under `key`, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Read an object back. Missing keys yield [`StoreError::Missing`].
    async fn read(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Keys starting with `prefix`, sorted. Empty prefix lists everything.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Duplicate every object under `src_prefix` to the same relative key
    /// under `dst_prefix`. All objects are attempted even when some fail;
    /// any failure turns the report into [`StoreError::CopyIncomplete`].
    async fn copy(&self, src_prefix: &str, dst_prefix: &str) -> Result<CopyReport, StoreError>;
}

/// Build the backend selected by `[storage]` config.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn AssetStore>, StoreError> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(config.root.clone()))),
        StorageBackend::Remote => Ok(Arc::new(RemoteStore::new(
            config.endpoint.clone(),
            config.token.clone(),
        )?)),
    }
}

// =============================================================================
// Key Validation
// =============================================================================

/// Reject keys that could escape the storage root or smuggle in platform
/// path separators. Accepts flat names and forward-slash subpaths.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains("..")
        || key.split('/').any(|part| part.is_empty());

    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Relative key of `key` under `dst_prefix`, given it starts with
/// `src_prefix`. Plain string splice, no path semantics.
pub(crate) fn rekey(key: &str, src_prefix: &str, dst_prefix: &str) -> String {
    let rest = key.strip_prefix(src_prefix).unwrap_or(key);
    format!("{dst_prefix}{rest}")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_flat_and_nested() {
        assert!(validate_key("asset-1a2b3c.png").is_ok());
        assert!(validate_key("mailing-7/cover.jpg").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_escapes() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("../secret").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("trailing/").is_err());
    }

    #[test]
    fn test_rekey_splices_prefix() {
        assert_eq!(
            rekey("mailing-7-abc.png", "mailing-7", "mailing-9"),
            "mailing-9-abc.png"
        );
        assert_eq!(rekey("batch/x.png", "batch", "copy"), "copy/x.png");
    }

    #[test]
    fn test_copy_report_result() {
        let clean = CopyReport {
            copied: vec!["a".into()],
            failed: vec![],
        };
        assert!(clean.into_result().is_ok());

        let partial = CopyReport {
            copied: vec!["a".into()],
            failed: vec![("b".into(), "io".into())],
        };
        let err = partial.into_result().unwrap_err();
        assert!(matches!(err, StoreError::CopyIncomplete { .. }));
        assert!(err.to_string().contains("1 of 2"));
    }
}
