//! Asset upload pipeline.
//!
//! Takes the decoded parts of one multipart submission, derives a
//! deterministic stored name per binary part (slug + content hash +
//! MIME-resolved extension) and writes all of them through the asset
//! store concurrently. A submission either lands completely or not at
//! all: any failed write rejects the batch.

mod part;
mod response;

pub use part::{AssetPart, ClassifiedParts, FormPart, MARKUP_FIELD, classify};
pub use response::render;

use crate::error::ServiceError;
use crate::store::{AssetStore, StoreError};
use crate::utils::{hash, mime, slug};
use crate::{debug, log};
use bytes::Bytes;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;

// =============================================================================
// Options
// =============================================================================

/// Response shape selector, from the `formatter` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formatter {
    /// Single-file-widget shape `{ "files": [storedName] }`.
    Editor,
    /// Grouped shape `{ "assets": {...}, "markup"?: s, ...fields }`.
    #[default]
    Groups,
}

/// Per-request upload options.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Stored-name prefix, slugged on entry.
    pub prefix: String,
    pub formatter: Formatter,
}

impl UploadOptions {
    pub fn new(prefix: Option<&str>, formatter: Formatter) -> Self {
        let prefix = prefix
            .map(slug::slug)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "asset".to_string());
        Self { prefix, formatter }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::new(None, Formatter::default())
    }
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of one fully-successful submission.
#[derive(Debug, Default)]
pub struct UploadResult {
    /// Normalized extension-free original name → stored name, in part
    /// order. Duplicate originals keep the later entry when rendered.
    pub assets: Vec<(String, String)>,
    /// Stored names in part order (first entry drives the editor shape).
    pub stored: Vec<String>,
    /// Value of the reserved `markup` field, if the client sent one.
    pub markup: Option<String>,
    /// Extra text fields, merged into the groups response shape.
    pub fields: Vec<(String, String)>,
}

// =============================================================================
// Pipeline
// =============================================================================

struct PlannedWrite {
    key: String,
    data: Bytes,
}

/// Run the upload pipeline for one submission.
///
/// Naming happens up front so an unknown content type rejects the batch
/// before anything is written. All remaining writes are spawned at once
/// and joined; the result is only computed after every write settled, and
/// the first failure rejects the whole submission.
pub async fn run(
    parts: Vec<FormPart>,
    options: &UploadOptions,
    store: Arc<dyn AssetStore>,
) -> Result<UploadResult, ServiceError> {
    let classified = classify(parts);
    let mut result = UploadResult {
        markup: classified.markup,
        fields: classified.fields,
        ..UploadResult::default()
    };

    // Derive every stored name first; writes dedup on identical content.
    let mut writes: Vec<PlannedWrite> = Vec::with_capacity(classified.assets.len());
    let mut planned_keys = FxHashSet::default();
    for asset in classified.assets {
        let base = slug::slug(slug::stem(&asset.original_name));
        if base.is_empty() {
            log!("warning"; "skipping `{}`: empty name after normalization", asset.original_name);
            continue;
        }

        let ext = mime::extension_for(&asset.content_type)
            .ok_or_else(|| ServiceError::UnknownMimeType(asset.content_type.clone()))?;
        let stored = slug::stored_name(&options.prefix, &hash::fingerprint(&asset.data), ext);

        result.assets.push((base, stored.clone()));
        result.stored.push(stored.clone());
        if planned_keys.insert(stored.clone()) {
            writes.push(PlannedWrite {
                key: stored,
                data: asset.data,
            });
        }
    }

    let write_count = writes.len();
    let mut tasks = JoinSet::new();
    for write in writes {
        let store = store.clone();
        tasks.spawn(async move {
            store
                .put(&write.key, write.data)
                .await
                .map_err(|err| (write.key, err))
        });
    }

    // Join-all: every write settles before the outcome is decided.
    let mut first_error: Option<StoreError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err((key, err))) => {
                log!("error"; "write failed for `{}`: {}", key, err);
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                first_error.get_or_insert(StoreError::io(
                    "<upload task>",
                    std::io::Error::other(join_err),
                ));
            }
        }
    }

    if let Some(err) = first_error {
        return Err(ServiceError::UploadFailed(err));
    }

    debug!("upload"; "stored {} object(s) under prefix `{}`", write_count, options.prefix);
    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::utils::hash;

    fn opts() -> UploadOptions {
        UploadOptions::default()
    }

    #[tokio::test]
    async fn test_upload_stores_and_maps() {
        let store = Arc::new(MemoryStore::new());
        let parts = vec![
            FormPart::file("a", "Hero Image.png", "image/png", &b"hero"[..]),
            FormPart::file("b", "footer.jpg", "image/jpeg", &b"footer"[..]),
        ];

        let result = run(parts, &opts(), store.clone()).await.unwrap();

        assert_eq!(result.assets.len(), 2);
        assert_eq!(result.assets[0].0, "hero-image");
        assert_eq!(result.assets[1].0, "footer");

        let expected = format!("asset-{}.png", hash::fingerprint(b"hero"));
        assert_eq!(result.assets[0].1, expected);
        assert!(store.contains(&expected));
        assert_eq!(store.object_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_dedups_identical_content() {
        let store = Arc::new(MemoryStore::new());
        let parts = vec![
            FormPart::file("a", "one.png", "image/png", &b"same-bytes"[..]),
            FormPart::file("b", "two.png", "image/png", &b"same-bytes"[..]),
        ];

        let result = run(parts, &opts(), store.clone()).await.unwrap();

        // Two map entries, one stored object.
        assert_eq!(result.assets.len(), 2);
        assert_eq!(result.assets[0].1, result.assets[1].1);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_custom_prefix_is_slugged() {
        let store = Arc::new(MemoryStore::new());
        let options = UploadOptions::new(Some("Spring Sale!"), Formatter::Groups);
        assert_eq!(options.prefix, "spring-sale");

        let parts = vec![FormPart::file("f", "x.gif", "image/gif", &b"g"[..])];
        let result = run(parts, &options, store.clone()).await.unwrap();
        assert!(result.stored[0].starts_with("spring-sale-"));
    }

    #[tokio::test]
    async fn test_upload_unknown_mime_rejects_submission() {
        let store = Arc::new(MemoryStore::new());
        let parts = vec![
            FormPart::file("ok", "a.png", "image/png", &b"a"[..]),
            FormPart::file("bad", "b.xyz", "application/x-unknown", &b"b"[..]),
        ];

        let err = run(parts, &opts(), store.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownMimeType(_)));
        // Naming precedes writing, so nothing was stored.
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_empty_slug_skipped_non_fatal() {
        let store = Arc::new(MemoryStore::new());
        let parts = vec![
            FormPart::file("odd", "???.png", "image/png", &b"q"[..]),
            FormPart::file("ok", "fine.png", "image/png", &b"f"[..]),
        ];

        let result = run(parts, &opts(), store.clone()).await.unwrap();
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].0, "fine");
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_one_failing_write_rejects_all() {
        // Fail exactly the write for content "bbb".
        let failing_key = format!("asset-{}.png", hash::fingerprint(b"bbb"));
        let store = Arc::new(MemoryStore::failing_puts(&[failing_key.as_str()]));

        let parts = vec![
            FormPart::file("a", "a.png", "image/png", &b"aaa"[..]),
            FormPart::file("b", "b.png", "image/png", &b"bbb"[..]),
            FormPart::file("c", "c.png", "image/png", &b"ccc"[..]),
        ];

        let err = run(parts, &opts(), store.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_upload_markup_and_fields_pass_through() {
        let store = Arc::new(MemoryStore::new());
        let parts = vec![
            FormPart::text(MARKUP_FIELD, "<table></table>"),
            FormPart::text("campaign", "summer"),
        ];

        let result = run(parts, &opts(), store.clone()).await.unwrap();
        assert_eq!(result.markup.as_deref(), Some("<table></table>"));
        assert_eq!(result.fields, vec![("campaign".into(), "summer".into())]);
        assert_eq!(store.object_count(), 0);
    }
}
