//! In-memory store used by pipeline tests.

use super::{AssetStore, CopyReport, StoreError, rekey, validate_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Map-backed store with per-key failure injection.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_put_keys: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any `put` whose key starts with one of these prefixes fails.
    pub fn failing_puts(prefixes: &[&str]) -> Self {
        Self {
            objects: Mutex::default(),
            fail_put_keys: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        validate_key(key)?;
        if self.fail_put_keys.iter().any(|p| key.starts_with(p)) {
            return Err(StoreError::io(
                key,
                std::io::Error::other("injected write failure"),
            ));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        validate_key(key)?;
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Missing(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn copy(&self, src_prefix: &str, dst_prefix: &str) -> Result<CopyReport, StoreError> {
        let mut report = CopyReport::default();
        for key in self.list(src_prefix).await? {
            let target = rekey(&key, src_prefix, dst_prefix);
            let outcome = async {
                let data = self.read(&key).await?;
                self.put(&target, data).await
            }
            .await;
            match outcome {
                Ok(()) => report.copied.push(target),
                Err(err) => report.failed.push((target, err.to_string())),
            }
        }
        report.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_reports_partial_failure() {
        let store = MemoryStore::failing_puts(&["dst-bb"]);
        store.put("src-aa.png", Bytes::from_static(b"a")).await.unwrap();
        store.put("src-bb.png", Bytes::from_static(b"b")).await.unwrap();

        let err = store.copy("src", "dst").await.unwrap_err();
        let StoreError::CopyIncomplete { report } = err else {
            panic!("expected CopyIncomplete");
        };
        assert_eq!(report.copied, vec!["dst-aa.png"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "dst-bb.png");
        // The object that copied cleanly really exists.
        assert!(store.contains("dst-aa.png"));
        assert!(!store.contains("dst-bb.png"));
    }
}
