//! HTTP object-gateway asset store.

use super::{AssetStore, CopyReport, StoreError, rekey, validate_key};
use crate::debug;
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;

/// Talks to a remote object gateway over plain HTTP.
///
/// The gateway contract is small: `PUT {endpoint}/{key}` stores a body,
/// `GET {endpoint}/{key}` returns it, and `GET {endpoint}/?prefix=` lists
/// matching keys as a JSON string array. An optional bearer token is sent
/// on every request.
pub struct RemoteStore {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(endpoint: String, token: Option<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| StoreError::Transport {
                key: endpoint.clone(),
                reason: format!("http client: {err}"),
            })?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn object_url(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.endpoint, encoded)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn transport_err(key: &str, err: reqwest::Error) -> StoreError {
        StoreError::Transport {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for RemoteStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        validate_key(key)?;
        let resp = self
            .authorize(self.client.put(self.object_url(key)))
            .body(data)
            .send()
            .await
            .map_err(|err| Self::transport_err(key, err))?;

        if !resp.status().is_success() {
            return Err(StoreError::Gateway {
                key: key.to_string(),
                status: resp.status().as_u16(),
            });
        }
        debug!("store"; "gateway accepted {}", key);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        validate_key(key)?;
        let resp = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|err| Self::transport_err(key, err))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(StoreError::Missing(key.to_string())),
            status if !status.is_success() => Err(StoreError::Gateway {
                key: key.to_string(),
                status: status.as_u16(),
            }),
            _ => resp
                .bytes()
                .await
                .map_err(|err| Self::transport_err(key, err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let resp = self
            .authorize(self.client.get(format!("{}/", self.endpoint)))
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|err| Self::transport_err(prefix, err))?;

        if !resp.status().is_success() {
            return Err(StoreError::Gateway {
                key: prefix.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|err| Self::transport_err(prefix, err))?;
        let mut keys: Vec<String> =
            serde_json::from_slice(&body).map_err(|err| StoreError::Transport {
                key: prefix.to_string(),
                reason: format!("malformed listing: {err}"),
            })?;
        keys.sort();
        Ok(keys)
    }

    async fn copy(&self, src_prefix: &str, dst_prefix: &str) -> Result<CopyReport, StoreError> {
        let mut report = CopyReport::default();

        // The gateway has no server-side copy, so each object makes a
        // round trip through this process.
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

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let store = RemoteStore::new("http://gateway.test/assets/".into(), None).unwrap();
        assert_eq!(
            store.object_url("asset-1a2b.png"),
            "http://gateway.test/assets/asset%2D1a2b%2Epng"
        );
    }

    #[test]
    fn test_object_url_keeps_segments() {
        let store = RemoteStore::new("http://gateway.test".into(), None).unwrap();
        let url = store.object_url("batch/cover.png");
        assert!(url.starts_with("http://gateway.test/"));
        assert_eq!(url.matches('/').count(), 4);
    }
}
