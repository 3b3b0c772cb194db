//! Service-level error type shared by the HTTP handlers and pipelines.

use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failure modes of the upload, export and dispatch pipelines.
///
/// Every variant maps onto one HTTP status so handlers can bubble errors
/// with `?` and let the response layer do the translation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or unusable request input.
    #[error("{0}")]
    Validation(String),

    /// A requested object does not exist.
    #[error("`{0}` not found")]
    NotFound(String),

    /// No file extension is known for the declared content type.
    #[error("unsupported content type `{0}`")]
    UnknownMimeType(String),

    /// A storage backend operation failed outside the upload fan-out.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// At least one write of an upload batch failed; the batch is rejected
    /// as a whole and this carries the first failure observed.
    #[error("upload rejected: {0}")]
    UploadFailed(#[source] StoreError),

    /// Building the export archive failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Handing the message to the SMTP transport failed.
    #[error("mail delivery failed: {0}")]
    MailDelivery(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnknownMimeType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Storage(err) => match err {
                StoreError::Missing(_) => StatusCode::NOT_FOUND,
                StoreError::InvalidKey(_) => StatusCode::BAD_REQUEST,
                StoreError::CopyIncomplete { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::UploadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MailDelivery(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<zip::result::ZipError> for ServiceError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Partial copies report exactly what made it across.
        if let Self::Storage(StoreError::CopyIncomplete { report }) = &self {
            let body = json!({
                "error": self.to_string(),
                "copied": report.copied,
                "failed": report.failed,
            });
            return (status, Json(body)).into_response();
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CopyReport;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::UnknownMimeType("application/x-blob".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ServiceError::MailDelivery("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Archive("zip".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_statuses() {
        assert_eq!(
            ServiceError::from(StoreError::Missing("k".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::from(StoreError::InvalidKey("../k".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        let partial = StoreError::CopyIncomplete {
            report: CopyReport {
                copied: vec!["a".into()],
                failed: vec![("b".into(), "io".into())],
            },
        };
        assert_eq!(
            ServiceError::from(partial).status_code(),
            StatusCode::CONFLICT
        );
    }
}
