//! Multipart form part classification.

use crate::debug;
use bytes::Bytes;

/// Reserved text field carrying the template markup alongside its assets.
pub const MARKUP_FIELD: &str = "markup";

/// One decoded part of a multipart submission.
///
/// The HTTP layer owns the multipart wire format; the pipeline only sees
/// decoded parts, which keeps it runnable from tests without a server.
#[derive(Debug, Clone)]
pub struct FormPart {
    /// Form field name.
    pub name: String,
    /// Client-side filename, present only for file parts.
    pub file_name: Option<String>,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: Bytes::from(value.into().into_bytes()),
        }
    }
}

/// A file part that survived classification.
#[derive(Debug, Clone)]
pub struct AssetPart {
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Parts of one submission, sorted by role.
#[derive(Debug, Default)]
pub struct ClassifiedParts {
    /// Value of the reserved `markup` text field.
    pub markup: Option<String>,
    /// Remaining text fields, in arrival order.
    pub fields: Vec<(String, String)>,
    /// Binary parts to store, in arrival order.
    pub assets: Vec<AssetPart>,
    /// Parts dropped as unusable (zero bytes or no filename).
    pub dropped: usize,
}

/// Sort decoded parts into markup, plain fields and binary assets.
///
/// File parts keep their role regardless of field name, so the legacy
/// `files[]` single-file widget field lands in `assets` like any other
/// upload. File parts without a filename or without content are dropped.
pub fn classify(parts: Vec<FormPart>) -> ClassifiedParts {
    let mut classified = ClassifiedParts::default();

    for part in parts {
        match part.file_name {
            Some(file_name) => {
                if file_name.is_empty() || part.data.is_empty() {
                    debug!("upload"; "dropping unusable part `{}` ({} bytes)", part.name, part.data.len());
                    classified.dropped += 1;
                    continue;
                }
                classified.assets.push(AssetPart {
                    original_name: file_name,
                    content_type: part
                        .content_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    data: part.data,
                });
            }
            None => {
                let value = String::from_utf8_lossy(&part.data).into_owned();
                if part.name == MARKUP_FIELD {
                    classified.markup = Some(value);
                } else if part.name.is_empty() {
                    classified.dropped += 1;
                } else {
                    classified.fields.push((part.name, value));
                }
            }
        }
    }

    classified
}

// =============================================================================
// Tests
// =============================================================================
