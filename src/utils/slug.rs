//! Deterministic filename normalization.
//!
//! Uploaded filenames and mailing display names come straight from users
//! and can contain anything. Everything that ends up in a storage key, an
//! archive path, or a URL goes through `slug` first.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::slug;
//!
//! slug::slug("Café Ünïcode.PNG");              // -> "cafe-unicode-png"
//! slug::slug(slug::stem("Café Ünïcode.PNG"));  // -> "cafe-unicode"
//! slug::stored_name("img", "a1b2c3", "png");   // -> "img-a1b2c3.png"
//! ```

use deunicode::deunicode;

/// Normalize an arbitrary name into a lowercase ASCII token.
///
/// Transliterates non-ASCII via `deunicode`, lower-cases, collapses every
/// run of non-alphanumeric characters into a single hyphen, and trims
/// leading/trailing hyphens. Pure and idempotent; output always matches
/// `^[a-z0-9-]*$` (empty when the input has no alphanumeric content).
pub fn slug(raw: &str) -> String {
    let ascii = deunicode(raw);
    let mut out = String::with_capacity(ascii.len());
    let mut gap = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('-');
            }
            gap = false;
            out.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }

    out
}

/// Strip a trailing `.html` / `.htm` extension (case-insensitive).
///
/// Mailing display names frequently arrive as `Newsletter.html`; the
/// archive root name must not carry the document extension.
pub fn strip_document_ext(name: &str) -> &str {
    for ext in [".html", ".htm"] {
        if has_suffix_ignore_case(name, ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Extension-free portion of a filename.
///
/// A leading dot is not treated as an extension separator (`.env` -> `.env`).
pub fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Format a final stored asset name as `"<prefix>-<hash>.<ext>"`.
///
/// Deterministic for identical inputs; identical content therefore dedups
/// to the same name. Callers pass a slugged prefix and a hex hash, so the
/// result never needs URL-path escaping.
pub fn stored_name(prefix: &str, hash: &str, ext: &str) -> String {
    format!("{prefix}-{hash}.{ext}")
}

/// Case-insensitive suffix check that never matches the whole string.
fn has_suffix_ignore_case(name: &str, ext: &str) -> bool {
    name.len() > ext.len()
        && name.is_char_boundary(name.len() - ext.len())
        && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext)
}

// =============================================================================
// Tests
// =============================================================================
