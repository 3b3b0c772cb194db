//! Export manifest: URL deduplication and archive path assignment.
//!
//! The manifest is built once per export request from the extracted
//! reference list. Each distinct remote URL gets exactly one entry and
//! one archive-relative path, no matter how many times the document
//! references it.

use crate::utils::{hash, html, slug};
use percent_encoding::percent_decode_str;
use rustc_hash::FxHashSet;
use std::borrow::Cow;

// =============================================================================
// Types
// =============================================================================

/// One remote asset scheduled for download into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// URL exactly as it appears in the document. Rewriting replaces this
    /// literal text, so it must stay unmodified.
    pub remote_url: String,
    /// Archive path relative to the HTML document, e.g. `images/logo.png`.
    pub rel_path: String,
}

impl ManifestEntry {
    /// URL to request. Attribute text may carry entity-escaped ampersands
    /// (`&amp;`) that the HTTP client must not see.
    pub fn fetch_url(&self) -> Cow<'_, str> {
        html::unescape(&self.remote_url)
    }
}

/// Deduplicated reference list in first-seen order.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

// =============================================================================
// Implementation
// =============================================================================

impl Manifest {
    /// Build the manifest from raw extracted references.
    ///
    /// Duplicate URLs collapse onto their first occurrence. When two
    /// distinct URLs resolve to the same archive path, the later one is
    /// disambiguated with a short fingerprint of its URL.
    pub fn build(refs: &[String]) -> Self {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut claimed: FxHashSet<String> = FxHashSet::default();
        let mut entries = Vec::new();

        for url in refs {
            if !seen.insert(url.as_str()) {
                continue;
            }
            let mut rel_path = rel_path_for(url);
            if claimed.contains(&rel_path) {
                rel_path = disambiguate(&rel_path, url);
            }
            claimed.insert(rel_path.clone());
            entries.push(ManifestEntry {
                remote_url: url.clone(),
                rel_path,
            });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every manifest URL in the document with its archive path.
    ///
    /// Plain literal replacement, never a DOM mutation: ESP-proprietary
    /// markup and IE conditional comments must survive byte-for-byte.
    /// Longer URLs are replaced first so a URL that is a prefix of another
    /// is never corrupted by the shorter one's pass.
    pub fn rewrite(&self, document: &str) -> String {
        let mut ordered: Vec<&ManifestEntry> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.remote_url.len().cmp(&a.remote_url.len()));

        let mut out = document.to_string();
        for entry in ordered {
            out = out.replace(&entry.remote_url, &entry.rel_path);
        }
        out
    }
}

// =============================================================================
// Path derivation
// =============================================================================

/// Archive-relative path for a remote URL.
///
/// Derived from the URL's last path segment: percent-decoded, stem slugged,
/// extension kept only when it looks like a real file extension. URLs with
/// no usable segment (bare hosts, opaque query-only endpoints) fall back to
/// a name derived from the URL itself.
fn rel_path_for(url: &str) -> String {
    let segment = last_path_segment(url);
    let (base, ext) = match &segment {
        Some(segment) => (
            slug::slug(slug::stem(segment)),
            usable_extension(segment).map(str::to_ascii_lowercase),
        ),
        None => (String::new(), None),
    };

    let base = if base.is_empty() {
        format!("asset-{}", hash::tag(url))
    } else {
        base
    };

    match ext {
        Some(ext) => format!("images/{base}.{ext}"),
        None => format!("images/{base}"),
    }
}

/// Last non-empty path segment, percent-decoded.
fn last_path_segment(url: &str) -> Option<String> {
    let unescaped = html::unescape(url);
    let parsed = url::Url::parse(&unescaped).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = percent_decode_str(last).decode_utf8_lossy();
    (!decoded.is_empty()).then(|| decoded.into_owned())
}

/// Extension of a decoded segment, when short and alphanumeric.
///
/// Anything longer is almost certainly not an extension (tracking tokens,
/// dotted version strings) and is dropped rather than propagated into the
/// archive.
fn usable_extension(segment: &str) -> Option<&str> {
    let idx = segment.rfind('.')?;
    if idx == 0 {
        return None;
    }
    let ext = &segment[idx + 1..];
    (!ext.is_empty() && ext.len() <= 5 && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .then_some(ext)
}

/// Insert a URL fingerprint before the extension: `images/a.png` becomes
/// `images/a-9c4d3e.png`.
fn disambiguate(rel_path: &str, url: &str) -> String {
    let tag = hash::tag(url);
    match rel_path.rsplit_once('.') {
        Some((base, ext)) => format!("{base}-{tag}.{ext}"),
        None => format!("{rel_path}-{tag}"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::refs;

    fn build(urls: &[&str]) -> Manifest {
        let refs: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        Manifest::build(&refs)
    }

    #[test]
    fn test_build_dedups_first_seen() {
        let manifest = build(&[
            "http://cdn.test/a.png",
            "http://cdn.test/b.png",
            "http://cdn.test/a.png",
        ]);

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].remote_url, "http://cdn.test/a.png");
        assert_eq!(manifest.entries()[1].remote_url, "http://cdn.test/b.png");
    }

    #[test]
    fn test_rel_path_from_segment() {
        let manifest = build(&["http://cdn.test/path/Sommer Aktion.PNG"]);
        assert_eq!(manifest.entries()[0].rel_path, "images/sommer-aktion.png");
    }

    #[test]
    fn test_rel_path_percent_decoded() {
        let manifest = build(&["http://cdn.test/Caf%C3%A9%20Logo.png"]);
        assert_eq!(manifest.entries()[0].rel_path, "images/cafe-logo.png");
    }

    #[test]
    fn test_rel_path_drops_long_extension() {
        // Dotted tracking token, not a file extension.
        let manifest = build(&["http://cdn.test/banner.a1b2c3d4e5f6"]);
        assert_eq!(manifest.entries()[0].rel_path, "images/banner");
    }

    #[test]
    fn test_rel_path_fallback_without_segment() {
        let manifest = build(&["http://cdn.test/"]);
        let rel = &manifest.entries()[0].rel_path;
        assert!(rel.starts_with("images/asset-"), "got {rel}");
        assert_eq!(rel.len(), "images/asset-".len() + 6);
    }

    #[test]
    fn test_collision_disambiguated() {
        let manifest = build(&[
            "http://cdn-a.test/logo.png",
            "http://cdn-b.test/logo.png",
        ]);

        assert_eq!(manifest.entries()[0].rel_path, "images/logo.png");
        let second = &manifest.entries()[1].rel_path;
        assert!(second.starts_with("images/logo-"), "got {second}");
        assert!(second.ends_with(".png"));
        assert_ne!(second, &manifest.entries()[0].rel_path);
    }

    #[test]
    fn test_fetch_url_unescapes_entities() {
        let manifest = build(&["http://cdn.test/img.png?a=1&amp;b=2"]);
        assert_eq!(
            manifest.entries()[0].fetch_url(),
            "http://cdn.test/img.png?a=1&b=2"
        );
        // The document text keeps the escaped form for exact replacement.
        assert_eq!(
            manifest.entries()[0].remote_url,
            "http://cdn.test/img.png?a=1&amp;b=2"
        );
    }

    #[test]
    fn test_rewrite_replaces_all_occurrences() {
        let manifest = build(&["http://cdn.test/x.png"]);
        let html = concat!(
            r#"<img src="http://cdn.test/x.png">"#,
            r#"<td style="background:url(http://cdn.test/x.png)"></td>"#,
        );

        let rewritten = manifest.rewrite(html);
        assert!(!rewritten.contains("http://cdn.test/x.png"));
        assert_eq!(rewritten.matches("images/x.png").count(), 2);
    }

    #[test]
    fn test_rewrite_longest_url_first() {
        // The first URL is a strict prefix of the second; replacing it
        // first would corrupt the longer reference.
        let manifest = build(&[
            "http://cdn.test/img",
            "http://cdn.test/img/detail.png",
        ]);

        let html = concat!(
            r#"<img src="http://cdn.test/img">"#,
            r#"<img src="http://cdn.test/img/detail.png">"#,
        );
        let rewritten = manifest.rewrite(html);

        assert!(rewritten.contains(r#"src="images/img""#));
        assert!(rewritten.contains(r#"src="images/detail.png""#));
        assert!(!rewritten.contains("http://"));
    }

    #[test]
    fn test_rewrite_roundtrip_leaves_no_absolute_refs() {
        let html = concat!(
            r#"<img src="http://cdn.test/a.png">"#,
            r#"<div background="http://cdn.test/b.jpg"></div>"#,
            r#"<img src="images/already-local.png">"#,
        );

        let manifest = Manifest::build(&refs::extract(html));
        let rewritten = manifest.rewrite(html);

        assert!(refs::extract(&rewritten).is_empty());
        assert!(rewritten.contains(r#"src="images/already-local.png""#));
    }
}
