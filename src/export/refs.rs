//! Remote asset reference extraction.
//!
//! Mail templates reference hosted images in three places: `<img src>`,
//! the legacy `background` attribute (tables, body) and inline `style`
//! `url(...)` declarations. Extraction walks the DOM with `tl` and keeps
//! the raw attribute text, so the rewrite stage can replace exactly what
//! the document contains.

use crate::utils::html::is_remote_url;
use regex::Regex;
use std::sync::LazyLock;

/// Collect remote references in document order.
///
/// Only absolute HTTP(S) URLs are kept; relative references stay untouched
/// by the export. Duplicates are preserved here, the manifest dedups.
pub fn extract(html: &str) -> Vec<String> {
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return Vec::new();
    };

    let mut refs = Vec::new();
    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else { continue };
        let name = tag.name().as_utf8_str();

        let mut src = None;
        let mut background = None;
        let mut style = None;
        for (key, value) in tag.attributes().iter() {
            let key: &str = key.as_ref();
            let Some(value) = value else { continue };
            if key.eq_ignore_ascii_case("src") {
                src = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("background") {
                background = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("style") {
                style = Some(value.to_string());
            }
        }

        if name.eq_ignore_ascii_case("img")
            && let Some(src) = src
        {
            push_remote(&mut refs, src);
        }
        if let Some(background) = background {
            push_remote(&mut refs, background);
        }
        if let Some(style) = style
            && let Some(url) = style_url(&style)
        {
            push_remote(&mut refs, url);
        }
    }

    refs
}

fn push_remote(refs: &mut Vec<String>, candidate: String) {
    if is_remote_url(&candidate) {
        refs.push(candidate);
    }
}

/// First `url(...)` reference inside an inline style value.
///
/// Style values carry at most one image per declaration the editor emits;
/// matching only the first mirrors that and keeps the replacement exact.
fn style_url(style: &str) -> Option<String> {
    // ASCII whitespace classes keep this working with unicode tables off.
    static RE_STYLE_URL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"url\([ \t\r\n]*['"]?([^'") \t\r\n]+)['"]?[ \t\r\n]*\)"#).unwrap()
    });

    RE_STYLE_URL
        .captures(style)
        .map(|caps| caps[1].to_string())
}

// =============================================================================
// Tests
// =============================================================================
