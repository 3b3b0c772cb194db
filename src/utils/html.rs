//! HTML utility functions.
//!
//! Provides the text transforms applied to template markup:
//! - `sanitize()` - mail-safe encoding (tab removal + non-ASCII entities)
//! - `unescape()` - decode entities out of attribute values
//! - `is_remote_url()` - absolute http(s) reference check

use std::borrow::Cow;

// =============================================================================
// Mail-safe Encoding
// =============================================================================

/// Encode markup so it survives SMTP transports and legacy mail clients.
///
/// Tab characters are replaced with single spaces (some clients render tabs
/// as layout-breaking runs of whitespace), and every non-ASCII character is
/// turned into a named entity where one exists, or a decimal reference
/// otherwise. ASCII symbols (`& < > " '`) pass through untouched so the
/// markup structure is preserved.
///
/// Uses `Cow` to avoid allocation when the input is already 7-bit clean.
///
/// # Example
/// ```ignore
/// assert_eq!(sanitize("café"), "caf&eacute;");
/// assert_eq!(sanitize("<b>ok</b>"), "<b>ok</b>"); // No allocation
/// ```
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| b == b'\t' || !b.is_ascii()) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + s.len() / 4);
    for c in s.chars() {
        match c {
            '\t' => result.push(' '),
            c if c.is_ascii() => result.push(c),
            c => match named_entity(c) {
                Some(entity) => result.push_str(entity),
                None => {
                    result.push_str("&#");
                    result.push_str(&(c as u32).to_string());
                    result.push(';');
                }
            },
        }
    }
    Cow::Owned(result)
}

/// Named character reference for a non-ASCII character, if one is in
/// common use. Covers Latin-1 letters plus the typographic punctuation
/// that shows up in marketing copy; everything else falls back to a
/// numeric reference.
fn named_entity(c: char) -> Option<&'static str> {
    let entity = match c {
        '\u{00A0}' => "&nbsp;",
        '¡' => "&iexcl;",
        '¢' => "&cent;",
        '£' => "&pound;",
        '¥' => "&yen;",
        '§' => "&sect;",
        '©' => "&copy;",
        'ª' => "&ordf;",
        '«' => "&laquo;",
        '®' => "&reg;",
        '°' => "&deg;",
        '±' => "&plusmn;",
        '´' => "&acute;",
        'µ' => "&micro;",
        '¶' => "&para;",
        '·' => "&middot;",
        'º' => "&ordm;",
        '»' => "&raquo;",
        '¼' => "&frac14;",
        '½' => "&frac12;",
        '¾' => "&frac34;",
        '¿' => "&iquest;",
        'À' => "&Agrave;",
        'Á' => "&Aacute;",
        'Â' => "&Acirc;",
        'Ã' => "&Atilde;",
        'Ä' => "&Auml;",
        'Å' => "&Aring;",
        'Æ' => "&AElig;",
        'Ç' => "&Ccedil;",
        'È' => "&Egrave;",
        'É' => "&Eacute;",
        'Ê' => "&Ecirc;",
        'Ë' => "&Euml;",
        'Ì' => "&Igrave;",
        'Í' => "&Iacute;",
        'Î' => "&Icirc;",
        'Ï' => "&Iuml;",
        'Ñ' => "&Ntilde;",
        'Ò' => "&Ograve;",
        'Ó' => "&Oacute;",
        'Ô' => "&Ocirc;",
        'Õ' => "&Otilde;",
        'Ö' => "&Ouml;",
        '×' => "&times;",
        'Ø' => "&Oslash;",
        'Ù' => "&Ugrave;",
        'Ú' => "&Uacute;",
        'Û' => "&Ucirc;",
        'Ü' => "&Uuml;",
        'Ý' => "&Yacute;",
        'ß' => "&szlig;",
        'à' => "&agrave;",
        'á' => "&aacute;",
        'â' => "&acirc;",
        'ã' => "&atilde;",
        'ä' => "&auml;",
        'å' => "&aring;",
        'æ' => "&aelig;",
        'ç' => "&ccedil;",
        'è' => "&egrave;",
        'é' => "&eacute;",
        'ê' => "&ecirc;",
        'ë' => "&euml;",
        'ì' => "&igrave;",
        'í' => "&iacute;",
        'î' => "&icirc;",
        'ï' => "&iuml;",
        'ñ' => "&ntilde;",
        'ò' => "&ograve;",
        'ó' => "&oacute;",
        'ô' => "&ocirc;",
        'õ' => "&otilde;",
        'ö' => "&ouml;",
        '÷' => "&divide;",
        'ø' => "&oslash;",
        'ù' => "&ugrave;",
        'ú' => "&uacute;",
        'û' => "&ucirc;",
        'ü' => "&uuml;",
        'ý' => "&yacute;",
        'ÿ' => "&yuml;",
        'Œ' => "&OElig;",
        'œ' => "&oelig;",
        'Š' => "&Scaron;",
        'š' => "&scaron;",
        'Ÿ' => "&Yuml;",
        '–' => "&ndash;",
        '—' => "&mdash;",
        '\u{2018}' => "&lsquo;",
        '\u{2019}' => "&rsquo;",
        '\u{201C}' => "&ldquo;",
        '\u{201D}' => "&rdquo;",
        '†' => "&dagger;",
        '‡' => "&Dagger;",
        '•' => "&bull;",
        '…' => "&hellip;",
        '′' => "&prime;",
        '″' => "&Prime;",
        '€' => "&euro;",
        '™' => "&trade;",
        '←' => "&larr;",
        '→' => "&rarr;",
        _ => return None,
    };
    Some(entity)
}

// =============================================================================
// Entity Decoding
// =============================================================================

/// Unescape HTML entities back to characters.
///
/// Handles common named entities and numeric character references. Used on
/// attribute values pulled out of raw markup, where `&amp;` and friends are
/// still encoded. An `&` that is not followed by a short `;`-terminated run
/// is left alone.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(idx) = rest.find('&') {
        result.push_str(&rest[..idx]);
        rest = &rest[idx..];

        let candidate = &rest[1..];
        match candidate.find(';') {
            // Entity names are short; anything longer is literal text.
            Some(end) if end > 0 && end <= 10 => {
                if let Some(c) = decode_entity(&candidate[..end]) {
                    result.push(c);
                } else {
                    result.push_str(&rest[..end + 2]);
                }
                rest = &rest[end + 2..];
            }
            _ => {
                result.push('&');
                rest = candidate;
            }
        }
    }

    result.push_str(rest);
    Cow::Owned(result)
}

fn decode_entity(entity: &str) -> Option<char> {
    Some(match entity {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            return char::from_u32(code);
        }
    })
}

// =============================================================================
// URL Classification
// =============================================================================

/// Check whether a reference is an absolute HTTP(S) URL.
///
/// Scheme matching is case-insensitive. Protocol-relative (`//cdn/x`),
/// rooted (`/img/x`) and bare relative references all return false.
pub fn is_remote_url(s: &str) -> bool {
    has_prefix_ignore_case(s, "http://") || has_prefix_ignore_case(s, "https://")
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

// =============================================================================
// Tests
// =============================================================================
