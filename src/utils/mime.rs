//! MIME type tables.
//!
//! Two directions, used by different halves of the pipeline:
//! - `extension_for()` resolves the extension of a stored asset name from
//!   the content type declared in a multipart upload. No mapping means the
//!   upload is rejected upstream; an extension-less stored name would break
//!   reference rewriting at export time.
//! - `from_extension()` resolves the Content-Type header when an asset is
//!   served back to the editor.

#![allow(dead_code)]

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JSON: &str = "application/json";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const ZIP: &str = "application/zip";
    pub const PDF: &str = "application/pdf";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";
    pub const TIFF: &str = "image/tiff";
}

/// Resolve a stored-name extension from a declared MIME type.
///
/// The parameter part of the content type (`; charset=...`) is ignored.
/// Returns `None` when no mapping exists; callers treat that as a hard
/// error rather than storing an extension-less asset.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    // Strip parameters and normalize case: "Image/PNG; charset=binary"
    // looks up as "image/png".
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    let lowered;
    let essence = if essence.bytes().any(|b| b.is_ascii_uppercase()) {
        lowered = essence.to_ascii_lowercase();
        lowered.as_str()
    } else {
        essence
    };

    match essence {
        "image/png" => Some("png"),
        "image/jpeg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tif"),
        "text/html" => Some("html"),
        "text/plain" => Some("txt"),
        "text/css" => Some("css"),
        "application/json" => Some("json"),
        "application/pdf" => Some("pdf"),
        "application/zip" => Some("zip"),
        _ => None,
    }
}

/// Guess MIME type from file extension string (for serving assets back).
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("txt") => types::PLAIN,
        Some("css") => types::CSS,
        Some("json") => types::JSON,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("avif") => types::AVIF,
        Some("svg") => types::SVG,
        Some("ico") => types::ICO,
        Some("bmp") => types::BMP,
        Some("tif" | "tiff") => types::TIFF,

        Some("pdf") => types::PDF,
        Some("zip") => types::ZIP,

        _ => types::OCTET_STREAM,
    }
}

/// Guess MIME type from a storage key (for serving assets back).
pub fn from_key(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, e)| e);
    from_extension(ext.map(str::to_ascii_lowercase).as_deref())
}

/// Check if the MIME type represents an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_known() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/pjpeg"), Some("jpg"));
        assert_eq!(extension_for("image/gif"), Some("gif"));
        assert_eq!(extension_for("image/svg+xml"), Some("svg"));
        assert_eq!(extension_for("application/pdf"), Some("pdf"));
    }

    #[test]
    fn test_extension_for_parameters_and_case() {
        assert_eq!(extension_for("image/png; charset=binary"), Some("png"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for(" image/gif "), Some("gif"));
    }

    #[test]
    fn test_extension_for_unknown() {
        assert_eq!(extension_for("application/x-proprietary"), None);
        assert_eq!(extension_for("video/mp4"), None);
        assert_eq!(extension_for(""), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(from_extension(Some("png")), types::PNG);
        assert_eq!(from_extension(Some("jpeg")), types::JPEG);
        assert_eq!(from_extension(Some("html")), types::HTML);
        assert_eq!(from_extension(Some("xyz")), types::OCTET_STREAM);
        assert_eq!(from_extension(None), types::OCTET_STREAM);
    }

    #[test]
    fn test_from_key() {
        assert_eq!(from_key("img-a1b2.png"), types::PNG);
        assert_eq!(from_key("img-a1b2.PNG"), types::PNG);
        assert_eq!(from_key("noext"), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(types::PNG));
        assert!(is_image(types::SVG));
        assert!(!is_image(types::HTML));
    }
}
