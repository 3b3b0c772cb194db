//! Content hashing for stored asset names.
//!
//! Uses `blake3` rather than a fast non-cryptographic hash: stored names
//! are derived from content, and two distinct uploads colliding on a name
//! would silently overwrite each other. The full digest is overkill for a
//! filename, so names carry a truncated hex fingerprint.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint(&bytes); // -> "f2b1a09c4d3e5f67"
//! let t = hash::tag("http://a.com/x.png"); // -> "9c4d3e"
//! ```

/// Compute the full content digest.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> blake3::Hash {
    blake3::hash(data.as_ref())
}

/// 16-char hex fingerprint for content-addressed asset names.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(&compute(data).as_bytes()[..8])
}

/// 6-char hex tag, used to disambiguate colliding archive paths.
#[inline]
pub fn tag<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(&compute(data).as_bytes()[..3])
}
