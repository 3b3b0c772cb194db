//! Shared pure helpers: naming, hashing, MIME tables, HTML sanitization.

pub mod hash;
pub mod html;
pub mod mime;
pub mod slug;
