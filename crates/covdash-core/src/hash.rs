//! SHA-256 digests over captured content.
//!
//! Text is always hashed as its UTF-8 bytes. Markup is hashed through its
//! canonical serialization (see [`Document`]) so two independently parsed
//! copies of the same page produce the same digest.

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::document::Document;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("unsupported content type for hashing: {media_type}")]
    UnsupportedContentType { media_type: String },
}

/// Anything the archiver knows how to digest.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
    Markup(&'a Document),
}

impl<'a> Content<'a> {
    /// Classifies a fetched body by its declared media type.
    ///
    /// Textual, image, and octet-stream bodies (and bodies with no declared
    /// type) are hashed as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::UnsupportedContentType`] for any other media type,
    /// e.g. a JSON error payload served where a chart image was expected.
    pub fn from_media_type(media_type: Option<&str>, body: &'a [u8]) -> Result<Self, HashError> {
        let Some(raw) = media_type else {
            return Ok(Content::Binary(body));
        };
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let supported = essence.is_empty()
            || essence.starts_with("text/")
            || essence.starts_with("image/")
            || essence == "application/octet-stream"
            || essence == "binary/octet-stream";

        if supported {
            Ok(Content::Binary(body))
        } else {
            Err(HashError::UnsupportedContentType {
                media_type: raw.to_string(),
            })
        }
    }
}

/// A 32-byte SHA-256 digest. Equal digests are treated as equal content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({self})")
    }
}

/// Computes the digest of `content`.
#[must_use]
pub fn digest(content: Content<'_>) -> ContentDigest {
    let bytes: &[u8] = match content {
        Content::Text(text) => text.as_bytes(),
        Content::Binary(bytes) => bytes,
        Content::Markup(document) => document.as_str().as_bytes(),
    };
    ContentDigest(Sha256::digest(bytes).into())
}
