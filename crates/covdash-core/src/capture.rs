//! Capture records and their on-store names.
//!
//! A capture named `2020-10-03T13.24.17_0` is stored as the document
//! `2020-10-03T13.24.17_0.html` plus, when it has images, the sibling folder
//! `2020-10-03T13.24.17_0imgs`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

use crate::document::Document;
use crate::hash::{digest, Content, ContentDigest};

/// Raw image bytes keyed by image identifier.
pub type ImageSet = BTreeMap<String, Vec<u8>>;

/// Image digests keyed by image identifier.
pub type ImageHashes = BTreeMap<String, ContentDigest>;

pub const DOCUMENT_EXTENSION: &str = ".html";
pub const IMAGES_SUFFIX: &str = "imgs";

/// `(timestamp, sequence)` identity of a capture. Orders chronologically,
/// then by sequence, so `_10` sorts after `_9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureName {
    pub timestamp: NaiveDateTime,
    pub sequence: u32,
}

impl CaptureName {
    /// ISO-8601 with `:` replaced by `.` so the name is valid on every filesystem.
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%dT%H.%M.%S";

    #[must_use]
    pub fn new(timestamp: NaiveDateTime, sequence: u32) -> Self {
        Self {
            timestamp,
            sequence,
        }
    }

    /// The prefix shared by every capture taken at `timestamp`.
    #[must_use]
    pub fn prefix_for(timestamp: NaiveDateTime) -> String {
        timestamp.format(Self::TIMESTAMP_FORMAT).to_string()
    }

    #[must_use]
    pub fn prefix(&self) -> String {
        Self::prefix_for(self.timestamp)
    }

    #[must_use]
    pub fn document_file_name(&self) -> String {
        format!("{self}{DOCUMENT_EXTENSION}")
    }

    #[must_use]
    pub fn images_dir_name(&self) -> String {
        format!("{self}{IMAGES_SUFFIX}")
    }

    /// Parses a document file name or images folder name back into a
    /// capture name. Returns `None` for anything else.
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let stem = entry
            .strip_suffix(DOCUMENT_EXTENSION)
            .or_else(|| entry.strip_suffix(IMAGES_SUFFIX))?;
        let (prefix, sequence) = stem.rsplit_once('_')?;
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let sequence = sequence.parse::<u32>().ok()?;
        let timestamp = NaiveDateTime::parse_from_str(prefix, Self::TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            timestamp,
            sequence,
        })
    }
}

impl fmt::Display for CaptureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix(), self.sequence)
    }
}

/// A capture that has not been assigned a sequence number yet.
#[derive(Debug, Clone)]
pub struct CaptureDraft {
    pub timestamp: NaiveDateTime,
    pub document: Document,
    pub images: ImageSet,
}

/// One archived snapshot of the dashboard. Immutable once written.
#[derive(Debug, Clone)]
pub struct Capture {
    pub name: CaptureName,
    pub document: Document,
    pub document_hash: ContentDigest,
    pub images: ImageSet,
    pub image_hashes: ImageHashes,
}

impl Capture {
    /// Assembles a capture, computing every digest from the content.
    #[must_use]
    pub fn from_parts(name: CaptureName, document: Document, images: ImageSet) -> Self {
        let document_hash = document.digest();
        let image_hashes = hash_images(&images);
        Self {
            name,
            document,
            document_hash,
            images,
            image_hashes,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.name.timestamp
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.name.sequence
    }
}

#[must_use]
pub fn hash_images(images: &ImageSet) -> ImageHashes {
    images
        .iter()
        .map(|(id, bytes)| (id.clone(), digest(Content::Binary(bytes))))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 10, 3)
            .unwrap()
            .and_hms_opt(13, 24, 17)
            .unwrap()
    }

    #[test]
    fn names_follow_store_layout() {
        let name = CaptureName::new(ts(), 0);
        assert_eq!(name.prefix(), "2020-10-03T13.24.17");
        assert_eq!(name.document_file_name(), "2020-10-03T13.24.17_0.html");
        assert_eq!(name.images_dir_name(), "2020-10-03T13.24.17_0imgs");
    }

    #[test]
    fn parse_round_trips_both_entry_kinds() {
        let name = CaptureName::new(ts(), 12);
        assert_eq!(CaptureName::parse(&name.document_file_name()), Some(name));
        assert_eq!(CaptureName::parse(&name.images_dir_name()), Some(name));
    }

    #[test]
    fn parse_rejects_foreign_entries() {
        assert_eq!(CaptureName::parse(".DS_Store"), None);
        assert_eq!(CaptureName::parse("notes.html"), None);
        assert_eq!(CaptureName::parse("2020-10-03T13.24.17_.html"), None);
        assert_eq!(CaptureName::parse("2020-10-03T13.24.17_x1.html"), None);
        assert_eq!(CaptureName::parse("2020-10-03T13:24:17_0.html"), None);
    }

    #[test]
    fn ordering_is_numeric_on_sequence() {
        let nine = CaptureName::new(ts(), 9);
        let ten = CaptureName::new(ts(), 10);
        assert!(nine < ten);
        assert!(nine.document_file_name() > ten.document_file_name());
    }

    #[test]
    fn from_parts_hashes_document_and_images() {
        let mut images = ImageSet::new();
        images.insert("tile.png".to_string(), vec![1, 2, 3]);
        let capture = Capture::from_parts(
            CaptureName::new(ts(), 0),
            Document::parse("<p>1</p>"),
            images,
        );
        assert_eq!(capture.document_hash, capture.document.digest());
        assert_eq!(
            capture.image_hashes["tile.png"],
            digest(Content::Binary(&[1, 2, 3]))
        );
    }
}
