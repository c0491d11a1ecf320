//! Filesystem archive of captures.
//!
//! Layout, one pair per capture:
//!
//! ```text
//! <root>/2020-10-03T13.24.17_0.html
//! <root>/2020-10-03T13.24.17_0imgs/<identifier>
//! ```
//!
//! Entries are only ever created. A capture is staged in a hidden temporary
//! directory under the root and renamed into place, images folder first and
//! document last, so a listed document always has its images beside it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use covdash_core::{
    hash_images, Capture, CaptureDraft, CaptureName, Document, ImageHashes, ImageSet,
};
use regex::Regex;

use crate::error::StoreError;
use crate::lock::PrefixLock;

static DOCUMENT_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}\.\d{2}\.\d{2}_\d+\.html$").expect("valid regex")
});

static IMAGES_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}\.\d{2}\.\d{2}_\d+imgs$").expect("valid regex")
});

const STAGING_PREFIX: &str = ".staging-";

pub struct ArchiveStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of top-level entries (documents or image folders) matching
    /// `pattern`, ordered by capture name. Hidden entries are never listed.
    /// A missing root lists nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the root exists but cannot be listed.
    pub fn list_folders_matching(&self, pattern: &Regex) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Read {
                path: self.root.clone(),
                source,
            })?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !pattern.is_match(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort_by_cached_key(|name| (CaptureName::parse(name), name.clone()));
        Ok(names)
    }

    /// Next free sequence number for `prefix`: one past the highest sequence
    /// of any document or images folder sharing it, or 0 if none does.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the root cannot be listed.
    pub fn next_sequence_for(&self, prefix: &str) -> Result<u32, StoreError> {
        let pattern = Regex::new(&format!("^{}_", regex::escape(prefix)))
            .map_err(|_| StoreError::InvalidName(prefix.to_string()))?;

        let highest = self
            .list_folders_matching(&pattern)?
            .iter()
            .filter_map(|name| CaptureName::parse(name))
            .filter(|name| name.prefix() == prefix)
            .map(|name| name.sequence)
            .max();

        Ok(highest.map_or(0, |seq| seq.saturating_add(1)))
    }

    /// Names of every stored capture, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the root cannot be listed.
    pub fn capture_names(&self) -> Result<Vec<CaptureName>, StoreError> {
        Ok(self
            .list_folders_matching(&DOCUMENT_ENTRY_RE)?
            .iter()
            .filter_map(|name| CaptureName::parse(name))
            .collect())
    }

    /// Assigns the next sequence number for the draft's timestamp and writes
    /// the capture, returning it with the path of its document.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Locked`] if another writer holds the prefix too long.
    /// - [`StoreError::AlreadyExists`] if the chosen name is already taken.
    /// - [`StoreError::InvalidIdentifier`] if an image cannot be named on disk.
    /// - [`StoreError::Write`] if the storage is unwritable.
    pub fn write_capture(&self, draft: CaptureDraft) -> Result<(Capture, PathBuf), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;
        for identifier in draft.images.keys() {
            check_identifier(identifier)?;
        }

        let prefix = CaptureName::prefix_for(draft.timestamp);
        let _lock = PrefixLock::acquire(&self.root, &prefix, self.lock_timeout)?;

        let name = CaptureName::new(draft.timestamp, self.next_sequence_for(&prefix)?);
        let document_path = self.root.join(name.document_file_name());
        let images_path = self.root.join(name.images_dir_name());
        for path in [&document_path, &images_path] {
            if path.exists() {
                return Err(StoreError::AlreadyExists { path: path.clone() });
            }
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| StoreError::Write {
                path: self.root.clone(),
                source,
            })?;

        let staged_document = staging.path().join(name.document_file_name());
        write_file(&staged_document, draft.document.as_str().as_bytes())?;

        if !draft.images.is_empty() {
            let staged_images = staging.path().join(name.images_dir_name());
            fs::create_dir(&staged_images).map_err(|source| StoreError::Write {
                path: staged_images.clone(),
                source,
            })?;
            for (identifier, bytes) in &draft.images {
                write_file(&staged_images.join(identifier), bytes)?;
            }
            rename(&staged_images, &images_path)?;
        }
        rename(&staged_document, &document_path)?;

        let capture = Capture::from_parts(name, draft.document, draft.images);
        tracing::info!(
            capture = %capture.name,
            images = capture.images.len(),
            document_hash = %capture.document_hash,
            "archived capture"
        );
        Ok((capture, document_path))
    }

    /// Reads one capture, recomputing its digests from the stored bytes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no document has this name.
    /// - [`StoreError::Read`] if the document or an image cannot be read.
    pub fn read_capture(&self, name: CaptureName) -> Result<Capture, StoreError> {
        let document_path = self.root.join(name.document_file_name());
        let bytes = match fs::read(&document_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: document_path,
                    source,
                })
            }
        };
        let document = match String::from_utf8(bytes) {
            Ok(text) => Document::from_canonical(text),
            Err(e) => Document::from_bytes(e.as_bytes()),
        };

        let images = self.read_images(&self.root.join(name.images_dir_name()))?;
        Ok(Capture::from_parts(name, document, images))
    }

    /// Every readable capture, oldest first. Unreadable entries are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] only if the root cannot be listed.
    pub fn read_all_captures(&self) -> Result<Vec<Capture>, StoreError> {
        let mut captures = Vec::new();
        for name in self.capture_names()? {
            match self.read_capture(name) {
                Ok(capture) => captures.push(capture),
                Err(e) => {
                    tracing::warn!(capture = %name, error = %e, "skipping unreadable capture");
                }
            }
        }
        Ok(captures)
    }

    /// # Errors
    ///
    /// - [`StoreError::Empty`] if nothing has been archived yet.
    /// - Any error from [`ArchiveStore::read_capture`] for the latest entry.
    pub fn read_latest_capture(&self) -> Result<Capture, StoreError> {
        let latest = self.capture_names()?.pop().ok_or(StoreError::Empty)?;
        self.read_capture(latest)
    }

    /// The highest-sequence capture sharing `prefix`, if any. This is the
    /// last capture written for one publication stamp, whatever sorts after
    /// it.
    ///
    /// # Errors
    ///
    /// Any error from [`ArchiveStore::read_capture`] for that entry.
    pub fn latest_with_prefix(&self, prefix: &str) -> Result<Option<Capture>, StoreError> {
        let latest = self
            .capture_names()?
            .into_iter()
            .filter(|name| name.prefix() == prefix)
            .max();
        latest.map(|name| self.read_capture(name)).transpose()
    }

    /// Digests of the most recent images folder that has its document beside
    /// it. It may belong to an earlier capture than the latest document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the folder cannot be read.
    pub fn latest_image_set(&self) -> Result<Option<(CaptureName, ImageHashes)>, StoreError> {
        let folders = self.list_folders_matching(&IMAGES_ENTRY_RE)?;
        let Some((name, folder)) = folders
            .iter()
            .rev()
            .filter(|folder| self.root.join(folder).is_dir())
            .filter_map(|folder| CaptureName::parse(folder).map(|name| (name, folder)))
            .find(|(name, _)| self.root.join(name.document_file_name()).is_file())
        else {
            return Ok(None);
        };
        let images = self.read_images(&self.root.join(folder))?;
        Ok(Some((name, hash_images(&images))))
    }

    fn read_images(&self, dir: &Path) -> Result<ImageSet, StoreError> {
        let mut images = ImageSet::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(images),
            Err(source) => {
                return Err(StoreError::Read {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Read {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(identifier) = entry.file_name().into_string() else {
                tracing::warn!(path = %path.display(), "skipping image with non UTF-8 name");
                continue;
            };
            let bytes = fs::read(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            images.insert(identifier, bytes);
        }
        Ok(images)
    }
}

fn check_identifier(identifier: &str) -> Result<(), StoreError> {
    let unsafe_name = identifier.is_empty()
        || identifier.starts_with('.')
        || identifier.contains(['/', '\\']);
    if unsafe_name {
        return Err(StoreError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    fs::write(path, bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn rename(from: &Path, to: &Path) -> Result<(), StoreError> {
    fs::rename(from, to).map_err(|source| StoreError::Write {
        path: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
