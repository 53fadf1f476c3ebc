//! Remotely tracked file record.
//!
//! The [`UpdateableFile`] struct is the base data shared by anything whose
//! newest version is published at a remote URL: the archive filename that is
//! currently on disk, when that version was published, and where to look for
//! newer ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A file whose newest version is tracked at a source URL.
///
/// Filename and timestamp describe the same version and are only ever
/// changed together through [`UpdateableFile::update`].
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use modshelf::package::UpdateableFile;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/mods/foo").unwrap();
/// let v1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let v2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
///
/// let mut file = UpdateableFile::new("foo-1.0.zip", v1, page.clone());
/// assert!(file.is_superseded_by("foo-2.0.zip", v2));
///
/// file.update("foo-2.0.zip", v2, page);
/// assert_eq!(file.filename(), "foo-2.0.zip");
/// assert!(!file.is_superseded_by("foo-2.0.zip", v2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateableFile {
    filename: String,
    updated_on: DateTime<Utc>,
    source_url: Url,
}

impl UpdateableFile {
    /// Create a new record.
    pub fn new(filename: impl Into<String>, updated_on: DateTime<Utc>, source_url: Url) -> Self {
        Self {
            filename: filename.into(),
            updated_on,
            source_url,
        }
    }

    /// Name of the archive for the recorded version.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Publication time of the recorded version.
    pub fn updated_on(&self) -> DateTime<Utc> {
        self.updated_on
    }

    /// URL that is consulted for newer versions.
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Record a new version.
    pub fn update(&mut self, filename: impl Into<String>, updated_on: DateTime<Utc>, source_url: Url) {
        self.filename = filename.into();
        self.updated_on = updated_on;
        self.source_url = source_url;
    }

    /// Whether a remote version differs from the recorded one.
    ///
    /// A newer publication time or a different archive name both count as a
    /// new version; the remote side is authoritative.
    pub fn is_superseded_by(&self, filename: &str, updated_on: DateTime<Utc>) -> bool {
        updated_on > self.updated_on || filename != self.filename
    }
}
