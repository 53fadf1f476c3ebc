//! Remote mod metadata as reported by a page resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata describing the newest published version of a mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMetadata {
    /// Display name.
    pub name: String,
    /// Author or publisher.
    pub creator: String,
    /// File name the archive is stored under.
    pub archive_filename: String,
    /// Where the archive bytes are downloaded from.
    pub download_url: Url,
    /// Preview image, if the page has one.
    pub image_url: Option<Url>,
    /// Publication time of this version.
    pub updated_on: DateTime<Utc>,
}

impl ModMetadata {
    /// Check that the archive filename is a single plain path component.
    ///
    /// Archive names come from remote pages and are joined onto the archive
    /// directory, so separators and relative components are rejected.
    pub fn has_safe_filename(&self) -> bool {
        let name = self.archive_filename.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains('\0')
    }
}
