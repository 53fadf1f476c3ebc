//! Managed mod type with install state.
//!
//! The [`Mod`] struct extends [`UpdateableFile`] with the mod's identity and
//! install state using composition.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use url::Url;

use super::core::UpdateableFile;
use super::id::ModId;
use super::metadata::ModMetadata;

/// A managed mod.
///
/// Uses composition to extend [`UpdateableFile`] with:
/// - Identity and display information (name, creator, image)
/// - Enabled state (files materialized in the install directory)
/// - A transient update-available flag, recomputed every session
///
/// The [`Deref`] implementation allows transparent access to the tracked
/// file fields (`filename()`, `updated_on()`, `source_url()`).
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use modshelf::package::{Mod, ModId, ModMetadata};
/// use url::Url;
///
/// let page = Url::parse("https://example.com/mods/foo").unwrap();
/// let metadata = ModMetadata {
///     name: "Foo".to_string(),
///     creator: "someone".to_string(),
///     archive_filename: "foo-1.0.zip".to_string(),
///     download_url: Url::parse("https://example.com/foo-1.0.zip").unwrap(),
///     image_url: None,
///     updated_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
/// };
///
/// let entry = Mod::from_metadata(ModId::from_page_url(&page), page, metadata);
/// assert_eq!(entry.filename(), "foo-1.0.zip");
/// assert!(!entry.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    /// Stable identifier.
    pub id: ModId,

    /// Display name.
    pub name: String,

    /// Author or publisher.
    pub creator: String,

    /// Preview image.
    #[serde(default)]
    pub image_url: Option<Url>,

    /// Installed archive and its version (composition).
    #[serde(flatten)]
    pub file: UpdateableFile,

    /// Whether the mod's files are materialized in the install directory.
    #[serde(default)]
    pub enabled: bool,

    /// Whether a newer version was seen during this session.
    #[serde(skip)]
    pub update_available: bool,
}

impl Mod {
    /// Create a disabled mod from freshly resolved metadata.
    pub fn from_metadata(id: ModId, page_url: Url, metadata: ModMetadata) -> Self {
        Self {
            id,
            name: metadata.name,
            creator: metadata.creator,
            image_url: metadata.image_url,
            file: UpdateableFile::new(metadata.archive_filename, metadata.updated_on, page_url),
            enabled: false,
            update_available: false,
        }
    }

    /// Record a newly downloaded version.
    ///
    /// Clears the update-available flag and leaves the enabled state alone.
    pub fn apply_metadata(&mut self, page_url: Url, metadata: ModMetadata) {
        self.file
            .update(metadata.archive_filename, metadata.updated_on, page_url);
        self.name = metadata.name;
        self.creator = metadata.creator;
        self.image_url = metadata.image_url;
        self.update_available = false;
    }

    /// Check whether the given remote metadata describes a newer version.
    pub fn is_outdated_by(&self, metadata: &ModMetadata) -> bool {
        self.file
            .is_superseded_by(&metadata.archive_filename, metadata.updated_on)
    }

    /// Check if the mod is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Deref for Mod {
    type Target = UpdateableFile;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

impl AsRef<UpdateableFile> for Mod {
    fn as_ref(&self) -> &UpdateableFile {
        &self.file
    }
}
