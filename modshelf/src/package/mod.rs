//! Mod package types.
//!
//! # Type Hierarchy
//!
//! ```text
//! UpdateableFile (base)             Mod (composition)
//! ├── filename: String              ├── file: UpdateableFile  ←── contains
//! ├── updated_on: DateTime<Utc>     ├── id: ModId
//! └── source_url: Url               ├── name, creator, image_url
//!                                   ├── enabled: bool
//!                                   └── update_available: bool (transient)
//! ```
//!
//! `Mod` uses composition (not inheritance) to extend `UpdateableFile`.
//! The `Deref` impl allows transparent access to the tracked file fields.
//!
//! [`ModMetadata`] is what a page resolver reports for the newest published
//! version; it is folded into a `Mod` once the archive has been downloaded.

mod core;
mod id;
mod installed;
mod metadata;

pub use core::UpdateableFile;
pub use id::ModId;
pub use installed::Mod;
pub use metadata::ModMetadata;
