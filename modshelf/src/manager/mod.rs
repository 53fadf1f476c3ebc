//! Mod lifecycle management.
//!
//! [`ModManager`] is the entry point: it accepts add, update, check, enable,
//! disable and delete requests, validates them against the registry and
//! turns each accepted request into a workflow running on one of its pools.
//!
//! # Collaborators
//!
//! The outside world is reached through three traits so tests can swap in
//! fakes:
//!
//! - [`ModPageResolver`] turns a mod page URL into [`ModMetadata`](crate::package::ModMetadata)
//! - [`ArchiveFetcher`] downloads an archive to a local file
//! - [`ArchiveExtractor`] unpacks an archive into install-relative entries
//!
//! The default implementations are [`ManifestResolver`](download::ManifestResolver),
//! [`HttpFetcher`](download::HttpFetcher) and [`ZipExtractor`].
//!
//! # Directory Layout
//!
//! ```text
//! archive_dir/
//! ├── mods.json               registry document
//! ├── foo-1.2.zip             downloaded archives
//! └── bar-0.9.zip
//!
//! staging_dir/
//! └── example_com_mods_foo/   one directory per mod being downloaded
//!     └── foo-1.3.zip.part
//!
//! install_dir/                typically GameData
//! ├── Foo/...                 files of enabled mods
//! └── Bar/...
//! ```

pub mod config;
pub mod download;
mod error;
mod extractor;
mod in_flight;
mod orchestrator;
pub mod staging;
mod traits;

pub use config::{ManagerConfig, DEFAULT_MAX_CONCURRENT_DOWNLOADS, REGISTRY_FILENAME};
pub use error::{ManagerError, ManagerResult};
pub use extractor::ZipExtractor;
pub use in_flight::{ArchiveNames, ArchiveReservation, InFlight, InFlightGuard};
pub use orchestrator::{BatchSubmission, ModManager, ModManagerBuilder};
pub use traits::{ArchiveEntry, ArchiveExtractor, ArchiveFetcher, ModPageResolver};
