//! Default network collaborators.
//!
//! - [`HttpFetcher`] streams archives to a staging file (`http`)
//! - [`ManifestResolver`] reads a JSON manifest from a mod page (`resolver`)
//! - [`ProgressThrottle`] rate-limits byte-level progress (`progress`)
//!
//! # Example
//!
//! ```ignore
//! use modshelf::manager::download::{HttpFetcher, ManifestResolver};
//! use modshelf::manager::{ArchiveFetcher, ModPageResolver};
//!
//! let page = Url::parse("https://example.com/mods/foo.json")?;
//! let metadata = ManifestResolver::default().resolve(&page)?;
//! HttpFetcher::new().fetch(&metadata.download_url, &dest, &mut |done, total| {
//!     println!("{} of {:?} bytes", done, total);
//! })?;
//! ```

mod http;
mod progress;
mod resolver;

pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use progress::{format_bytes, ProgressThrottle};
pub use resolver::{parse_manifest, ManifestResolver};
