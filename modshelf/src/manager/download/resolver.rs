//! Resolver for pages that publish a JSON mod manifest.
//!
//! The manifest describes the newest release of a mod:
//!
//! ```text
//! {
//!   "name": "Foo",
//!   "creator": "someone",
//!   "download_url": "releases/foo-2.0.zip",
//!   "archive_filename": "foo-2.0.zip",        (optional)
//!   "image_url": "https://example.com/foo.png", (optional)
//!   "updated_on": "2024-03-01T12:00:00Z"
//! }
//! ```
//!
//! Relative URLs are resolved against the page URL. When no archive file
//! name is given, the last segment of the download URL is used.

use std::io::Read;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::http::{build_client, get, DEFAULT_TIMEOUT_SECS};
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::traits::ModPageResolver;
use crate::package::ModMetadata;

/// Largest manifest accepted (1MB).
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct Manifest {
    name: String,
    creator: String,
    download_url: String,
    #[serde(default)]
    archive_filename: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    updated_on: DateTime<Utc>,
}

/// Parse a manifest document fetched from `page`.
pub fn parse_manifest(page: &Url, body: &[u8]) -> ManagerResult<ModMetadata> {
    let parse_failed = |reason: String| ManagerError::MetadataParseFailed {
        url: page.to_string(),
        reason,
    };

    let manifest: Manifest =
        serde_json::from_slice(body).map_err(|e| parse_failed(e.to_string()))?;

    let download_url = page
        .join(&manifest.download_url)
        .map_err(|e| parse_failed(format!("invalid download_url: {}", e)))?;
    let image_url = match manifest.image_url.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(
            page.join(raw)
                .map_err(|e| parse_failed(format!("invalid image_url: {}", e)))?,
        ),
        _ => None,
    };

    let archive_filename = match manifest.archive_filename {
        Some(name) => name,
        None => download_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .ok_or_else(|| parse_failed("download_url has no file name".to_string()))?,
    };

    let metadata = ModMetadata {
        name: manifest.name,
        creator: manifest.creator,
        archive_filename,
        download_url,
        image_url,
        updated_on: manifest.updated_on,
    };
    if !metadata.has_safe_filename() {
        return Err(parse_failed(format!(
            "unsafe archive file name '{}'",
            metadata.archive_filename
        )));
    }
    Ok(metadata)
}

/// Resolver that reads a JSON manifest from the mod page URL.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    timeout: Duration,
}

impl Default for ManifestResolver {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl ManifestResolver {
    /// Create a resolver with the given HTTP timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ModPageResolver for ManifestResolver {
    fn accepts(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }

    fn resolve(&self, url: &Url) -> ManagerResult<ModMetadata> {
        let fetch_failed = |reason: String| ManagerError::MetadataFetchFailed {
            url: url.to_string(),
            reason,
        };

        let client = build_client(self.timeout)
            .map_err(|e| fetch_failed(format!("failed to create HTTP client: {}", e)))?;
        let response = get(&client, url, self.timeout).map_err(|e| match e {
            ManagerError::DownloadFailed { reason, .. } => fetch_failed(reason),
            other => other,
        })?;

        let mut body = Vec::new();
        response
            .take(MAX_MANIFEST_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| fetch_failed(e.to_string()))?;

        debug!(url = %url, bytes = body.len(), "Fetched mod manifest");
        parse_manifest(url, &body)
    }
}
