//! HTTP archive fetcher.
//!
//! Streams a remote archive into a staging file with progress callbacks.
//! A fresh blocking client is built for every fetch so it is created and
//! dropped on the worker thread, never inside the async runtime.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::debug;
use url::Url;

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::traits::ArchiveFetcher;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// User agent sent with every request.
pub(crate) const USER_AGENT: &str = concat!("modshelf/", env!("CARGO_PKG_VERSION"));

/// Build a blocking client with the given timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Send a GET request, mapping transport errors and non-success statuses.
pub(crate) fn get(client: &Client, url: &Url, timeout: Duration) -> ManagerResult<Response> {
    let response = client.get(url.as_str()).send().map_err(|e| {
        if e.is_timeout() {
            ManagerError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else {
            ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ManagerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("GET request failed with status {}", status),
        });
    }
    Ok(response)
}

/// HTTP-based archive fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub(crate) timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new fetcher with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new fetcher with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Stream the response body to the destination file.
    fn stream_to_file(
        &self,
        url: &Url,
        mut response: Response,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> ManagerResult<u64> {
        let total_size = response.content_length();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(dest).map_err(|e| ManagerError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;
        progress(0, total_size);

        loop {
            let bytes_read =
                response
                    .read(&mut buffer)
                    .map_err(|e| ManagerError::DownloadFailed {
                        url: url.to_string(),
                        reason: format!("Read error: {}", e),
                    })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| ManagerError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;
            progress(downloaded, total_size);
        }

        writer.flush().map_err(|e| ManagerError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if let Some(expected) = total_size {
            if downloaded != expected {
                return Err(ManagerError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("expected {} bytes, received {}", expected, downloaded),
                });
            }
        }

        Ok(downloaded)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &Url,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> ManagerResult<u64> {
        let client = build_client(self.timeout).map_err(|e| ManagerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("failed to create HTTP client: {}", e),
        })?;

        debug!(url = %url, dest = %dest.display(), "Fetching archive");
        let response = get(&client, url, self.timeout)?;
        self.stream_to_file(url, response, dest, progress)
    }
}
