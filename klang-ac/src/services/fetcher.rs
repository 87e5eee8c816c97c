//! Remote audio retrieval
//!
//! Downloads an http(s) resource into a named temp file. The scheme is
//! validated before any network I/O, the response must advertise an
//! `audio/*` content type, and the transfer is bounded by the configured
//! timeout. The temp file is deleted when `FetchedAudio` drops, so every
//! exit path releases the storage.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Url;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use klang_common::{Error, Result};

/// Connection establishment timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A locally materialized audio resource. Dropping it deletes the file.
#[derive(Debug)]
pub struct FetchedAudio {
    file: NamedTempFile,
    /// Content type reported by the origin
    pub content_type: String,
}

impl FetchedAudio {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// HTTP retrieval client with explicit timeouts.
pub struct AudioFetcher {
    client: reqwest::Client,
}

impl AudioFetcher {
    /// Build a fetcher whose total request time is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url` into a temp file.
    ///
    /// Client faults (bad scheme, HTTP error status, non-audio content
    /// type, network failure) surface as `Error::Input` with the cause.
    pub async fn fetch(&self, url: &str) -> Result<FetchedAudio> {
        let parsed =
            Url::parse(url).map_err(|e| Error::Input(format!("invalid URL {:?}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Input(format!(
                "only http(s) URLs are supported, got scheme {:?}",
                parsed.scheme()
            )));
        }

        debug!(url, "Starting download");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::Input(format!("failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Input(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.starts_with("audio") {
            warn!(url, content_type, "Rejecting non-audio content type");
            return Err(Error::Input(format!(
                "URL does not point to an audio file, server reported content type {:?}",
                content_type
            )));
        }

        // Suffix from the final URL keeps the decoder's format hint useful
        let suffix = suffix_for(response.url());
        let mut file = tempfile::Builder::new()
            .prefix("klang-audio-")
            .suffix(&suffix)
            .tempfile()
            .map_err(Error::Io)?;

        let mut stream = response.bytes_stream();
        let mut bytes_written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::Input(format!("download from {} failed: {}", url, e)))?;
            file.as_file_mut().write_all(&chunk).map_err(Error::Io)?;
            bytes_written += chunk.len() as u64;
        }
        file.as_file_mut().flush().map_err(Error::Io)?;

        info!(url, bytes = bytes_written, path = %file.path().display(), "Download complete");

        Ok(FetchedAudio { file, content_type })
    }
}

/// File suffix (including the dot) derived from the URL path, empty when
/// the path has no extension.
fn suffix_for(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
