//! Input resolution: turn a URL, a local path, or a byte buffer into raw
//! image bytes.
//!
//! Network access sits behind the [`ImageFetcher`] trait so tests and
//! callers with their own HTTP stack (cookies, proxies, a browser session
//! that already holds the captcha) can supply bytes without going through
//! reqwest.

use crate::error::CaptchaError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where the captcha image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaInput {
    /// Fetch over HTTP(S).
    Url(String),
    /// Read from the local file system.
    Path(PathBuf),
    /// Already-acquired encoded image bytes.
    Bytes(Vec<u8>),
}

impl CaptchaInput {
    /// Classify a user-supplied string as URL or path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            CaptchaInput::Url(input.to_string())
        } else {
            CaptchaInput::Path(PathBuf::from(input))
        }
    }

    /// Short description for logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            CaptchaInput::Url(url) => url.clone(),
            CaptchaInput::Path(path) => path.display().to_string(),
            CaptchaInput::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for CaptchaInput {
    fn from(bytes: Vec<u8>) -> Self {
        CaptchaInput::Bytes(bytes)
    }
}

impl From<&str> for CaptchaInput {
    fn from(input: &str) -> Self {
        CaptchaInput::parse(input)
    }
}

impl From<String> for CaptchaInput {
    fn from(input: String) -> Self {
        CaptchaInput::parse(&input)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Retrieves captcha bytes from a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<Vec<u8>, CaptchaError>;
}

/// Default fetcher: a plain GET via reqwest.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<Vec<u8>, CaptchaError> {
        info!("Downloading captcha from: {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CaptchaError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CaptchaError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                CaptchaError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(CaptchaError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                CaptchaError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                CaptchaError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if bytes.is_empty() {
            return Err(CaptchaError::DownloadFailed {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Resolve any input to a non-empty byte buffer.
pub async fn resolve_input(
    input: CaptchaInput,
    fetcher: &dyn ImageFetcher,
    timeout_secs: u64,
) -> Result<Vec<u8>, CaptchaError> {
    let origin = input.describe();
    let bytes = match input {
        CaptchaInput::Url(url) => fetcher.fetch(&url, timeout_secs).await?,
        CaptchaInput::Path(path) => read_local(path).await?,
        CaptchaInput::Bytes(bytes) => bytes,
    };

    if bytes.is_empty() {
        return Err(CaptchaError::EmptyImage { origin });
    }
    Ok(bytes)
}

async fn read_local(path: PathBuf) -> Result<Vec<u8>, CaptchaError> {
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local captcha: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CaptchaError::PermissionDenied { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CaptchaError::FileNotFound { path })
        }
        Err(e) => Err(CaptchaError::Internal(format!(
            "Failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}
