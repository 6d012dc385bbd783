//! Error types for the captcha-solver library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CaptchaError`] — **Fatal**: the solve cannot proceed at all (image
//!   could not be fetched, bytes are not a decodable image, bad config).
//!   Returned as `Err(CaptchaError)` from the top-level `solve*` functions.
//!
//! * [`RecognitionError`] — **Non-fatal**: a single character slot failed
//!   (engine missing, engine crashed, empty crop). It is logged and turned
//!   into a placeholder; the attempt and the retry loop carry on.
//!
//! Running out of attempts is not an error at all: it is reported as
//! [`crate::output::SolveStatus::Exhausted`] alongside the best-effort result.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the captcha-solver library.
#[derive(Debug, Error)]
pub enum CaptchaError {
    // ── Acquisition errors ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Captcha image not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP download failed (transport error or non-success status).
    #[error("Failed to download captcha '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Captcha download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The acquired buffer holds no bytes.
    #[error("Captcha image from {origin} is empty")]
    EmptyImage { origin: String },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The bytes are not an image the decoder understands.
    #[error("Failed to decode captcha image: {detail}")]
    DecodeFailed { detail: String },

    // ── Control errors ────────────────────────────────────────────────────
    /// The whole solve exceeded `solve_timeout_secs`.
    #[error("Captcha solve timed out after {secs}s")]
    SolveTimeout { secs: u64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaptchaError {
    /// True when the image could not be obtained at all.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            CaptchaError::FileNotFound { .. }
                | CaptchaError::PermissionDenied { .. }
                | CaptchaError::DownloadFailed { .. }
                | CaptchaError::DownloadTimeout { .. }
                | CaptchaError::EmptyImage { .. }
        )
    }

    /// True when the image was obtained but could not be binarised.
    pub fn is_decode(&self) -> bool {
        matches!(self, CaptchaError::DecodeFailed { .. })
    }
}

/// A non-fatal error for a single character slot.
///
/// Never escapes the solver loop; the slot becomes a placeholder.
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// The engine could not be started (binary missing, not executable).
    #[error("Recognition engine '{engine}' unavailable: {detail}")]
    EngineUnavailable { engine: String, detail: String },

    /// The engine ran but reported failure.
    #[error("Recognition engine '{engine}' failed: {detail}")]
    EngineFailed { engine: String, detail: String },

    /// The letter box does not overlap the raster.
    #[error("Letter {index}: box lies outside the raster")]
    EmptyGlyph { index: usize },

    /// Scratch file handling around the engine call failed.
    #[error("Recognition I/O error: {0}")]
    Io(String),
}
