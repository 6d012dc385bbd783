//! Configuration types for captcha solving.
//!
//! All solver behaviour is controlled through [`SolverConfig`], built via its
//! [`SolverConfigBuilder`]. The heuristic constants (threshold, letter width
//! window, rotation schedule) live here as fields rather than literals so a
//! different captcha font can be tuned without touching the pipeline.
//!
//! Debug dumps are switched on through [`SolverConfig::debug`] only; there is
//! no process-wide flag.

use crate::error::CaptchaError;
use crate::pipeline::input::ImageFetcher;
use crate::pipeline::recognize::CharRecognizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Letters accepted from the engine. I, O and Q are left out because the
/// captcha font renders them too close to 1, 0 and each other.
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHJKLMNPRSTUVWXYZ";

/// Luma cutoff: anything at or above it becomes background.
pub const DEFAULT_THRESHOLD: u8 = 240;

/// Upper bound accepted for `letter_count`.
pub const MAX_LETTER_COUNT: usize = 64;

/// Upper bound accepted for `max_letter_width`, in pixels.
pub const MAX_LETTER_WIDTH: u32 = 4096;

/// Configuration for a captcha solve.
///
/// # Example
/// ```rust
/// use captcha_solver::SolverConfig;
///
/// let config = SolverConfig::builder()
///     .threshold(230)
///     .max_attempts(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.rotation.max_attempts, 8);
/// ```
#[derive(Clone)]
pub struct SolverConfig {
    /// Binarisation cutoff applied after contrast normalisation. Default: 240.
    ///
    /// The captcha draws dark glyphs on a light, noisy background. A high
    /// cutoff keeps every pixel that is even slightly darker than paper as
    /// ink; the density minima still find the gaps because noise is sparse.
    pub threshold: u8,

    /// Letter count and width window used by the segmenter.
    pub segment: SegmentParams,

    /// Rotation sweep across retry attempts.
    pub rotation: RotationSchedule,

    /// Characters the recognition engine may return.
    pub alphabet: String,

    /// Letter reads in flight within one attempt. Default: 1 (sequential).
    ///
    /// Boxes are disjoint regions of an immutable raster, so reading them in
    /// parallel is safe. Results are reassembled by box index either way.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Timeout for the whole solve in seconds. Default: None (unbounded).
    ///
    /// Enforced by wrapping the pipeline; an engine call already running
    /// when the deadline passes is left to finish on its own.
    pub solve_timeout_secs: Option<u64>,

    /// Settings for the built-in Tesseract backend.
    pub tesseract: TesseractConfig,

    /// Pre-constructed recognition backend. Takes precedence over `tesseract`.
    pub recognizer: Option<Arc<dyn CharRecognizer>>,

    /// Pre-constructed image fetcher. Default: HTTP via reqwest.
    pub fetcher: Option<Arc<dyn ImageFetcher>>,

    /// Optional progress events (attempt start/complete).
    pub progress_callback: Option<ProgressCallback>,

    /// Write intermediate images for offline inspection. Default: None.
    pub debug: Option<DebugConfig>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            segment: SegmentParams::default(),
            rotation: RotationSchedule::default(),
            alphabet: DEFAULT_ALPHABET.to_string(),
            concurrency: 1,
            download_timeout_secs: 30,
            solve_timeout_secs: None,
            tesseract: TesseractConfig::default(),
            recognizer: None,
            fetcher: None,
            progress_callback: None,
            debug: None,
        }
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("threshold", &self.threshold)
            .field("segment", &self.segment)
            .field("rotation", &self.rotation)
            .field("alphabet", &self.alphabet)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("solve_timeout_secs", &self.solve_timeout_secs)
            .field("tesseract", &self.tesseract)
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|r| r.name().to_string()),
            )
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn ImageFetcher>"))
            .field("debug", &self.debug)
            .finish()
    }
}

impl SolverConfig {
    /// Create a new builder for `SolverConfig`.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SolverConfig`].
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl fmt::Debug for SolverConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SolverConfigBuilder {
    pub fn threshold(mut self, t: u8) -> Self {
        self.config.threshold = t;
        self
    }

    pub fn letter_count(mut self, n: usize) -> Self {
        self.config.segment.letter_count = n;
        self
    }

    pub fn letter_width(mut self, min: u32, max: u32) -> Self {
        self.config.segment.min_letter_width = min;
        self.config.segment.max_letter_width = max;
        self
    }

    pub fn rotation_start_deg(mut self, deg: i32) -> Self {
        self.config.rotation.start_deg = deg;
        self
    }

    pub fn rotation_step_deg(mut self, deg: i32) -> Self {
        self.config.rotation.step_deg = deg;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.rotation.max_attempts = n;
        self
    }

    pub fn alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.config.alphabet = alphabet.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, 16);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn solve_timeout_secs(mut self, secs: u64) -> Self {
        self.config.solve_timeout_secs = Some(secs);
        self
    }

    pub fn tesseract(mut self, tesseract: TesseractConfig) -> Self {
        self.config.tesseract = tesseract;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn CharRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn debug(mut self, debug: DebugConfig) -> Self {
        self.config.debug = Some(debug);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SolverConfig, CaptchaError> {
        let c = &self.config;
        if c.segment.letter_count == 0 || c.segment.letter_count > MAX_LETTER_COUNT {
            return Err(CaptchaError::InvalidConfig(format!(
                "Letter count must be in 1..={}, got {}",
                MAX_LETTER_COUNT, c.segment.letter_count
            )));
        }
        if c.segment.min_letter_width == 0
            || c.segment.min_letter_width > c.segment.max_letter_width
            || c.segment.max_letter_width > MAX_LETTER_WIDTH
        {
            return Err(CaptchaError::InvalidConfig(format!(
                "Letter width window must satisfy 1 ≤ min ≤ max ≤ {}, got {}–{}",
                MAX_LETTER_WIDTH, c.segment.min_letter_width, c.segment.max_letter_width
            )));
        }
        if c.rotation.max_attempts == 0 {
            return Err(CaptchaError::InvalidConfig(
                "Max attempts must be ≥ 1".into(),
            ));
        }
        if c.alphabet.trim().is_empty() {
            return Err(CaptchaError::InvalidConfig(
                "Alphabet must not be empty".into(),
            ));
        }
        if c.alphabet.chars().any(char::is_whitespace) {
            return Err(CaptchaError::InvalidConfig(
                "Alphabet must not contain whitespace".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Parameter groups ─────────────────────────────────────────────────────

/// Segmentation window. A box's extent always lies in
/// `min_letter_width..=max_letter_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParams {
    pub letter_count: usize,
    pub min_letter_width: u32,
    pub max_letter_width: u32,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            letter_count: 6,
            min_letter_width: 14,
            max_letter_width: 33,
        }
    }
}

/// Deskew sweep: attempt `k` rotates by `start_deg + k * step_deg`, with the
/// sign alternating by box index (even boxes negative, odd boxes positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSchedule {
    pub start_deg: i32,
    pub step_deg: i32,
    pub max_attempts: u32,
}

impl Default for RotationSchedule {
    fn default() -> Self {
        Self {
            start_deg: 14,
            step_deg: 2,
            max_attempts: 12,
        }
    }
}

impl RotationSchedule {
    /// Unsigned rotation magnitude in degrees for `attempt` (0-based).
    pub fn magnitude(&self, attempt: u32) -> i32 {
        self.start_deg + self.step_deg * attempt as i32
    }

    /// Signed angle for one box on one attempt.
    pub fn angle_for(&self, attempt: u32, box_index: usize) -> i32 {
        let magnitude = self.magnitude(attempt);
        if box_index % 2 == 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Settings for the `tesseract` command-line backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Executable path. None: `TESSERACT_PATH`, else `tesseract` on `PATH`.
    pub executable: Option<PathBuf>,
    /// Explicit `--tessdata-dir`. None: the engine's own lookup.
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    /// OCR engine mode (1 = LSTM only).
    pub oem: u8,
    /// Page segmentation mode (10 = single character).
    pub psm: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            oem: 1,
            psm: 10,
        }
    }
}

/// Which intermediate images to write, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Target directory; created on first write.
    pub dir: PathBuf,
    /// The raw input bytes, once per solve.
    pub input: bool,
    /// The binary raster, once per solve.
    pub raster: bool,
    /// Every rotated letter on every attempt.
    pub letters: bool,
    /// Rotated letters the engine could not read.
    pub unresolved: bool,
}

impl DebugConfig {
    /// Dump everything into `dir`.
    pub fn all(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            input: true,
            raster: true,
            letters: true,
            unresolved: true,
        }
    }
}
