//! # captcha-solver
//!
//! Decode distorted six-letter text captchas into plaintext without a human
//! solving service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input       fetch URL / read file / take bytes
//!  ├─ 2. Binarise    grayscale, stretch contrast, threshold at 240
//!  ├─ 3. Segment     six boxes cut at column-density minima (once)
//!  ├─ 4. Sweep       up to 12 attempts, rotation 14°, 16°, … alternating sign
//!  │    └─ Recognise crop → rotate → single-character engine, per box
//!  └─ 5. Output      CaptchaResult with placeholders + status + stats
//! ```
//!
//! Per-letter failures never abort a solve: they become placeholders and the
//! next attempt tries a steeper rotation. Only acquisition and decode
//! failures are returned as errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use captcha_solver::{solve, SolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Uses the `tesseract` binary on PATH (or TESSERACT_PATH).
//!     let config = SolverConfig::default();
//!     let output = solve("https://example.com/captcha.jpg", &config).await?;
//!     if output.is_accepted() {
//!         println!("{}", output.text());
//!     } else {
//!         eprintln!("best effort: {}", output.result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Bringing your own engine
//!
//! Implement [`CharRecognizer`] and pass it with
//! [`SolverConfigBuilder::recognizer`]; segmentation and the retry loop are
//! unchanged.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `solve-captcha` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod solve;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DebugConfig, RotationSchedule, SegmentParams, SolverConfig, SolverConfigBuilder,
    TesseractConfig, DEFAULT_ALPHABET, DEFAULT_THRESHOLD, MAX_LETTER_COUNT, MAX_LETTER_WIDTH,
};
pub use error::{CaptchaError, RecognitionError};
pub use output::{CaptchaResult, SolveOutput, SolveStats, SolveStatus, Symbol, PLACEHOLDER};
pub use pipeline::input::{CaptchaInput, HttpFetcher, ImageFetcher};
pub use pipeline::preprocess::{preprocess, BinaryRaster};
pub use pipeline::recognize::{CharRecognizer, LetterReader, Recognizer, TesseractRecognizer};
pub use pipeline::segment::{segment, DensitySample, LetterBox};
pub use progress::{NoopProgressCallback, ProgressCallback, SolveProgressCallback};
pub use solve::{solve, solve_bytes, solve_raster_with, solve_sync, solve_text};
