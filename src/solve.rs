//! Solve entry points.
//!
//! [`solve`] runs the whole pipeline and returns a [`SolveOutput`] that keeps
//! placeholders visible, so the caller decides whether a partial answer is
//! worth submitting. [`solve_text`] is the legacy convenience: resolved
//! characters only, and an empty string instead of an error.

use crate::config::SolverConfig;
use crate::error::CaptchaError;
use crate::output::{SolveOutput, SolveStats};
use crate::pipeline::dump::DebugDump;
use crate::pipeline::input::{self, CaptchaInput, HttpFetcher, ImageFetcher};
use crate::pipeline::preprocess::{self, BinaryRaster};
use crate::pipeline::recognize::{CharRecognizer, LetterReader, Recognizer, TesseractRecognizer};
use crate::pipeline::segment;
use crate::pipeline::solver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// Solve a captcha from a URL, a local path, or raw bytes.
///
/// # Returns
/// `Ok(SolveOutput)` whenever the image could be read and binarised, even
/// if no attempt resolved every letter (check `output.status`).
///
/// # Errors
/// Returns `Err(CaptchaError)` only for fatal errors:
/// - the image could not be fetched or read
/// - the bytes are not a decodable image
/// - `solve_timeout_secs` elapsed
pub async fn solve(
    input: impl Into<CaptchaInput>,
    config: &SolverConfig,
) -> Result<SolveOutput, CaptchaError> {
    let input = input.into();
    match config.solve_timeout_secs {
        // Dropping the pipeline future does not kill an engine process
        // already running; it finishes on its own.
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), solve_inner(input, config))
            .await
            .map_err(|_| CaptchaError::SolveTimeout { secs })?,
        None => solve_inner(input, config).await,
    }
}

/// Solve already-acquired image bytes.
pub async fn solve_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &SolverConfig,
) -> Result<SolveOutput, CaptchaError> {
    solve(CaptchaInput::Bytes(bytes.into()), config).await
}

/// Legacy convenience: resolved characters only, `""` on any fatal error.
///
/// Errors are logged, never returned.
pub async fn solve_text(input: impl Into<CaptchaInput>, config: &SolverConfig) -> String {
    let input = input.into();
    let origin = input.describe();
    match solve(input, config).await {
        Ok(output) => {
            info!(
                "Using captcha result '{}' ({:?} after {} attempts)",
                output.text(),
                output.status,
                output.attempts
            );
            output.text()
        }
        Err(e) => {
            error!("Captcha solve failed for {}: {}", origin, e);
            String::new()
        }
    }
}

/// Synchronous wrapper around [`solve`].
///
/// Creates a temporary tokio runtime internally.
pub fn solve_sync(
    input: impl Into<CaptchaInput>,
    config: &SolverConfig,
) -> Result<SolveOutput, CaptchaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CaptchaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(solve(input, config))
}

/// Segment an existing raster and sweep it with a caller-supplied reader.
///
/// Skips acquisition, decoding and engine resolution entirely; useful for
/// alternative backends that need the box geometry rather than a glyph.
pub async fn solve_raster_with(
    reader: &dyn LetterReader,
    raster: &BinaryRaster,
    config: &SolverConfig,
) -> SolveOutput {
    let start = Instant::now();
    let boxes = segment::segment(raster, &config.segment);
    let segment_duration_ms = start.elapsed().as_millis() as u64;

    let recognition_start = Instant::now();
    let outcome = solver::solve_raster(reader, raster, &boxes, config).await;

    SolveOutput {
        result: outcome.result,
        status: outcome.status,
        attempts: outcome.attempts,
        boxes,
        width: raster.width(),
        height: raster.height(),
        stats: SolveStats {
            segment_duration_ms,
            recognition_duration_ms: recognition_start.elapsed().as_millis() as u64,
            total_duration_ms: start.elapsed().as_millis() as u64,
            recognizer_calls: outcome.reads,
            ..SolveStats::default()
        },
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn solve_inner(
    input: CaptchaInput,
    config: &SolverConfig,
) -> Result<SolveOutput, CaptchaError> {
    let total_start = Instant::now();
    info!("Solving captcha: {}", input.describe());

    // ── Step 1: Acquire bytes ────────────────────────────────────────────
    let acquire_start = Instant::now();
    let fetcher = resolve_fetcher(config);
    let bytes = input::resolve_input(input, fetcher.as_ref(), config.download_timeout_secs).await?;
    let acquire_duration_ms = acquire_start.elapsed().as_millis() as u64;

    let dump = config.debug.clone().map(DebugDump::new);
    if let Some(ref d) = dump {
        debug!("Debug dumps enabled: {}", d.dir().display());
        d.input(&bytes).await;
    }

    // ── Step 2: Binarise ─────────────────────────────────────────────────
    let preprocess_start = Instant::now();
    let cutoff = config.threshold;
    let raster = tokio::task::spawn_blocking(move || preprocess::preprocess(&bytes, cutoff))
        .await
        .map_err(|e| CaptchaError::Internal(format!("Preprocess task panicked: {}", e)))??;
    let preprocess_duration_ms = preprocess_start.elapsed().as_millis() as u64;
    trace!("Binary raster:\n{}", raster.to_ascii());

    if let Some(ref d) = dump {
        d.raster(&raster).await;
    }

    // ── Step 3: Segment + sweep ──────────────────────────────────────────
    let engine = resolve_recognizer(config);
    debug!("Recognition engine: {}", engine.name());
    let reader = Recognizer::new(engine, config.alphabet.clone()).with_dump(dump);

    let mut output = solve_raster_with(&reader, &raster, config).await;
    output.stats.acquire_duration_ms = acquire_duration_ms;
    output.stats.preprocess_duration_ms = preprocess_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Captcha {:?}: '{}' after {} attempts, {}ms total",
        output.status, output.result, output.attempts, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Pre-built fetcher from the config, else plain HTTP.
fn resolve_fetcher(config: &SolverConfig) -> Arc<dyn ImageFetcher> {
    match config.fetcher {
        Some(ref fetcher) => Arc::clone(fetcher),
        None => Arc::new(HttpFetcher),
    }
}

/// Pre-built engine from the config, else Tesseract.
fn resolve_recognizer(config: &SolverConfig) -> Arc<dyn CharRecognizer> {
    match config.recognizer {
        Some(ref recognizer) => Arc::clone(recognizer),
        None => Arc::new(TesseractRecognizer::from_config(&config.tesseract)),
    }
}
