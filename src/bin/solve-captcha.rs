//! CLI binary for captcha-solver.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SolverConfig` and prints the result. Exits 0 when every letter
//! resolved, 2 when the sweep ran out of attempts.

use anyhow::{Context, Result};
use captcha_solver::{
    solve, CaptchaInput, DebugConfig, ProgressCallback, SolveOutput, SolveProgressCallback,
    SolveStatus, SolverConfig, TesseractConfig, DEFAULT_ALPHABET, DEFAULT_THRESHOLD,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over attempts plus a log line per attempt.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_solve_start
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading captcha…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SolveProgressCallback for CliProgressCallback {
    fn on_solve_start(&self, letter_count: usize, max_attempts: u32) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos:>2}/{len} attempts  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(max_attempts as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Solving");
        self.bar
            .set_message(format!("{letter_count} letters segmented"));
    }

    fn on_attempt_start(&self, _attempt: u32, magnitude: i32) {
        self.bar.set_message(format!("±{magnitude}°"));
    }

    fn on_attempt_complete(&self, attempt: u32, resolved: usize, marked: &str) {
        let complete = resolved == marked.chars().count();
        self.bar.println(format!(
            "  {} Attempt {:>2}  {}  {}",
            if complete { green("✓") } else { red("✗") },
            attempt + 1,
            bold(marked),
            dim(&format!("{resolved} resolved")),
        ));
        self.bar.inc(1);
    }

    fn on_solve_complete(&self, _accepted: bool, _attempts: u32) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Solve a local captcha image
  solve-captcha captcha.jpg

  # Solve from a URL, JSON output with boxes and stats
  solve-captcha --json https://example.com/captcha.jpg

  # Dump the binary raster and every rotated letter
  solve-captcha --debug-dir ./dumps captcha.jpg

  # Wider sweep for a heavily distorted font
  solve-captcha --attempts 20 --rotation-start 8 captcha.jpg

ENVIRONMENT VARIABLES:
  TESSERACT_PATH   Path to the tesseract executable (default: tesseract on PATH)
  TESSDATA_PREFIX  Tesseract language data directory
  RUST_LOG         Log filter, overrides --verbose/--quiet

EXIT STATUS:
  0  every letter resolved
  1  the image could not be read or decoded
  2  attempts exhausted; the best-effort result is still printed
"#;

/// Solve six-letter text captchas with a rotation-sweep OCR loop.
#[derive(clap::Parser, Debug)]
#[command(
    name = "solve-captcha",
    version,
    about = "Solve six-letter text captchas with a rotation-sweep OCR loop",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Binarisation cutoff (luma at or above becomes background).
    #[arg(long, env = "CAPTCHA_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Letters per captcha.
    #[arg(long, env = "CAPTCHA_LETTERS", default_value_t = 6)]
    letters: usize,

    /// Narrowest letter width in pixels.
    #[arg(long, env = "CAPTCHA_MIN_WIDTH", default_value_t = 14)]
    min_width: u32,

    /// Widest letter width in pixels.
    #[arg(long, env = "CAPTCHA_MAX_WIDTH", default_value_t = 33)]
    max_width: u32,

    /// Maximum recognition attempts.
    #[arg(long, env = "CAPTCHA_ATTEMPTS", default_value_t = 12)]
    attempts: u32,

    /// Rotation of the first attempt, in degrees.
    #[arg(long, env = "CAPTCHA_ROTATION_START", default_value_t = 14)]
    rotation_start: i32,

    /// Extra rotation per attempt, in degrees.
    #[arg(long, env = "CAPTCHA_ROTATION_STEP", default_value_t = 2)]
    rotation_step: i32,

    /// Characters the engine may return.
    #[arg(long, env = "CAPTCHA_ALPHABET", default_value = DEFAULT_ALPHABET)]
    alphabet: String,

    /// Letter reads in flight per attempt.
    #[arg(short, long, env = "CAPTCHA_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_PATH")]
    tesseract: Option<PathBuf>,

    /// Tesseract language data directory.
    #[arg(long)]
    tessdata_dir: Option<PathBuf>,

    /// Tesseract language.
    #[arg(long, env = "CAPTCHA_LANG", default_value = "eng")]
    lang: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CAPTCHA_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Timeout for the whole solve in seconds.
    #[arg(long, env = "CAPTCHA_TIMEOUT")]
    timeout: Option<u64>,

    /// Write input, raster and letter images to this directory.
    #[arg(long, env = "CAPTCHA_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// With --debug-dir: only dump letters the engine could not read.
    #[arg(long, requires = "debug_dir")]
    unresolved_only: bool,

    /// Output structured JSON (SolveOutput) instead of the plain answer.
    #[arg(long, env = "CAPTCHA_JSON")]
    json: bool,

    /// Print placeholders for unresolved letters.
    #[arg(long)]
    marked: bool,

    /// Disable progress bar.
    #[arg(long, env = "CAPTCHA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CAPTCHA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CAPTCHA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SolveProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run solve ────────────────────────────────────────────────────────
    let output = solve(CaptchaInput::parse(&cli.input), &config)
        .await
        .with_context(|| format!("Failed to solve captcha '{}'", cli.input))?;

    print_output(&cli, &output)?;

    if output.status == SolveStatus::Exhausted {
        std::process::exit(2);
    }
    Ok(())
}

/// Map CLI args to `SolverConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SolverConfig> {
    let mut builder = SolverConfig::builder()
        .threshold(cli.threshold)
        .letter_count(cli.letters)
        .letter_width(cli.min_width, cli.max_width)
        .max_attempts(cli.attempts)
        .rotation_start_deg(cli.rotation_start)
        .rotation_step_deg(cli.rotation_step)
        .alphabet(cli.alphabet.clone())
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .tesseract(TesseractConfig {
            executable: cli.tesseract.clone(),
            tessdata_dir: cli.tessdata_dir.clone(),
            language: cli.lang.clone(),
            ..TesseractConfig::default()
        });

    if let Some(secs) = cli.timeout {
        builder = builder.solve_timeout_secs(secs);
    }
    if let Some(ref dir) = cli.debug_dir {
        let debug = if cli.unresolved_only {
            DebugConfig {
                dir: dir.clone(),
                input: false,
                raster: false,
                letters: false,
                unresolved: true,
            }
        } else {
            DebugConfig::all(dir.clone())
        };
        builder = builder.debug(debug);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_output(cli: &Cli, output: &SolveOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let answer = if cli.marked {
        output.result.marked()
    } else {
        output.text()
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{answer}").context("Failed to write to stdout")?;

    if !cli.quiet {
        let verdict = match output.status {
            SolveStatus::Accepted => green("✔ solved"),
            SolveStatus::Exhausted => red("✘ exhausted"),
        };
        eprintln!(
            "{}  {}  {}/{} resolved  {} attempts  {}ms",
            verdict,
            bold(&output.result.marked()),
            output.result.resolved_count(),
            output.result.len(),
            output.attempts,
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}
