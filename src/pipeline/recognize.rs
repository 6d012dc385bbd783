//! Single-letter recognition: crop, rotate, ask the engine.
//!
//! Two seams live here:
//!
//! * [`CharRecognizer`] — the engine capability. Given one glyph image and
//!   the permitted alphabet it returns one character or nothing. The
//!   built-in [`TesseractRecognizer`] shells out to the `tesseract` binary;
//!   any other backend can be dropped in through the config.
//! * [`LetterReader`] — what the solver loop drives. [`Recognizer`] is the
//!   production implementation; tests substitute stubs to observe the exact
//!   boxes and angles the loop asks for.
//!
//! A failed read is never fatal here. Engine errors and empty output both
//! come back as [`Symbol::Placeholder`].

use crate::config::TesseractConfig;
use crate::error::RecognitionError;
use crate::output::Symbol;
use crate::pipeline::dump::DebugDump;
use crate::pipeline::encode::encode_png;
use crate::pipeline::postprocess::clean_symbol;
use crate::pipeline::preprocess::{BinaryRaster, BACKGROUND};
use crate::pipeline::segment::LetterBox;
use async_trait::async_trait;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Recognises one character from one glyph image.
#[async_trait]
pub trait CharRecognizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// `Ok(None)` means the engine saw nothing it could map to `alphabet`.
    async fn recognize_char(
        &self,
        glyph: &GrayImage,
        alphabet: &str,
    ) -> Result<Option<char>, RecognitionError>;
}

/// Reads the letter inside one box at one rotation.
#[async_trait]
pub trait LetterReader: Send + Sync {
    async fn read_letter(
        &self,
        raster: &BinaryRaster,
        letter: &LetterBox,
        index: usize,
        attempt: u32,
        angle_deg: i32,
    ) -> Symbol;
}

// ── Tesseract backend ────────────────────────────────────────────────────

/// Runs the `tesseract` CLI in single-character mode.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
    oem: u8,
    psm: u8,
}

impl TesseractRecognizer {
    /// Resolve the executable: explicit config, then `TESSERACT_PATH`, then
    /// `tesseract` on `PATH`.
    pub fn from_config(config: &TesseractConfig) -> Self {
        let executable = config
            .executable
            .clone()
            .or_else(|| {
                std::env::var_os("TESSERACT_PATH")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        Self {
            executable,
            tessdata_dir: config.tessdata_dir.clone(),
            language: config.language.clone(),
            oem: config.oem,
            psm: config.psm,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments after the executable: `<input> stdout` followed by options.
    fn command_args(&self, input: &Path, alphabet: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.language.clone().into(),
            "--oem".into(),
            self.oem.to_string().into(),
            "--psm".into(),
            self.psm.to_string().into(),
        ];
        if let Some(ref dir) = self.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_owned());
        }
        args.push("-c".into());
        args.push(format!("tessedit_char_whitelist={alphabet}").into());
        args
    }
}

#[async_trait]
impl CharRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize_char(
        &self,
        glyph: &GrayImage,
        alphabet: &str,
    ) -> Result<Option<char>, RecognitionError> {
        let png = encode_png(glyph).map_err(|e| RecognitionError::Io(e.to_string()))?;
        let scratch =
            NamedTempFile::with_suffix(".png").map_err(|e| RecognitionError::Io(e.to_string()))?;
        tokio::fs::write(scratch.path(), &png)
            .await
            .map_err(|e| RecognitionError::Io(e.to_string()))?;

        // The task owns the scratch file and the pipes, so a caller that
        // stops waiting (solve timeout) leaves the engine run intact.
        let scratch = scratch.into_temp_path();
        let mut command = Command::new(&self.executable);
        command.args(self.command_args(&scratch, alphabet));
        let run = tokio::spawn(async move {
            let output = command.output().await;
            drop(scratch);
            output
        });

        let output = run
            .await
            .map_err(|e| RecognitionError::Io(format!("engine task failed: {}", e)))?
            .map_err(|e| RecognitionError::EngineUnavailable {
                engine: self.name().to_string(),
                detail: format!("{}: {}", self.executable.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::EngineFailed {
                engine: self.name().to_string(),
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(clean_symbol(&stdout, alphabet))
    }
}

// ── Glyph geometry ───────────────────────────────────────────────────────

/// Cut the box out of the raster, clipped to the raster bounds.
pub fn crop_letter(
    raster: &BinaryRaster,
    letter: &LetterBox,
    index: usize,
) -> Result<GrayImage, RecognitionError> {
    let x0 = letter.left.min(raster.width());
    let x1 = letter.right().min(raster.width());
    let y0 = letter.top.min(raster.height());
    let y1 = (letter.top + letter.height).min(raster.height());
    if x1 <= x0 || y1 <= y0 {
        return Err(RecognitionError::EmptyGlyph { index });
    }
    Ok(image::imageops::crop_imm(raster.as_image(), x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Rotate about the centre onto a canvas large enough to hold every
/// corner, filling exposed area with background. Positive is clockwise.
///
/// Nearest-neighbour sampling keeps the glyph strictly binary.
pub fn rotate_glyph(glyph: &GrayImage, angle_deg: i32) -> GrayImage {
    if angle_deg == 0 || glyph.width() == 0 || glyph.height() == 0 {
        return glyph.clone();
    }

    let theta = (angle_deg as f32).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (glyph.width() as f32, glyph.height() as f32);
    let out_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;

    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(theta)
        * Projection::translate(-w / 2.0, -h / 2.0);

    let mut out = GrayImage::from_pixel(out_w, out_h, Luma([BACKGROUND]));
    warp_into(
        glyph,
        &projection,
        Interpolation::Nearest,
        Luma([BACKGROUND]),
        &mut out,
    );
    out
}

// ── Production reader ────────────────────────────────────────────────────

/// Crop → rotate → engine, with failures absorbed as placeholders.
pub struct Recognizer {
    engine: Arc<dyn CharRecognizer>,
    alphabet: String,
    dump: Option<DebugDump>,
}

impl Recognizer {
    pub fn new(engine: Arc<dyn CharRecognizer>, alphabet: impl Into<String>) -> Self {
        Self {
            engine,
            alphabet: alphabet.into(),
            dump: None,
        }
    }

    /// Write rotated letters through `dump` as configured.
    pub fn with_dump(mut self, dump: Option<DebugDump>) -> Self {
        self.dump = dump;
        self
    }

    /// Like [`LetterReader::read_letter`], but surfaces the failure cause.
    pub async fn recognize(
        &self,
        raster: &BinaryRaster,
        letter: &LetterBox,
        index: usize,
        attempt: u32,
        angle_deg: i32,
    ) -> Result<Option<char>, RecognitionError> {
        let crop = crop_letter(raster, letter, index)?;
        let glyph = rotate_glyph(&crop, angle_deg);

        let result = self
            .engine
            .recognize_char(&glyph, &self.alphabet)
            .await
            .map(|c| c.filter(|c| self.alphabet.contains(*c)));

        if let Some(ref dump) = self.dump {
            let resolved = matches!(result, Ok(Some(_)));
            dump.letter(attempt, index, &glyph, resolved).await;
        }
        result
    }
}

#[async_trait]
impl LetterReader for Recognizer {
    async fn read_letter(
        &self,
        raster: &BinaryRaster,
        letter: &LetterBox,
        index: usize,
        attempt: u32,
        angle_deg: i32,
    ) -> Symbol {
        match self.recognize(raster, letter, index, attempt, angle_deg).await {
            Ok(Some(c)) => Symbol::Resolved(c),
            Ok(None) => {
                debug!(
                    "Letter {}: {} returned nothing at {}°",
                    index,
                    self.engine.name(),
                    angle_deg
                );
                Symbol::Placeholder
            }
            Err(e) => {
                warn!("Letter {}: {}", index, e);
                Symbol::Placeholder
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ALPHABET;
    use std::sync::Mutex;

    struct FixedEngine {
        answer: Result<Option<char>, RecognitionError>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl FixedEngine {
        fn new(answer: Result<Option<char>, RecognitionError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CharRecognizer for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize_char(
            &self,
            glyph: &GrayImage,
            _alphabet: &str,
        ) -> Result<Option<char>, RecognitionError> {
            self.seen
                .lock()
                .unwrap()
                .push((glyph.width(), glyph.height()));
            self.answer.clone()
        }
    }

    fn block_raster() -> BinaryRaster {
        let gray = GrayImage::from_fn(60, 30, |x, y| {
            if (10..30).contains(&x) && (5..25).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        BinaryRaster::from_gray(&gray)
    }

    fn letter(left: u32, width: u32) -> LetterBox {
        LetterBox {
            left,
            top: 0,
            width,
            height: 30,
        }
    }

    #[test]
    fn crop_clips_to_raster() {
        let raster = block_raster();
        let crop = crop_letter(&raster, &letter(50, 20), 0).unwrap();
        assert_eq!((crop.width(), crop.height()), (10, 30));
    }

    #[test]
    fn crop_outside_raster_is_empty_glyph() {
        let raster = block_raster();
        let err = crop_letter(&raster, &letter(60, 14), 3).unwrap_err();
        assert!(matches!(err, RecognitionError::EmptyGlyph { index: 3 }));
    }

    #[test]
    fn rotation_expands_canvas_and_stays_binary() {
        let glyph = GrayImage::from_pixel(20, 30, Luma([0]));
        let rotated = rotate_glyph(&glyph, -30);
        assert!(rotated.width() > 20);
        assert!(rotated.height() > 30);
        assert!(rotated.pixels().all(|p| p[0] == 0 || p[0] == 255));
        // Corners of the expanded canvas are background.
        assert_eq!(rotated.get_pixel(0, 0)[0], 255);
        // Centre stays ink.
        assert_eq!(
            rotated.get_pixel(rotated.width() / 2, rotated.height() / 2)[0],
            0
        );
    }

    #[test]
    fn zero_rotation_is_identity() {
        let glyph = GrayImage::from_fn(7, 9, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        assert_eq!(rotate_glyph(&glyph, 0), glyph);
    }

    #[test]
    fn tesseract_args_restrict_alphabet() {
        let t = TesseractRecognizer::from_config(&TesseractConfig {
            executable: Some(PathBuf::from("/opt/tess/bin/tesseract")),
            tessdata_dir: Some(PathBuf::from("/opt/tess/share")),
            ..TesseractConfig::default()
        });
        assert_eq!(t.executable(), Path::new("/opt/tess/bin/tesseract"));
        let args: Vec<String> = t
            .command_args(Path::new("/tmp/g.png"), "ABC")
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args[0], "/tmp/g.png");
        assert_eq!(args[1], "stdout");
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "10"));
        assert!(args.windows(2).any(|w| w[0] == "--oem" && w[1] == "1"));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--tessdata-dir" && w[1] == "/opt/tess/share"));
        assert_eq!(args.last().unwrap(), "tessedit_char_whitelist=ABC");
    }

    #[tokio::test]
    async fn missing_tesseract_binary_is_engine_unavailable() {
        let t = TesseractRecognizer::from_config(&TesseractConfig {
            executable: Some(PathBuf::from("/nonexistent/bin/tesseract-missing")),
            ..TesseractConfig::default()
        });
        let glyph = GrayImage::from_pixel(14, 30, Luma([255]));
        let err = t.recognize_char(&glyph, DEFAULT_ALPHABET).await.unwrap_err();
        assert!(matches!(err, RecognitionError::EngineUnavailable { .. }));
    }

    /// Writes an executable shell script standing in for `tesseract`.
    #[cfg(unix)]
    fn fake_engine(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_stdout_is_cleaned_into_symbol() {
        let tmp = tempfile::tempdir().unwrap();
        let t = TesseractRecognizer::from_config(&TesseractConfig {
            executable: Some(fake_engine(tmp.path(), "printf 'k\\n\\f'")),
            ..TesseractConfig::default()
        });
        let glyph = GrayImage::from_pixel(14, 30, Luma([255]));
        let symbol = t.recognize_char(&glyph, DEFAULT_ALPHABET).await.unwrap();
        assert_eq!(symbol, Some('K'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_nonzero_exit_is_engine_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let t = TesseractRecognizer::from_config(&TesseractConfig {
            executable: Some(fake_engine(tmp.path(), "echo 'read error' >&2\nexit 3")),
            ..TesseractConfig::default()
        });
        let glyph = GrayImage::from_pixel(14, 30, Luma([255]));
        let err = t.recognize_char(&glyph, DEFAULT_ALPHABET).await.unwrap_err();
        match err {
            RecognitionError::EngineFailed { detail, .. } => {
                assert!(detail.contains("read error"), "got: {detail}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_call_still_reads_its_glyph() {
        let tmp = tempfile::tempdir().unwrap();
        let copy = tmp.path().join("seen.png");
        let body = format!(
            "sleep 1\ncp \"$1\" '{0}.part'\nmv '{0}.part' '{0}'\necho K",
            copy.display()
        );
        let t = TesseractRecognizer::from_config(&TesseractConfig {
            executable: Some(fake_engine(tmp.path(), &body)),
            ..TesseractConfig::default()
        });
        let glyph = GrayImage::from_pixel(14, 30, Luma([0]));

        let cut = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            t.recognize_char(&glyph, DEFAULT_ALPHABET),
        )
        .await;
        assert!(cut.is_err());

        // The engine keeps running and finds its scratch PNG in place.
        let mut waited = 0;
        while !copy.exists() && waited < 50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            waited += 1;
        }
        let png = std::fs::read(&copy).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded, glyph);
    }

    #[tokio::test]
    async fn resolved_engine_output_becomes_symbol() {
        let engine = FixedEngine::new(Ok(Some('K')));
        let reader = Recognizer::new(engine.clone(), DEFAULT_ALPHABET);
        let symbol = reader
            .read_letter(&block_raster(), &letter(10, 20), 0, 0, -14)
            .await;
        assert_eq!(symbol, Symbol::Resolved('K'));
        // The engine saw the rotated (expanded) glyph, not the raw crop.
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0 > 20 && seen[0].1 > 30);
    }

    #[tokio::test]
    async fn engine_error_becomes_placeholder() {
        let engine = FixedEngine::new(Err(RecognitionError::EngineFailed {
            engine: "fixed".into(),
            detail: "boom".into(),
        }));
        let reader = Recognizer::new(engine, DEFAULT_ALPHABET);
        let symbol = reader
            .read_letter(&block_raster(), &letter(10, 20), 1, 0, 14)
            .await;
        assert_eq!(symbol, Symbol::Placeholder);
    }

    #[tokio::test]
    async fn out_of_alphabet_answer_is_placeholder() {
        let engine = FixedEngine::new(Ok(Some('O')));
        let reader = Recognizer::new(engine, DEFAULT_ALPHABET);
        let symbol = reader
            .read_letter(&block_raster(), &letter(10, 20), 2, 0, -14)
            .await;
        assert_eq!(symbol, Symbol::Placeholder);
    }

    #[tokio::test]
    async fn empty_box_skips_engine() {
        let engine = FixedEngine::new(Ok(Some('A')));
        let reader = Recognizer::new(engine.clone(), DEFAULT_ALPHABET);
        let symbol = reader
            .read_letter(&block_raster(), &letter(80, 14), 5, 0, 14)
            .await;
        assert_eq!(symbol, Symbol::Placeholder);
        assert!(engine.seen.lock().unwrap().is_empty());
    }
}
