//! Debug dumps: write intermediate images for offline inspection.
//!
//! Only active when [`crate::config::SolverConfig::debug`] is set. Every
//! write is best-effort: a failure is logged and the solve carries on.
//! Files of one solve share a stamp (millisecond time plus a process-wide
//! sequence number) so they sort together and never collide with another
//! solve writing to the same directory.

use crate::config::DebugConfig;
use crate::pipeline::encode::encode_png;
use crate::pipeline::preprocess::BinaryRaster;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

static DUMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-solve dump writer.
#[derive(Debug, Clone)]
pub struct DebugDump {
    config: DebugConfig,
    stamp: String,
}

impl DebugDump {
    pub fn new(config: DebugConfig) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = DUMP_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            config,
            stamp: format!("{millis}-{seq:06}"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Raw captcha bytes as received.
    pub async fn input(&self, bytes: &[u8]) {
        if self.config.input {
            self.write(self.path("captcha", "bin"), bytes).await;
        }
    }

    /// The binarised raster.
    pub async fn raster(&self, raster: &BinaryRaster) {
        if self.config.raster {
            self.write_png(self.path("raster", "png"), raster.as_image())
                .await;
        }
    }

    /// One rotated letter; `resolved` decides whether the unresolved-only
    /// switch applies.
    pub async fn letter(&self, attempt: u32, index: usize, glyph: &GrayImage, resolved: bool) {
        let wanted = self.config.letters || (self.config.unresolved && !resolved);
        if !wanted {
            return;
        }
        let kind = if resolved { "letter" } else { "unresolved" };
        let name = format!("{kind}-a{attempt:02}-b{index}");
        self.write_png(self.path(&name, "png"), glyph).await;
    }

    fn path(&self, name: &str, ext: &str) -> PathBuf {
        self.config
            .dir
            .join(format!("{}-{}.{}", self.stamp, name, ext))
    }

    async fn write_png(&self, path: PathBuf, img: &GrayImage) {
        match encode_png(img) {
            Ok(png) => self.write(path, &png).await,
            Err(e) => warn!("Debug dump: failed to encode {}: {}", path.display(), e),
        }
    }

    async fn write(&self, path: PathBuf, bytes: &[u8]) {
        if let Err(e) = tokio::fs::create_dir_all(&self.config.dir).await {
            warn!(
                "Debug dump: cannot create {}: {}",
                self.config.dir.display(),
                e
            );
            return;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => debug!("Debug dump: wrote {}", path.display()),
            Err(e) => warn!("Debug dump: failed to write {}: {}", path.display(), e),
        }
    }
}
