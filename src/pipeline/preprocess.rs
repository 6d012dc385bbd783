//! Binarisation: encoded image bytes → [`BinaryRaster`].
//!
//! Decode, collapse to luma, stretch contrast over the observed range, then
//! threshold so every pixel is either ink (0) or background (255). The
//! result is a pure function of the input bytes and the cutoff.

use crate::error::CaptchaError;
use image::{GrayImage, Luma};
use tracing::debug;

/// Pixel value of ink.
pub const INK: u8 = 0;
/// Pixel value of background.
pub const BACKGROUND: u8 = 255;

/// Single-channel raster whose pixels are only [`INK`] or [`BACKGROUND`].
///
/// Immutable once built; the segmenter and every letter read borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRaster {
    image: GrayImage,
}

impl BinaryRaster {
    /// Build from an arbitrary gray image, treating values below 128 as ink.
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            image: threshold(gray, 128),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Always 1 after thresholding.
    pub fn channels(&self) -> u8 {
        1
    }

    /// Whether (x, y) is ink. Out-of-range coordinates are background.
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.image.get_pixel(x, y)[0] == INK
    }

    /// Ink pixels in column `x` over the full height; 0 outside the raster.
    pub fn column_ink_count(&self, x: u32) -> u32 {
        if x >= self.width() {
            return 0;
        }
        (0..self.height()).filter(|&y| self.is_ink(x, y)).count() as u32
    }

    pub fn ink_pixel_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] == INK).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Render as text, `X` for ink, for eyeballing segmentation in logs.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width() + 1) * self.height()) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                out.push(if self.is_ink(x, y) { 'X' } else { ' ' });
            }
            out.push('\n');
        }
        out
    }
}

/// Decode and binarise captcha bytes.
///
/// # Errors
/// [`CaptchaError::DecodeFailed`] when the bytes are not a supported image
/// or decode to zero pixels.
pub fn preprocess(bytes: &[u8], cutoff: u8) -> Result<BinaryRaster, CaptchaError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| CaptchaError::DecodeFailed {
        detail: e.to_string(),
    })?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(CaptchaError::DecodeFailed {
            detail: "image has no pixels".to_string(),
        });
    }

    let gray = normalize(&decoded.to_luma8());
    let raster = BinaryRaster {
        image: threshold(&gray, cutoff),
    };

    debug!(
        "Binarised captcha → {}x{} px, {} ink pixels",
        raster.width(),
        raster.height(),
        raster.ink_pixel_count()
    );
    Ok(raster)
}

/// Linearly stretch the observed luma range onto 0..=255.
///
/// Flat images carry no contrast to stretch and are returned unchanged.
pub fn normalize(gray: &GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if lo >= hi {
        return gray.clone();
    }

    let range = (hi - lo) as u32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = (gray.get_pixel(x, y)[0] - lo) as u32;
        Luma([((v * 255 + range / 2) / range) as u8])
    })
}

/// Map luma `>= cutoff` to background and everything darker to ink.
pub fn threshold(gray: &GrayImage, cutoff: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] >= cutoff {
            Luma([BACKGROUND])
        } else {
            Luma([INK])
        }
    })
}
