//! Image encoding: `GrayImage` → PNG bytes.
//!
//! Used for the engine's scratch file and for debug dumps. PNG keeps the
//! binary raster lossless; JPEG artefacts around glyph edges would
//! reintroduce the gray levels thresholding removed.

use image::GrayImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a gray image as PNG.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn encode_small_image() {
        let img = GrayImage::from_pixel(10, 10, Luma([0]));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[..4], b"\x89PNG");
        let decoded = image::load_from_memory(&png).expect("valid png").to_luma8();
        assert_eq!(decoded, img);
    }
}
