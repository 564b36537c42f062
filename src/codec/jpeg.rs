//! Thin wrapper around a library-provided JPEG encoder. The spec treats
//! `encode_jpeg` as an opaque library function; this crate backs it with
//! `image`'s JPEG codec rather than a hand-rolled DCT/Huffman path.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageEncoder};

use crate::error::RecorderError;

/// Encodes a top-down BGRA buffer as a complete JFIF byte stream.
/// `quality` is clamped to `[1, 100]`.
pub fn encode_jpeg(bgra: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, RecorderError> {
    let quality = quality.clamp(1, 100);
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in bgra.chunks_exact(4) {
        rgb.push(px[2]); // R
        rgb.push(px[1]); // G
        rgb.push(px[0]); // B
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(&rgb, width, height, ColorType::Rgb8.into())
        .map_err(|e| RecorderError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_jpeg_produces_a_nonempty_jfif_stream() {
        let bgra = vec![0x20u8; 4 * 4 * 4];
        let bytes = encode_jpeg(&bgra, 4, 4, 75).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]); // SOI
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]); // EOI
    }

    #[test]
    fn encode_jpeg_clamps_quality_out_of_range() {
        let bgra = vec![0x10u8; 2 * 2 * 4];
        assert!(encode_jpeg(&bgra, 2, 2, 0).is_ok());
        assert!(encode_jpeg(&bgra, 2, 2, 255).is_ok());
    }
}
