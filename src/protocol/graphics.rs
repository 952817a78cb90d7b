//! # Monochrome Bitmaps
//!
//! Label printers only print black or white dots. Image elements are decoded,
//! scaled to their target size in dots and converted to a 1-bit bitmap with
//! Bayer 8x8 ordered dithering before a generator embeds them.
//!
//! ## Bit Packing
//!
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, imageops::FilterType};

use crate::error::{EtiquetaError, Result};

/// Bayer 8x8 dithering matrix (values 0-63).
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// A packed 1-bit image, rows padded to whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub row_bytes: usize,
    pub data: Vec<u8>,
}

/// Dithering threshold for a dot position, in (0, 1).
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Pack a row of dots (true = black) into bytes, MSB first.
///
/// ```
/// use etiqueta::protocol::graphics::pack_row;
///
/// assert_eq!(pack_row(&[true, true, true, true, false, false, false, false]), vec![0xF0]);
/// assert_eq!(pack_row(&[true; 12]), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    bytes
}

/// Decode base64 image data (optionally a `data:` URL).
pub fn decode_base64_image(data: &str) -> Result<DynamicImage> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| EtiquetaError::Generation(format!("image data is not base64: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| EtiquetaError::Generation(format!("image data could not be decoded: {}", e)))
}

/// Scale an image to `width` x `height` dots and dither it to 1 bit.
///
/// Transparent pixels count as white.
pub fn to_bitmap(image: &DynamicImage, width: usize, height: usize) -> Result<Bitmap> {
    if width == 0 || height == 0 {
        return Err(EtiquetaError::Generation(format!(
            "image size {}x{} dots is empty",
            width, height
        )));
    }

    let resized = image.resize_exact(width as u32, height as u32, FilterType::Triangle);
    let rgba = resized.to_rgba8();

    let row_bytes = width.div_ceil(8);
    let mut data = Vec::with_capacity(row_bytes * height);
    let mut row = Vec::with_capacity(width);

    for y in 0..height {
        row.clear();
        for x in 0..width {
            let [r, g, b, a] = rgba.get_pixel(x as u32, y as u32).0;
            let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
            let alpha = a as f32 / 255.0;
            let intensity = (1.0 - luma) * alpha;
            row.push(intensity > threshold(x, y));
        }
        data.extend(pack_row(&row));
    }

    Ok(Bitmap {
        width,
        height,
        row_bytes,
        data,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, GrayImage};
    use std::io::Cursor;

    fn png_base64(img: &GrayImage) -> String {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_threshold_range() {
        for y in 0..8 {
            for x in 0..8 {
                let t = threshold(x, y);
                assert!(t > 0.0 && t < 1.0);
            }
        }
    }

    #[test]
    fn test_black_image_is_all_ones() {
        let img = GrayImage::from_pixel(4, 4, Luma([0]));
        let decoded = decode_base64_image(&png_base64(&img)).unwrap();
        let bitmap = to_bitmap(&decoded, 16, 2).unwrap();
        assert_eq!(bitmap.row_bytes, 2);
        assert_eq!(bitmap.data, vec![0xFF; 4]);
    }

    #[test]
    fn test_white_image_is_all_zeros() {
        let img = GrayImage::from_pixel(4, 4, Luma([255]));
        let decoded = decode_base64_image(&png_base64(&img)).unwrap();
        let bitmap = to_bitmap(&decoded, 10, 3).unwrap();
        assert_eq!(bitmap.row_bytes, 2);
        assert!(bitmap.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_data_url_prefix_accepted() {
        let img = GrayImage::from_pixel(2, 2, Luma([0]));
        let url = format!("data:image/png;base64,{}", png_base64(&img));
        assert!(decode_base64_image(&url).is_ok());
    }

    #[test]
    fn test_bad_base64_is_generation_error() {
        let err = decode_base64_image("not base64 at all!").unwrap_err();
        assert!(matches!(err, EtiquetaError::Generation(_)));
    }

    #[test]
    fn test_empty_target_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        assert!(to_bitmap(&img, 0, 5).is_err());
    }
}
