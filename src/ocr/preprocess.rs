//! Image cleanup applied before every OCR call.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

/// Largest width or height handed to the OCR engine.
pub const MAX_OCR_DIMENSION: u32 = 2000;

/// Grayscale, stretch contrast to the full 0..=255 range, and shrink oversized
/// images so their longest side is [`MAX_OCR_DIMENSION`].
pub fn preprocess_image(image: &DynamicImage) -> GrayImage {
    let mut gray = image.to_luma8();
    autocontrast(&mut gray);
    downscale(gray)
}

/// Linear stretch of the darkest pixel to 0 and the brightest to 255.
/// Flat images are left unchanged.
fn autocontrast(image: &mut GrayImage) {
    let (lo, hi) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if hi <= lo {
        return;
    }

    let scale = 255.0 / f64::from(hi - lo);
    let lut: Vec<u8> = (0..=255u16)
        .map(|v| {
            let stretched = (f64::from(v) - f64::from(lo)) * scale;
            stretched.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    for pixel in image.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
}

fn downscale(image: GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let largest = width.max(height);
    if largest <= MAX_OCR_DIMENSION {
        return image;
    }

    let scale = f64::from(MAX_OCR_DIMENSION) / f64::from(largest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, MAX_OCR_DIMENSION);
    image::imageops::resize(&image, scaled(width), scaled(height), FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_output_is_grayscale_with_full_range() {
        let mut rgb = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        rgb.put_pixel(0, 0, Rgb([150, 150, 150]));
        let out = preprocess_image(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_flat_image_is_untouched() {
        let gray = GrayImage::from_pixel(3, 3, Luma([42]));
        let out = preprocess_image(&DynamicImage::ImageLuma8(gray));
        assert!(out.pixels().all(|p| p[0] == 42));
    }

    #[test]
    fn test_large_image_downscaled_preserving_aspect() {
        let gray = GrayImage::new(4000, 1000);
        let out = preprocess_image(&DynamicImage::ImageLuma8(gray));
        assert_eq!(out.dimensions(), (2000, 500));
    }

    #[test]
    fn test_tall_image_downscaled() {
        let gray = GrayImage::new(1200, 3000);
        let out = preprocess_image(&DynamicImage::ImageLuma8(gray));
        assert_eq!(out.dimensions(), (800, 2000));
    }

    #[test]
    fn test_small_image_keeps_size() {
        let gray = GrayImage::new(2000, 10);
        let out = preprocess_image(&DynamicImage::ImageLuma8(gray));
        assert_eq!(out.dimensions(), (2000, 10));
    }
}
