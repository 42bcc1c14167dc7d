//! Image preparation before upload.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};

use crate::{config::CaptureSettings, error::Result};

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// A capture ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedPhoto {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    /// Size of the raw input in bytes
    pub original_size: u64,
}

impl ProcessedPhoto {
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Dimensions after capping the longest edge at `max_edge`, preserving the
/// aspect ratio. Smaller images are left alone.
pub fn target_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = f64::from(max_edge) / f64::from(longest);
    let scaled = |edge: u32| ((f64::from(edge) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decodes `raw`, downscales it and re-encodes it as JPEG.
pub fn prepare_photo(raw: &[u8], settings: &CaptureSettings) -> Result<ProcessedPhoto> {
    let decoded = image::load_from_memory(raw)?;
    prepare_image(&decoded, raw.len() as u64, settings)
}

/// Same as [`prepare_photo`] for an already decoded image.
pub fn prepare_image(
    decoded: &DynamicImage,
    original_size: u64,
    settings: &CaptureSettings,
) -> Result<ProcessedPhoto> {
    let (width, height) = decoded.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, settings.max_edge);

    let resized = if (target_w, target_h) == (width, height) {
        decoded.to_rgb8()
    } else {
        decoded
            .resize_exact(target_w, target_h, FilterType::Lanczos3)
            .to_rgb8()
    };

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), settings.jpeg_quality);
    DynamicImage::ImageRgb8(resized).write_with_encoder(encoder)?;

    Ok(ProcessedPhoto {
        bytes,
        width: target_w,
        height: target_h,
        content_type: JPEG_CONTENT_TYPE,
        original_size,
    })
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_target_dimensions_caps_longest_edge() {
        assert_eq!(target_dimensions(4000, 3000, 1920), (1920, 1440));
        assert_eq!(target_dimensions(3000, 4000, 1920), (1440, 1920));
        assert_eq!(target_dimensions(800, 600, 1920), (800, 600));
        assert_eq!(target_dimensions(1920, 10, 1920), (1920, 10));
    }

    #[test]
    fn test_prepare_photo_downscales_and_reencodes() {
        let settings = CaptureSettings {
            max_edge: 64,
            ..Default::default()
        };
        let raw = png_bytes(200, 100);
        let photo = prepare_photo(&raw, &settings).unwrap();

        assert_eq!((photo.width, photo.height), (64, 32));
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo.original_size, raw.len() as u64);
        assert_eq!(&photo.bytes[..2], &[0xFF, 0xD8]);

        let reloaded = image::load_from_memory(&photo.bytes).unwrap();
        assert_eq!(reloaded.dimensions(), (64, 32));
    }

    #[test]
    fn test_garbage_input_is_an_image_error() {
        let err = prepare_photo(b"not an image", &CaptureSettings::default()).unwrap_err();
        assert!(matches!(err, crate::error::WorkflowError::Image { .. }));
    }
}
