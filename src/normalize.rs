use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("could not read image: {0}")]
    Decode(image::ImageError),
    #[error("could not read image: unrecognized format for {0}")]
    UnknownFormat(String),
}

/// Where a raw image came from. Catalog selections keep their sample id so a
/// later selection of the same sample is still a fresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Upload,
    Capture,
    Sample { id: String },
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Upload => "upload",
            ImageSource::Capture => "capture",
            ImageSource::Sample { .. } => "sample",
        }
    }
}

/// An undecoded input blob. Lives only until normalization has run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub data: Bytes,
    pub filename: String,
    pub source: ImageSource,
}

/// A transport-safe payload: longer side bounded by `max_side`, re-encoded
/// as JPEG at a bounded quality.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub max_side: u32,
    pub quality: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_side: 1024,
            quality: 0.85,
        }
    }
}

/// Two ways to get from bytes to a pixel surface, picked once per input:
/// sniff the format from the magic bytes, or fall back to the filename
/// extension when sniffing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeStrategy {
    Sniffed(ImageFormat),
    ExtensionHint(ImageFormat),
}

impl DecodeStrategy {
    fn probe(data: &[u8], filename: &str) -> Option<Self> {
        if let Ok(format) = image::guess_format(data) {
            return Some(Self::Sniffed(format));
        }
        ImageFormat::from_path(filename).ok().map(Self::ExtensionHint)
    }

    fn decode(self, data: &[u8]) -> Result<DynamicImage, image::ImageError> {
        let format = match self {
            Self::Sniffed(format) | Self::ExtensionHint(format) => format,
        };
        image::load_from_memory_with_format(data, format)
    }
}

fn target_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let target_w = ((width as f64 * scale).round() as u32).max(1);
    let target_h = ((height as f64 * scale).round() as u32).max(1);
    (target_w, target_h)
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.01, 1.0) * 100.0).round() as u8
}

/// Bounds the input to `max_side` on its longer edge and re-encodes it as
/// JPEG. Never upscales. The only hard failure is an undecodable input; if
/// the decoded surface cannot be re-encoded the original bytes pass through
/// unmodified so the pipeline keeps moving.
pub fn normalize(
    raw: &RawImage,
    options: &NormalizeOptions,
) -> Result<NormalizedImage, NormalizeError> {
    let strategy = DecodeStrategy::probe(&raw.data, &raw.filename)
        .ok_or_else(|| NormalizeError::UnknownFormat(raw.filename.clone()))?;
    let decoded = strategy.decode(&raw.data).map_err(NormalizeError::Decode)?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = target_dimensions(width, height, options.max_side);

    let surface = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::CatmullRom)
    };

    let rgb = surface.to_rgb8();
    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, jpeg_quality(options.quality));
    if let Err(e) = rgb.write_with_encoder(encoder) {
        tracing::warn!("JPEG encode unavailable, passing original bytes through: {e}");
        return Ok(NormalizedImage {
            data: raw.data.clone(),
            width,
            height,
        });
    }

    Ok(NormalizedImage {
        data: Bytes::from(encoded),
        width: target_w,
        height: target_h,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn test_jpeg(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 251) as u8, (y % 239) as u8, ((x + y) % 255) as u8])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        Bytes::from(buffer)
    }

    pub(crate) fn test_raw(width: u32, height: u32) -> RawImage {
        RawImage {
            data: test_jpeg(width, height),
            filename: "image.jpg".into(),
            source: ImageSource::Upload,
        }
    }

    #[test]
    fn target_dimensions_bounds_longer_side() {
        assert_eq!(target_dimensions(2000, 1000, 1024), (1024, 512));
        assert_eq!(target_dimensions(1000, 2000, 1024), (512, 1024));
        assert_eq!(target_dimensions(6600, 4400, 1024), (1024, 683));
    }

    #[test]
    fn target_dimensions_never_upscales() {
        assert_eq!(target_dimensions(640, 480, 1024), (640, 480));
        assert_eq!(target_dimensions(1024, 1024, 1024), (1024, 1024));
    }

    #[test]
    fn target_dimensions_floors_at_one_pixel() {
        assert_eq!(target_dimensions(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn normalize_bounds_output_dimensions() {
        let raw = test_raw(2000, 1000);
        let normalized = normalize(&raw, &NormalizeOptions::default()).unwrap();
        assert_eq!((normalized.width, normalized.height), (1024, 512));
        assert!(normalized.width.max(normalized.height) <= 1024);
    }

    #[test]
    fn normalize_keeps_small_images_at_native_size() {
        let raw = test_raw(640, 480);
        let normalized = normalize(&raw, &NormalizeOptions::default()).unwrap();
        assert_eq!((normalized.width, normalized.height), (640, 480));
    }

    #[test]
    fn renormalizing_is_a_dimension_noop() {
        let raw = test_raw(3000, 1500);
        let options = NormalizeOptions::default();
        let first = normalize(&raw, &options).unwrap();

        let again = RawImage {
            data: first.data.clone(),
            filename: "image.jpg".into(),
            source: ImageSource::Upload,
        };
        let second = normalize(&again, &options).unwrap();
        assert_eq!((second.width, second.height), (first.width, first.height));
    }

    #[test]
    fn normalize_rejects_undecodable_input() {
        let raw = RawImage {
            data: Bytes::from_static(b"definitely not an image"),
            filename: "junk.bin".into(),
            source: ImageSource::Upload,
        };
        let err = normalize(&raw, &NormalizeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("could not read image"));
    }

    #[test]
    fn extension_hint_kicks_in_when_sniffing_fails() {
        // Truncate the magic bytes away so sniffing cannot identify the
        // format, but keep a .jpg filename. The strategy falls back to the
        // extension and then fails in the decoder proper.
        let raw = RawImage {
            data: Bytes::from_static(&[0u8; 16]),
            filename: "photo.jpg".into(),
            source: ImageSource::Upload,
        };
        let strategy = DecodeStrategy::probe(&raw.data, &raw.filename);
        assert_eq!(strategy, Some(DecodeStrategy::ExtensionHint(ImageFormat::Jpeg)));
        assert!(matches!(
            normalize(&raw, &NormalizeOptions::default()),
            Err(NormalizeError::Decode(_))
        ));
    }

    #[test]
    fn oversized_input_is_bounded_and_smaller() {
        // Flat fill keeps this observed-in-the-wild size cheap to encode.
        let img = RgbImage::from_pixel(6600, 4400, Rgb([182, 124, 96]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        let raw = RawImage {
            data: Bytes::from(buffer),
            filename: "image.jpg".into(),
            source: ImageSource::Upload,
        };
        let options = NormalizeOptions::default();
        let bounded = normalize(&raw, &options).unwrap();
        assert_eq!((bounded.width, bounded.height), (1024, 683));

        // Same quality, no resize: the bounded payload must be strictly
        // smaller than re-encoding at native resolution.
        let unbounded_options = NormalizeOptions {
            max_side: 10_000,
            ..options
        };
        let unbounded = normalize(&raw, &unbounded_options).unwrap();
        assert_eq!((unbounded.width, unbounded.height), (6600, 4400));
        assert!(bounded.data.len() < unbounded.data.len());
    }
}
