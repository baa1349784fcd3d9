//! Output image encodings
//!
//! glTF core only admits PNG and JPEG, so those are the only two targets.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::textures::{TextureError, TextureResult};

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless, keeps alpha)
    Png,
    /// JPEG format (lossy, smaller size)
    Jpeg { quality: u8 },
}

impl ImageFormat {
    /// Default JPEG quality for generated images
    pub const DEFAULT_JPEG_QUALITY: u8 = 80;

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg { .. } => "jpg",
        }
    }

    /// MIME type written into embedded image records
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, ImageFormat::Png)
    }

    /// Encode interleaved 8-bit pixels with 1-4 channels
    pub fn encode(
        &self,
        width: u32,
        height: u32,
        channels: u8,
        pixels: &[u8],
    ) -> TextureResult<EncodedImage> {
        let color = match channels {
            1 => ExtendedColorType::L8,
            2 => ExtendedColorType::La8,
            3 => ExtendedColorType::Rgb8,
            4 => ExtendedColorType::Rgba8,
            n => {
                return Err(TextureError::InvalidPixels(format!(
                    "unsupported channel count {n}"
                )))
            }
        };

        let mut bytes = Vec::new();
        let result = match self {
            ImageFormat::Png => PngEncoder::new(&mut bytes).write_image(pixels, width, height, color),
            ImageFormat::Jpeg { quality } => {
                JpegEncoder::new_with_quality(&mut bytes, *quality).write_image(pixels, width, height, color)
            }
        };
        result.map_err(|source| TextureError::Encode {
            format: self.extension(),
            source,
        })?;

        Ok(EncodedImage {
            bytes,
            format: *self,
        })
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg { quality } => write!(f, "jpeg (q{quality})"),
        }
    }
}

/// Encoded image bytes ready to embed or write
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type for a file suffix, compared case-insensitively
pub fn mime_type_for_suffix(suffix: &str) -> &'static str {
    match suffix.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "image/unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for_suffix() {
        assert_eq!(mime_type_for_suffix("PNG"), "image/png");
        assert_eq!(mime_type_for_suffix("jpeg"), "image/jpeg");
        assert_eq!(mime_type_for_suffix("Jpg"), "image/jpeg");
        assert_eq!(mime_type_for_suffix("tga"), "image/unknown");
    }

    #[test]
    fn test_png_round_trip_is_exact() {
        let pixels: Vec<u8> = vec![
            255, 0, 0, 255, 0, 255, 0, 128, //
            0, 0, 255, 0, 12, 34, 56, 78,
        ];
        let encoded = ImageFormat::Png.encode(2, 2, 4, &pixels).unwrap();
        assert_eq!(encoded.mime_type(), "image/png");

        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.into_raw(), pixels);
    }

    #[test]
    fn test_jpeg_encodes_rgb() {
        let pixels = vec![200u8; 4 * 4 * 3];
        let encoded = ImageFormat::Jpeg { quality: 80 }.encode(4, 4, 3, &pixels).unwrap();
        assert_eq!(encoded.mime_type(), "image/jpeg");
        assert!(!encoded.is_empty());

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn test_rejects_bad_channel_count() {
        let err = ImageFormat::Png.encode(1, 1, 5, &[0; 5]).unwrap_err();
        assert!(matches!(err, TextureError::InvalidPixels(_)));
    }
}
