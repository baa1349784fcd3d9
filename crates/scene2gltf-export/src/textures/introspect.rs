//! Image introspection
//!
//! Dimensions come from the header alone; pixels are only decoded when the
//! image has an alpha channel that needs classifying.

use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use scene2gltf_raw::Opacity;
use serde::Serialize;
use tracing::debug;

use crate::textures::TextureResult;

/// What the pipeline needs to know about an image without merging it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageProperties {
    pub width: u32,
    pub height: u32,
    pub opacity: Opacity,
}

impl Default for ImageProperties {
    /// 1x1 opaque: the "nothing known" answer
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            opacity: Opacity::Opaque,
        }
    }
}

/// Inspect an image file
///
/// Never fails: unreadable files report [`ImageProperties::default`], which
/// callers must treat as "no usable information".
pub fn inspect(path: impl AsRef<Path>) -> ImageProperties {
    let path = path.as_ref();
    match read_properties(path) {
        Ok(props) => props,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Image introspection failed");
            ImageProperties::default()
        }
    }
}

/// Like [`inspect`], but reports why the file couldn't be read
pub fn read_properties(path: impl AsRef<Path>) -> TextureResult<ImageProperties> {
    let path = path.as_ref();
    let decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let (width, height) = decoder.dimensions();
    let channels = decoder.color_type().channel_count();

    let opacity = if channels == 4 {
        // A decode failure past the header leaves the image classified opaque
        DynamicImage::from_decoder(decoder)
            .map(|img| classify_alpha(&img.to_rgba8()))
            .unwrap_or(Opacity::Opaque)
    } else {
        Opacity::Opaque
    };

    Ok(ImageProperties {
        width,
        height,
        opacity,
    })
}

/// Classify an image by scanning every alpha value
pub fn classify_alpha(image: &RgbaImage) -> Opacity {
    let mut has_mask = false;
    for pixel in image.pixels() {
        match pixel[3] {
            0 => has_mask = true,
            255 => {}
            _ => return Opacity::Transparent,
        }
    }
    if has_mask {
        Opacity::Mask
    } else {
        Opacity::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn rgba_with(alpha_at_origin: u8) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        img.put_pixel(0, 0, Rgba([10, 20, 30, alpha_at_origin]));
        img
    }

    #[test]
    fn test_partial_alpha_is_transparent() {
        assert_eq!(classify_alpha(&rgba_with(128)), Opacity::Transparent);
    }

    #[test]
    fn test_zero_alpha_is_mask() {
        assert_eq!(classify_alpha(&rgba_with(0)), Opacity::Mask);
    }

    #[test]
    fn test_full_alpha_is_opaque() {
        assert_eq!(classify_alpha(&rgba_with(255)), Opacity::Opaque);
    }

    #[test]
    fn test_partial_alpha_wins_over_mask() {
        let mut img = rgba_with(0);
        img.put_pixel(2, 1, Rgba([0, 0, 0, 1]));
        assert_eq!(classify_alpha(&img), Opacity::Transparent);
    }

    #[test]
    fn test_inspect_png_files() {
        let dir = tempfile::tempdir().unwrap();

        let masked = dir.path().join("masked.png");
        rgba_with(0).save(&masked).unwrap();
        assert_eq!(
            inspect(&masked),
            ImageProperties {
                width: 3,
                height: 2,
                opacity: Opacity::Mask
            }
        );

        let rgb = dir.path().join("rgb.png");
        RgbImage::from_pixel(5, 7, Rgb([1, 2, 3])).save(&rgb).unwrap();
        assert_eq!(
            inspect(&rgb),
            ImageProperties {
                width: 5,
                height: 7,
                opacity: Opacity::Opaque
            }
        );
    }

    #[test]
    fn test_inspect_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(inspect(dir.path().join("missing.png")), ImageProperties::default());
    }

    #[test]
    fn test_inspect_garbage_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert_eq!(inspect(&path), ImageProperties::default());
    }
}
