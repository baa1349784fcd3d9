//! Pixel merge engine
//!
//! Composites N same-sized sources into one image. Each output pixel is
//! whatever the caller's [`PixelMerger`] makes of the aligned source pixels;
//! the engine only guarantees that pixel `(x, y)` of every source feeds
//! pixel `(x, y)` of the result.

use std::path::Path;

use image::DynamicImage;

use crate::textures::{EncodedImage, ImageFormat, TextureError, TextureResult};

/// Components per normalized pixel
pub const PIXEL_COMPONENTS: usize = 4;

/// Normalized pixel, each component in `[0, 1]`
pub type Pixel = [f32; PIXEL_COMPONENTS];

/// Per-pixel combination strategy
///
/// `sources[i]` is the pixel of the i-th requested source; absent or
/// undecodable sources read as all ones. Any `Fn(&[Pixel]) -> Pixel`
/// closure is a merger.
pub trait PixelMerger {
    fn merge(&self, sources: &[Pixel]) -> Pixel;
}

impl<F> PixelMerger for F
where
    F: Fn(&[Pixel]) -> Pixel,
{
    fn merge(&self, sources: &[Pixel]) -> Pixel {
        self(sources)
    }
}

/// Decoded source: interleaved 8-bit pixels in the file's own channel count
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl SourceImage {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> TextureResult<Self> {
        if !(1..=4).contains(&channels) {
            return Err(TextureError::InvalidPixels(format!(
                "unsupported channel count {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(TextureError::InvalidPixels(format!(
                "expected {expected} bytes for {width}x{height}x{channels}, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Decode an image file, keeping its channel count
    pub fn open(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_dynamic(image))
    }

    /// Flatten any decoded image to 8 bits per channel
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let pixels = match channels {
            1 => image.into_luma8().into_raw(),
            2 => image.into_luma_alpha8().into_raw(),
            3 => image.into_rgb8().into_raw(),
            _ => image.into_rgba8().into_raw(),
        };
        Self {
            width,
            height,
            channels: channels.min(4),
            pixels,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel at `(x, y)` normalized to `[0, 1]`; components past this
    /// image's channel count read as 1.0.
    pub fn normalized(&self, x: u32, y: u32) -> Pixel {
        let channels = self.channels as usize;
        let base = (y as usize * self.width as usize + x as usize) * channels;
        let mut pixel = [1.0; PIXEL_COMPONENTS];
        for (k, component) in pixel.iter_mut().enumerate().take(channels) {
            *component = f32::from(self.pixels[base + k]) / 255.0;
        }
        pixel
    }
}

/// Result of a merge, 3 or 4 channels
#[derive(Debug, Clone, PartialEq)]
pub struct MergedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl MergedImage {
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Output format: PNG when alpha was requested, JPEG otherwise
    pub fn format(&self, jpeg_quality: u8) -> ImageFormat {
        if self.has_alpha() {
            ImageFormat::Png
        } else {
            ImageFormat::Jpeg {
                quality: jpeg_quality,
            }
        }
    }

    pub fn encode(&self, jpeg_quality: u8) -> TextureResult<EncodedImage> {
        self.format(jpeg_quality)
            .encode(self.width, self.height, self.channels, &self.pixels)
    }
}

/// Merge `sources` pixel by pixel
///
/// `None` entries are sources that were absent or failed to decode; they
/// still occupy their slot and read as all ones. The first present source
/// fixes the output size, and any other size aborts the whole merge.
pub fn merge_images(
    sources: &[Option<SourceImage>],
    include_alpha: bool,
    merger: &dyn PixelMerger,
) -> TextureResult<MergedImage> {
    let mut present = sources.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|s| (i, s)));
    let (_, first) = present
        .next()
        .ok_or_else(|| TextureError::NoUsableImage("no merge source could be decoded".into()))?;
    let (width, height) = first.dimensions();

    if let Some((index, other)) = present.find(|(_, s)| s.dimensions() != (width, height)) {
        return Err(TextureError::DimensionMismatch {
            index,
            width: other.width,
            height: other.height,
            expected_width: width,
            expected_height: height,
        });
    }

    let channels: usize = if include_alpha { 4 } else { 3 };
    let mut pixels = vec![0u8; channels * width as usize * height as usize];
    let mut inputs = vec![[1.0f32; PIXEL_COMPONENTS]; sources.len()];

    for y in 0..height {
        for x in 0..width {
            for (input, source) in inputs.iter_mut().zip(sources) {
                *input = match source {
                    Some(image) => image.normalized(x, y),
                    None => [1.0; PIXEL_COMPONENTS],
                };
            }
            let merged = merger.merge(&inputs);
            let base = (y as usize * width as usize + x as usize) * channels;
            for (dst, value) in pixels[base..base + channels].iter_mut().zip(merged) {
                *dst = to_u8(value);
            }
        }
    }

    Ok(MergedImage {
        width,
        height,
        channels: channels as u8,
        pixels,
    })
}

fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, channels: u8, value: u8) -> SourceImage {
        let len = width as usize * height as usize * channels as usize;
        SourceImage::new(width, height, channels, vec![value; len]).unwrap()
    }

    fn component_max(sources: &[Pixel]) -> Pixel {
        let mut out = [0.0f32; PIXEL_COMPONENTS];
        for p in sources {
            for k in 0..PIXEL_COMPONENTS {
                out[k] = out[k].max(p[k]);
            }
        }
        out
    }

    #[test]
    fn test_missing_channels_read_as_one() {
        let rgb = SourceImage::new(1, 1, 3, vec![10, 20, 30]).unwrap();
        let gray = SourceImage::new(1, 1, 1, vec![0]).unwrap();

        let seen = std::cell::RefCell::new(Vec::new());
        let recorder = |sources: &[Pixel]| -> Pixel {
            seen.borrow_mut().extend_from_slice(sources);
            sources[0]
        };
        merge_images(&[Some(rgb), Some(gray)], false, &recorder).unwrap();

        let seen = seen.into_inner();
        assert_eq!(seen[1], [0.0, 1.0, 1.0, 1.0]);
        assert_eq!(seen[0][3], 1.0);
    }

    #[test]
    fn test_component_max_merge() {
        let gray = SourceImage::new(1, 1, 1, vec![51]).unwrap();
        let rgb = SourceImage::new(1, 1, 3, vec![0, 102, 0]).unwrap();
        let rgba = SourceImage::new(1, 1, 4, vec![0, 0, 153, 0]).unwrap();

        let merged = merge_images(&[Some(gray), Some(rgb), Some(rgba)], true, &component_max).unwrap();
        // Gray fills G, B and A with 1.0 so they saturate.
        assert_eq!(merged.pixels, vec![51, 255, 255, 255]);
    }

    #[test]
    fn test_absent_slot_reads_as_one() {
        let gray = solid(2, 2, 1, 0);
        let pick_second = |sources: &[Pixel]| -> Pixel { sources[1] };
        let merged = merge_images(&[Some(gray), None], false, &pick_second).unwrap();
        assert_eq!(merged.channels, 3);
        assert!(merged.pixels.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_positional_correspondence() {
        // 2x2 gradient: value = 10 * (y * 2 + x)
        let source = SourceImage::new(2, 2, 1, vec![0, 10, 20, 30]).unwrap();
        let identity = |sources: &[Pixel]| -> Pixel { [sources[0][0], 0.0, 0.0, 1.0] };
        let merged = merge_images(&[Some(source)], false, &identity).unwrap();
        let reds: Vec<u8> = merged.pixels.chunks(3).map(|p| p[0]).collect();
        assert_eq!(reds, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_output_is_clamped_and_rounded() {
        let source = solid(1, 1, 1, 0);
        let wild = |_: &[Pixel]| -> Pixel { [-0.5, 2.0, 0.5, 0.0] };
        let merged = merge_images(&[Some(source)], false, &wild).unwrap();
        assert_eq!(merged.pixels, vec![0, 255, 128]);
    }

    #[test]
    fn test_no_sources_fails() {
        let err = merge_images(&[None, None], false, &component_max).unwrap_err();
        assert!(matches!(err, TextureError::NoUsableImage(_)));

        let err = merge_images(&[], true, &component_max).unwrap_err();
        assert!(matches!(err, TextureError::NoUsableImage(_)));
    }

    #[test]
    fn test_dimension_mismatch_aborts() {
        let err = merge_images(
            &[None, Some(solid(4, 4, 1, 0)), Some(solid(4, 4, 3, 0)), Some(solid(2, 4, 1, 0))],
            false,
            &component_max,
        )
        .unwrap_err();
        match err {
            TextureError::DimensionMismatch {
                index,
                expected_width,
                width,
                ..
            } => {
                assert_eq!(index, 3);
                assert_eq!(expected_width, 4);
                assert_eq!(width, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_format_follows_alpha() {
        let source = solid(1, 1, 1, 0);
        let opaque = merge_images(&[Some(source.clone())], false, &component_max).unwrap();
        let alpha = merge_images(&[Some(source)], true, &component_max).unwrap();
        assert_eq!(opaque.format(80), ImageFormat::Jpeg { quality: 80 });
        assert_eq!(alpha.format(80), ImageFormat::Png);
    }

    #[test]
    fn test_source_rejects_short_buffer() {
        assert!(SourceImage::new(2, 2, 3, vec![0; 11]).is_err());
        assert!(SourceImage::new(1, 1, 0, vec![]).is_err());
    }

    #[test]
    fn test_from_dynamic_keeps_channel_count() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 1, image::Luma([7])));
        let source = SourceImage::from_dynamic(gray);
        assert_eq!(source.channels, 1);
        assert_eq!(source.pixels, vec![7, 7]);

        let wide = DynamicImage::ImageRgba16(image::ImageBuffer::from_pixel(
            1,
            1,
            image::Rgba([65535u16, 0, 0, 65535]),
        ));
        let source = SourceImage::from_dynamic(wide);
        assert_eq!(source.channels, 4);
        assert_eq!(source.pixels, vec![255, 0, 0, 255]);
    }
}
