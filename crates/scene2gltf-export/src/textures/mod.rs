//! Texture build pipeline
//!
//! Resolves raw texture references into glTF images and textures:
//! - `introspect` reads dimensions and alpha classification
//! - `merge` composites several single-channel sources into one image
//! - `legacy` rewrites formats glTF can't carry through an external tool
//! - `emitter` stores the result in the binary blob or next to the document
//! - `builder` deduplicates requests and dispatches between the above

mod builder;
mod emitter;
mod encoding;
mod introspect;
mod legacy;
mod merge;

pub use builder::{BuildRequest, BuildStats, TextureBuildOptions, TextureBuilder};
pub use emitter::{EmitMode, Emission, ResourceEmitter};
pub use encoding::{EncodedImage, ImageFormat, mime_type_for_suffix};
pub use introspect::{ImageProperties, classify_alpha, inspect, read_properties};
pub use legacy::{
    ConversionOutcome, ConversionTool, ConvertParams, ImageMagick, LegacyFormatConverter,
    select_format,
};
pub use merge::{MergedImage, PIXEL_COMPONENTS, Pixel, PixelMerger, SourceImage, merge_images};

use std::path::PathBuf;

use thiserror::Error;

/// Texture build errors
///
/// None of these escape the builder: it logs them and reports "no texture".
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "Merge source {index} ({width}x{height}) can't be merged with previous source(s) of dimension ({expected_width}x{expected_height})"
    )]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("Failed to encode {format} image: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("External tool '{program}' is not available")]
    ToolUnavailable { program: String },

    #[error("External tool '{program}' failed on '{input}': {message}")]
    ToolFailed {
        program: String,
        input: PathBuf,
        message: String,
    },

    #[error("No usable image: {0}")]
    NoUsableImage(String),

    #[error("Invalid pixel buffer: {0}")]
    InvalidPixels(String),
}

pub type TextureResult<T> = Result<T, TextureError>;
