//! scene2gltf Export Pipeline
//!
//! Converts a raw scene into glTF 2.0:
//! - glTF document arena and `.gltf`/`.glb` writers
//! - Texture build pipeline (dedup cache, channel merging, legacy format
//!   conversion, embedded or loose image emission)
//! - Material and node translation

pub mod gltf;
pub mod textures;
pub mod translate;

pub use gltf::{ExportSummary, GltfDocument, GltfExportError, GltfExportOptions, GltfExporter};
pub use textures::{
    BuildRequest, BuildStats, ConversionTool, ImageFormat, ImageMagick, ImageProperties,
    PixelMerger, TextureBuildOptions, TextureBuilder, TextureError,
};
