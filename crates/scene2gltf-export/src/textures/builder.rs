//! Texture builder: request deduplication and dispatch
//!
//! Every texture a material asks for goes through [`TextureBuilder`]. A
//! request is keyed by its tag and ordered source indices; the first
//! successful build for a key is remembered and handed back to every later
//! request with the same key. Failed builds are logged, counted and not
//! remembered, so the same request may be retried.

use std::collections::HashMap;
use std::path::PathBuf;

use scene2gltf_raw::{RawModel, RawTexture};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gltf::{GltfDocument, Texture, TextureTransform};
use crate::textures::{
    ConversionOutcome, ConversionTool, Emission, ImageFormat, ImageMagick, LegacyFormatConverter,
    PixelMerger, ResourceEmitter, SourceImage, TextureError, TextureResult, merge_images,
    read_properties,
};

/// Texture pipeline options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureBuildOptions {
    /// Suffixes routed through the conversion tool
    pub legacy_suffixes: Vec<String>,
    /// Sub-folder of the output folder holding converted files
    pub converted_dir: String,
    /// Conversion tool executable
    pub tool_program: String,
    /// Converted images are shrunk to fit this bound
    pub max_dimension: u32,
    pub flip_vertical: bool,
    /// Quality for lossy output
    pub jpeg_quality: u8,
}

impl Default for TextureBuildOptions {
    fn default() -> Self {
        Self {
            legacy_suffixes: vec!["tga".to_string()],
            converted_dir: "convertedTextures".to_string(),
            tool_program: "magick".to_string(),
            max_dimension: 1024,
            flip_vertical: true,
            jpeg_quality: ImageFormat::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// One texture request: ordered source indices, a tag and the alpha flag
///
/// `None` marks a slot with no source; it still takes part in the merge
/// (reading as all ones) and in the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub indices: Vec<Option<usize>>,
    pub tag: String,
    pub include_alpha: bool,
}

impl BuildRequest {
    pub fn single(index: usize, tag: impl Into<String>) -> Self {
        Self {
            indices: vec![Some(index)],
            tag: tag.into(),
            include_alpha: false,
        }
    }

    pub fn merged(indices: Vec<Option<usize>>, tag: impl Into<String>, include_alpha: bool) -> Self {
        Self {
            indices,
            tag: tag.into(),
            include_alpha,
        }
    }

    /// `<tag>_<i0>_<i1>…`, absent slots as `-`, with `+alpha` appended when
    /// alpha is requested.
    pub fn cache_key(&self) -> String {
        let mut key = self.tag.clone();
        for index in &self.indices {
            key.push('_');
            match index {
                Some(i) => key.push_str(&i.to_string()),
                None => key.push('-'),
            }
        }
        if self.include_alpha {
            key.push_str("+alpha");
        }
        key
    }
}

/// Work counters for one export run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Source images decoded for merging
    pub decodes: usize,
    /// Merged images encoded
    pub encodes: usize,
    /// Files written to the output folder
    pub writes: usize,
    pub copies: usize,
    /// Images placed in the binary blob
    pub embeds: usize,
    pub conversions: usize,
    pub cache_hits: usize,
    pub failures: usize,
}

impl BuildStats {
    /// Count of operations that touched the file system or an encoder
    pub fn io_operations(&self) -> usize {
        self.decodes + self.encodes + self.writes + self.copies + self.embeds + self.conversions
    }
}

/// Resolves raw texture indices to document texture indices
///
/// Scoped to one export: the cache lives and dies with the builder.
pub struct TextureBuilder<'a> {
    raw: &'a RawModel,
    options: TextureBuildOptions,
    emitter: ResourceEmitter,
    converter: LegacyFormatConverter,
    cache: HashMap<String, usize>,
    stats: BuildStats,
}

impl<'a> TextureBuilder<'a> {
    /// Builder converting legacy formats with the configured ImageMagick
    pub fn new(
        raw: &'a RawModel,
        output_folder: impl Into<PathBuf>,
        embed: bool,
        options: TextureBuildOptions,
    ) -> Self {
        let tool = Box::new(ImageMagick::new(options.tool_program.clone()));
        Self::with_tool(raw, output_folder, embed, options, tool)
    }

    /// Builder with a caller-supplied conversion tool
    pub fn with_tool(
        raw: &'a RawModel,
        output_folder: impl Into<PathBuf>,
        embed: bool,
        options: TextureBuildOptions,
        tool: Box<dyn ConversionTool>,
    ) -> Self {
        let output_folder = output_folder.into();
        let emitter = if embed {
            ResourceEmitter::embedded()
        } else {
            ResourceEmitter::files(output_folder.clone())
        };
        let converter = LegacyFormatConverter::new(tool, output_folder, &options);
        Self {
            raw,
            options,
            emitter,
            converter,
            cache: HashMap::new(),
            stats: BuildStats::default(),
        }
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    pub fn is_embedded(&self) -> bool {
        self.emitter.is_embedded()
    }

    pub fn raw(&self) -> &'a RawModel {
        self.raw
    }

    /// Number of distinct textures built so far
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Dispatch a request: several slots go through the merge path, a
    /// single slot through the single-texture path.
    pub fn resolve(
        &mut self,
        doc: &mut GltfDocument,
        request: &BuildRequest,
        merger: &dyn PixelMerger,
    ) -> Option<usize> {
        match request.indices.as_slice() {
            [single] => self.simple(doc, (*single)?, &request.tag),
            indices => self.combine(doc, indices, &request.tag, merger, request.include_alpha),
        }
    }

    /// Texture for one raw texture used as-is (after format conversion)
    pub fn simple(&mut self, doc: &mut GltfDocument, index: usize, tag: &str) -> Option<usize> {
        let key = BuildRequest::single(index, tag).cache_key();
        self.cached_or_build(key, |builder| builder.build_simple(doc, index))
    }

    /// Texture merged from several raw textures through `merger`
    pub fn combine(
        &mut self,
        doc: &mut GltfDocument,
        indices: &[Option<usize>],
        tag: &str,
        merger: &dyn PixelMerger,
        include_alpha: bool,
    ) -> Option<usize> {
        let key = BuildRequest::merged(indices.to_vec(), tag, include_alpha).cache_key();
        self.cached_or_build(key, |builder| {
            builder.build_merged(doc, indices, tag, merger, include_alpha)
        })
    }

    fn cached_or_build(
        &mut self,
        key: String,
        build: impl FnOnce(&mut Self) -> TextureResult<usize>,
    ) -> Option<usize> {
        if let Some(&texture) = self.cache.get(&key) {
            debug!(key = %key, texture, "Texture cache hit");
            self.stats.cache_hits += 1;
            return Some(texture);
        }

        match build(self) {
            Ok(texture) => {
                debug!(key = %key, texture, "Built texture");
                self.cache.insert(key, texture);
                Some(texture)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Texture build failed");
                self.stats.failures += 1;
                None
            }
        }
    }

    fn raw_texture(&self, index: usize) -> TextureResult<&'a RawTexture> {
        self.raw
            .get_texture(index)
            .ok_or_else(|| TextureError::NoUsableImage(format!("texture index {index} out of range")))
    }

    fn build_simple(&mut self, doc: &mut GltfDocument, index: usize) -> TextureResult<usize> {
        let mut texture = self.raw_texture(index)?.clone();
        if !texture.has_location() {
            return Err(TextureError::NoUsableImage(format!(
                "texture '{}' has no file",
                texture.name
            )));
        }

        refresh_properties(&mut texture);
        match self.converter.prepare(&mut texture, self.emitter.is_embedded()) {
            ConversionOutcome::NotNeeded | ConversionOutcome::Reused { .. } => {}
            ConversionOutcome::Converted { .. } => self.stats.conversions += 1,
            ConversionOutcome::Failed(e) => return Err(e),
        }

        let (image, emission) = self.emitter.emit_source_file(doc, &texture)?;
        self.record(&emission);

        let name = if texture.name.is_empty() {
            texture.location_stem()
        } else {
            texture.name.clone()
        };
        Ok(doc.add_texture(Texture {
            name,
            sampler: doc.default_sampler(),
            source: image,
            transform: TextureTransform::from(&texture),
        }))
    }

    fn build_merged(
        &mut self,
        doc: &mut GltfDocument,
        indices: &[Option<usize>],
        tag: &str,
        merger: &dyn PixelMerger,
        include_alpha: bool,
    ) -> TextureResult<usize> {
        let mut sources = Vec::with_capacity(indices.len());
        let mut first: Option<&RawTexture> = None;
        let mut name = tag.to_string();

        for index in indices {
            let texture = match index {
                Some(i) => self.raw_texture(*i)?,
                None => {
                    sources.push(None);
                    continue;
                }
            };
            if !texture.has_location() {
                sources.push(None);
                continue;
            }

            self.stats.decodes += 1;
            match SourceImage::open(&texture.file_location) {
                Ok(image) => {
                    first.get_or_insert(texture);
                    name.push('_');
                    name.push_str(&texture.location_stem());
                    sources.push(Some(image));
                }
                Err(e) => {
                    warn!(texture = %texture.name, error = %e, "Skipping merge source");
                    sources.push(None);
                }
            }
        }

        let merged = merge_images(&sources, include_alpha, merger)?;
        let encoded = merged.encode(self.options.jpeg_quality)?;
        self.stats.encodes += 1;

        let (image, emission) = self.emitter.emit_encoded(doc, &name, &encoded)?;
        self.record(&emission);

        let transform = first.map(TextureTransform::from).unwrap_or_default();
        Ok(doc.add_texture(Texture {
            name,
            sampler: doc.default_sampler(),
            source: image,
            transform,
        }))
    }

    fn record(&mut self, emission: &Emission) {
        match emission {
            Emission::Embedded { .. } => self.stats.embeds += 1,
            Emission::Written { .. } => self.stats.writes += 1,
            Emission::Copied { .. } => self.stats.copies += 1,
            Emission::Referenced { .. } => {}
        }
    }
}

/// Overwrite authored size and opacity with what the file actually holds.
/// Authored values stay when the file can't be read.
fn refresh_properties(texture: &mut RawTexture) {
    match read_properties(&texture.file_location) {
        Ok(props) => {
            if props.opacity != texture.occlusion {
                debug!(
                    texture = %texture.name,
                    authored = %texture.occlusion,
                    found = %props.opacity,
                    "Texture opacity differs from source"
                );
            }
            texture.width = props.width;
            texture.height = props.height;
            texture.occlusion = props.opacity;
        }
        Err(e) => {
            debug!(texture = %texture.name, error = %e, "Keeping authored texture properties");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        assert_eq!(BuildRequest::single(3, "simple").cache_key(), "simple_3");
        assert_eq!(
            BuildRequest::merged(vec![Some(0), None, Some(2)], "ao_met_rough", false).cache_key(),
            "ao_met_rough_0_-_2"
        );
        assert_eq!(
            BuildRequest::merged(vec![Some(1)], "base", true).cache_key(),
            "base_1+alpha"
        );
    }

    #[test]
    fn test_key_is_order_sensitive() {
        let a = BuildRequest::merged(vec![Some(0), Some(1)], "t", false);
        let b = BuildRequest::merged(vec![Some(1), Some(0)], "t", false);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: TextureBuildOptions =
            serde_json::from_str(r#"{ "tool_program": "convert", "jpeg_quality": 90 }"#).unwrap();
        assert_eq!(options.tool_program, "convert");
        assert_eq!(options.jpeg_quality, 90);
        assert_eq!(options.legacy_suffixes, vec!["tga".to_string()]);
        assert_eq!(options.converted_dir, "convertedTextures");
    }

    #[test]
    fn test_out_of_range_index_is_none() {
        let raw = RawModel::new();
        let dir = tempfile::tempdir().unwrap();
        let mut builder = TextureBuilder::new(&raw, dir.path(), true, TextureBuildOptions::default());
        let mut doc = GltfDocument::new("test");
        assert_eq!(builder.simple(&mut doc, 7, "simple"), None);
        assert_eq!(builder.stats().failures, 1);
        assert_eq!(builder.cached_count(), 0);
    }
}
