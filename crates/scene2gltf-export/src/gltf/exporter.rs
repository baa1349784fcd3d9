//! glTF exporter implementation

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scene2gltf_core::Error as CoreError;
use scene2gltf_raw::RawModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::*;
use crate::textures::{BuildStats, ConversionTool, TextureBuildOptions, TextureBuilder};
use crate::translate::{translate_material, translate_node};

/// glTF export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GltfExportOptions {
    /// Export as GLB (single binary file) instead of separate JSON + BIN
    pub use_glb: bool,
    /// Keep textures as loose files even when writing GLB
    pub separate_textures: bool,
    /// Pretty-print JSON
    pub pretty_json: bool,
    /// `asset.generator` string
    pub generator: String,
    pub textures: TextureBuildOptions,
}

impl Default for GltfExportOptions {
    fn default() -> Self {
        Self {
            use_glb: false,
            separate_textures: false,
            pretty_json: true,
            generator: format!("scene2gltf {}", env!("CARGO_PKG_VERSION")),
            textures: TextureBuildOptions::default(),
        }
    }
}

impl GltfExportOptions {
    /// Images go into the binary blob only for self-contained GLB output
    pub fn embed_textures(&self) -> bool {
        self.use_glb && !self.separate_textures
    }

    /// Output file extension
    pub fn extension(&self) -> &'static str {
        if self.use_glb { "glb" } else { "gltf" }
    }

    /// Load options from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> scene2gltf_core::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| CoreError::invalid_config(format!("{}: {e}", path.display())))
    }
}

/// glTF export errors
#[derive(Debug, thiserror::Error)]
pub enum GltfExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid raw scene: {0}")]
    InvalidDocument(String),
}

pub type GltfResult<T> = Result<T, GltfExportError>;

/// What one export produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// The `.gltf` or `.glb` file
    pub document: PathBuf,
    /// The external `.bin` file, if one was written
    pub buffer: Option<PathBuf>,
    pub materials: usize,
    pub nodes: usize,
    pub textures: usize,
    pub images: usize,
    pub binary_len: usize,
    pub stats: BuildStats,
}

/// glTF exporter
pub struct GltfExporter {
    options: GltfExportOptions,
    tool: Option<Arc<dyn ConversionTool>>,
}

impl GltfExporter {
    /// Create a new glTF exporter
    pub fn new(options: GltfExportOptions) -> Self {
        Self {
            options,
            tool: None,
        }
    }

    /// Replace the ImageMagick subprocess used for legacy formats
    pub fn with_conversion_tool(mut self, tool: Arc<dyn ConversionTool>) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn options(&self) -> &GltfExportOptions {
        &self.options
    }

    /// Export a raw scene. `output_path`'s extension is replaced by `.glb` or
    /// `.gltf`; textures land in the same folder.
    pub fn export(&self, raw: &RawModel, output_path: impl AsRef<Path>) -> GltfResult<ExportSummary> {
        raw.validate()
            .map_err(|e| GltfExportError::InvalidDocument(e.to_string()))?;

        let document_path = output_path.as_ref().with_extension(self.options.extension());
        let output_folder = match document_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&output_folder)?;

        let (doc, stats) = self.build_document(raw, &output_folder);

        let buffer = if self.options.use_glb {
            self.write_glb(&doc, &document_path)?;
            None
        } else {
            self.write_separate_files(&doc, &document_path)?
        };

        let summary = ExportSummary {
            document: document_path,
            buffer,
            materials: doc.materials.len(),
            nodes: doc.nodes.len(),
            textures: doc.textures.len(),
            images: doc.images.len(),
            binary_len: doc.binary().len(),
            stats,
        };
        info!(
            path = %summary.document.display(),
            materials = summary.materials,
            textures = summary.textures,
            images = summary.images,
            cache_hits = stats.cache_hits,
            conversions = stats.conversions,
            failures = stats.failures,
            "Exported glTF"
        );
        Ok(summary)
    }

    /// Translate every material and node into a fresh document
    pub fn build_document(&self, raw: &RawModel, output_folder: &Path) -> (GltfDocument, BuildStats) {
        let mut doc = GltfDocument::new(self.options.generator.clone());
        let embed = self.options.embed_textures();
        let texture_options = self.options.textures.clone();
        let mut builder = match &self.tool {
            Some(tool) => TextureBuilder::with_tool(
                raw,
                output_folder,
                embed,
                texture_options,
                Box::new(tool.clone()),
            ),
            None => TextureBuilder::new(raw, output_folder, embed, texture_options),
        };

        for material in &raw.materials {
            let translated = translate_material(&mut builder, &mut doc, material);
            doc.add_material(translated);
        }
        for node in &raw.nodes {
            doc.add_node(translate_node(node));
        }
        doc.scene_nodes = scene_roots(raw);

        debug!(cached = builder.cached_count(), "Texture build finished");
        (doc, builder.stats())
    }

    fn to_json(&self, gltf: &Gltf, pretty: bool) -> GltfResult<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(gltf)?
        } else {
            serde_json::to_string(gltf)?
        })
    }

    /// Write separate JSON + BIN files; the BIN file only exists when
    /// something was put in the blob.
    fn write_separate_files(&self, doc: &GltfDocument, json_path: &Path) -> GltfResult<Option<PathBuf>> {
        let bin_path = json_path.with_extension("bin");
        let buffer_uri = bin_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        let gltf = doc.to_gltf(buffer_uri);
        std::fs::write(json_path, self.to_json(&gltf, self.options.pretty_json)?)?;

        if doc.binary().is_empty() {
            return Ok(None);
        }
        let mut bin = doc.binary().to_vec();
        bin.resize(doc.padded_binary_len(), 0);
        std::fs::write(&bin_path, bin)?;
        Ok(Some(bin_path))
    }

    /// Write GLB (binary glTF)
    fn write_glb(&self, doc: &GltfDocument, glb_path: &Path) -> GltfResult<()> {
        let json = self.to_json(&doc.to_gltf(None), false)?;
        let mut file = std::fs::File::create(glb_path)?;
        file.write_all(&glb_bytes(&json, doc.binary()))?;
        Ok(())
    }
}

/// Root node, or every node nobody lists as a child
fn scene_roots(raw: &RawModel) -> Vec<usize> {
    if let Some(root) = raw.root_node {
        return vec![root];
    }
    let children: HashSet<usize> = raw.nodes.iter().flat_map(|n| n.children.iter().copied()).collect();
    (0..raw.nodes.len()).filter(|i| !children.contains(i)).collect()
}

/// Assemble a GLB container. The BIN chunk is left out when `bin` is empty.
pub fn glb_bytes(json: &str, bin: &[u8]) -> Vec<u8> {
    let json_len = json.len();
    let json_padding = (4 - (json_len % 4)) % 4;
    let bin_len = bin.len();
    let bin_padding = (4 - (bin_len % 4)) % 4;

    let mut total_len = 12 + 8 + json_len + json_padding;
    if bin_len > 0 {
        total_len += 8 + bin_len + bin_padding;
    }

    let mut out = Vec::with_capacity(total_len);
    // GLB header
    out.extend_from_slice(b"glTF"); // Magic
    out.extend_from_slice(&2u32.to_le_bytes()); // Version
    out.extend_from_slice(&(total_len as u32).to_le_bytes());

    // JSON chunk
    out.extend_from_slice(&((json_len + json_padding) as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    out.extend_from_slice(json.as_bytes());
    out.extend(std::iter::repeat(0x20u8).take(json_padding)); // Space padding

    if bin_len > 0 {
        // BIN chunk
        out.extend_from_slice(&((bin_len + bin_padding) as u32).to_le_bytes());
        out.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
        out.extend_from_slice(bin);
        out.extend(std::iter::repeat(0u8).take(bin_padding)); // Zero padding
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene2gltf_raw::RawNode;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_glb_layout() {
        let bytes = glb_bytes("{\"a\":1}", &[1, 2, 3, 4, 5]);
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(read_u32(&bytes, 4), 2);
        assert_eq!(read_u32(&bytes, 8) as usize, bytes.len());

        // JSON chunk: 7 bytes + 1 space
        assert_eq!(read_u32(&bytes, 12), 8);
        assert_eq!(&bytes[20..28], b"{\"a\":1} ");

        // BIN chunk: 5 bytes + 3 zeros
        assert_eq!(read_u32(&bytes, 28), 8);
        assert_eq!(read_u32(&bytes, 32), 0x004E4942);
        assert_eq!(&bytes[36..44], &[1, 2, 3, 4, 5, 0, 0, 0]);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn test_glb_without_binary() {
        let bytes = glb_bytes("{}  ", &[]);
        assert_eq!(bytes.len(), 12 + 8 + 4);
        assert_eq!(read_u32(&bytes, 8), 24);
    }

    #[test]
    fn test_scene_roots() {
        let mut raw = RawModel::new();
        raw.add_node(RawNode::new("a").with_child(1));
        raw.add_node(RawNode::new("b"));
        raw.add_node(RawNode::new("c"));
        assert_eq!(scene_roots(&raw), vec![0, 2]);

        raw.root_node = Some(0);
        assert_eq!(scene_roots(&raw), vec![0]);
    }

    #[test]
    fn test_embed_mode() {
        let mut options = GltfExportOptions::default();
        assert!(!options.embed_textures());
        options.use_glb = true;
        assert!(options.embed_textures());
        options.separate_textures = true;
        assert!(!options.embed_textures());
    }

    #[test]
    fn test_options_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{ "use_glb": true, "textures": { "tool_program": "convert" } }"#,
        )
        .unwrap();

        let options = GltfExportOptions::from_json_file(&path).unwrap();
        assert!(options.use_glb);
        assert!(options.pretty_json);
        assert_eq!(options.textures.tool_program, "convert");
        assert_eq!(options.textures.max_dimension, 1024);
    }

    #[test]
    fn test_options_type_mismatch_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{ "use_glb": "yes" }"#).unwrap();

        let err = GltfExportOptions::from_json_file(&path).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
        assert!(err.to_string().contains("options.json"));

        let missing = GltfExportOptions::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(CoreError::FileNotFound(_))));
    }
}
