//! Index-addressed glTF document arena
//!
//! Every record the exporter produces lives in one of these tables and is
//! referred to by index; nothing holds a record by ownership except the
//! document itself.

use std::path::Path;

use tracing::warn;

use super::*;

/// Output-side resource tables plus the shared binary blob
#[derive(Debug, Clone)]
pub struct GltfDocument {
    pub generator: String,
    pub nodes: Vec<Node>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
    pub buffer_views: Vec<BufferView>,
    /// Root node indices of the default scene
    pub scene_nodes: Vec<usize>,
    default_sampler: usize,
    binary: Vec<u8>,
}

impl GltfDocument {
    /// Create an empty document with a default sampler
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            nodes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            images: Vec::new(),
            samplers: vec![Sampler::default()],
            buffer_views: Vec::new(),
            scene_nodes: Vec::new(),
            default_sampler: 0,
            binary: Vec::new(),
        }
    }

    pub fn default_sampler(&self) -> usize {
        self.default_sampler
    }

    /// Contents of the shared binary buffer
    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    /// Append `data` to the binary blob and return the new buffer view index.
    /// Views start on 4-byte boundaries.
    pub fn add_raw_buffer_view(&mut self, data: &[u8]) -> usize {
        let padding = (4 - (self.binary.len() % 4)) % 4;
        self.binary.extend(std::iter::repeat(0u8).take(padding));

        let offset = self.binary.len();
        self.binary.extend_from_slice(data);

        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: Some(offset),
            byte_length: data.len(),
        });
        self.buffer_views.len() - 1
    }

    /// Read a whole file into a new buffer view
    ///
    /// Returns `None` (after logging) if the file can't be read.
    pub fn add_buffer_view_for_file(&mut self, path: &Path) -> Option<usize> {
        match std::fs::read(path) {
            Ok(data) => Some(self.add_raw_buffer_view(&data)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Couldn't read file for embedding");
                None
            }
        }
    }

    /// Bytes held by a buffer view
    pub fn buffer_view_data(&self, index: usize) -> Option<&[u8]> {
        let view = self.buffer_views.get(index)?;
        let start = view.byte_offset.unwrap_or(0);
        self.binary.get(start..start + view.byte_length)
    }

    pub fn add_image(&mut self, image: Image) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    pub fn image(&self, index: usize) -> Option<&Image> {
        self.images.get(index)
    }

    /// Build a reference to the texture stored at `index`
    pub fn texture_ref(&self, index: usize) -> Option<TextureRef> {
        self.texture(index).map(|t| TextureRef::new(index, t))
    }

    /// Extensions referenced anywhere in the document
    pub fn extensions_used(&self) -> Vec<String> {
        let mut used = Vec::new();
        if self
            .materials
            .iter()
            .flat_map(|m| m.texture_refs())
            .any(|r| r.has_transform())
        {
            used.push(KHR_TEXTURE_TRANSFORM.to_string());
        }
        if self.materials.iter().any(|m| m.is_unlit()) {
            used.push(KHR_MATERIALS_UNLIT.to_string());
        }
        used
    }

    /// Assemble the serializable root. `buffer_uri` is `None` for GLB, where
    /// the buffer lives in the BIN chunk.
    pub fn to_gltf(&self, buffer_uri: Option<String>) -> Gltf {
        let buffers = if self.binary.is_empty() {
            Vec::new()
        } else {
            vec![Buffer {
                uri: buffer_uri,
                byte_length: self.padded_binary_len(),
            }]
        };

        let scenes = vec![Scene {
            name: Some("Root Scene".to_string()),
            nodes: self.scene_nodes.clone(),
        }];

        Gltf {
            asset: Asset {
                version: "2.0".to_string(),
                generator: Some(self.generator.clone()),
            },
            extensions_used: self.extensions_used(),
            scene: Some(0),
            scenes,
            nodes: self.nodes.clone(),
            materials: self.materials.clone(),
            textures: self.textures.clone(),
            images: self.images.clone(),
            samplers: self.samplers.clone(),
            buffer_views: self.buffer_views.clone(),
            buffers,
        }
    }

    /// Binary length rounded up to a multiple of four
    pub fn padded_binary_len(&self) -> usize {
        self.binary.len() + (4 - (self.binary.len() % 4)) % 4
    }
}
