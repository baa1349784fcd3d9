//! Raw model container

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use scene2gltf_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::material::RawMaterial;
use crate::node::RawNode;
use crate::texture::RawTexture;

/// The complete raw scene handed to the exporter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawModel {
    #[serde(default)]
    pub textures: Vec<RawTexture>,
    #[serde(default)]
    pub materials: Vec<RawMaterial>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    /// Index of the scene root node
    #[serde(default)]
    pub root_node: Option<usize>,
}

impl RawModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a raw scene from its JSON representation and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let model: RawModel = serde_json::from_reader(reader)
            .map_err(Error::from)
            .with_context(|| format!("parsing raw scene '{}'", path.display()))?;
        model.validate()?;
        debug!(
            path = %path.display(),
            textures = model.textures.len(),
            materials = model.materials.len(),
            nodes = model.nodes.len(),
            "Loaded raw scene"
        );
        Ok(model)
    }

    /// Check that every index in the model points at an existing entry
    pub fn validate(&self) -> Result<()> {
        for material in &self.materials {
            for (usage, &index) in &material.textures {
                if index >= self.textures.len() {
                    return Err(Error::invalid_data(format!(
                        "material '{}' references {} texture {} but only {} textures exist",
                        material.name,
                        usage,
                        index,
                        self.textures.len()
                    )));
                }
            }
        }
        for node in &self.nodes {
            if let Some(&child) = node.children.iter().find(|&&c| c >= self.nodes.len()) {
                return Err(Error::invalid_data(format!(
                    "node '{}' references missing child {}",
                    node.name, child
                )));
            }
        }
        if let Some(root) = self.root_node {
            if root >= self.nodes.len() {
                return Err(Error::invalid_data(format!("root node {root} does not exist")));
            }
        }
        Ok(())
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Get a texture by index
    pub fn get_texture(&self, index: usize) -> Option<&RawTexture> {
        self.textures.get(index)
    }

    /// Add a texture, reusing an existing entry with the same name, file
    /// location and usage. Returns its index.
    pub fn add_texture(&mut self, texture: RawTexture) -> usize {
        if let Some(existing) = self.textures.iter().position(|t| {
            t.name == texture.name
                && t.file_location == texture.file_location
                && t.usage == texture.usage
        }) {
            return existing;
        }
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_material(&mut self, material: RawMaterial) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_node(&mut self, node: RawNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}
