//! glTF 2.0 exporter
//!
//! Serializable glTF structures, the index-addressed document arena the
//! exporter fills in, and the `.gltf`/`.glb` writers.

mod document;
mod exporter;

pub use document::GltfDocument;
pub use exporter::{ExportSummary, GltfExportError, GltfExportOptions, GltfExporter, GltfResult};

use serde::{Deserialize, Serialize};

pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";

/// glTF 2.0 root structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gltf {
    pub asset: Asset,
    #[serde(skip_serializing_if = "Vec::is_empty", default, rename = "extensionsUsed")]
    pub extensions_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub textures: Vec<Texture>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub samplers: Vec<Sampler>,
    #[serde(skip_serializing_if = "Vec::is_empty", default, rename = "bufferViews")]
    pub buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub buffers: Vec<Buffer>,
}

/// glTF asset metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

/// glTF scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

/// glTF node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

/// UV transform carried by a texture and written wherever it is referenced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureTransform {
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
}

impl TextureTransform {
    pub const IDENTITY: Self = Self {
        offset: [0.0, 0.0],
        rotation: 0.0,
        scale: [1.0, 1.0],
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<&scene2gltf_raw::RawTexture> for TextureTransform {
    fn from(tex: &scene2gltf_raw::RawTexture) -> Self {
        Self {
            offset: tex.translation.to_array(),
            rotation: tex.rotation,
            scale: tex.scale.to_array(),
        }
    }
}

/// glTF texture: a sampler applied to an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub sampler: usize,
    pub source: usize,
    /// Not part of the texture object itself; copied onto each reference
    #[serde(skip)]
    pub transform: TextureTransform,
}

/// glTF image: either a buffer view or a relative URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "bufferView")]
    pub buffer_view: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
}

impl Image {
    /// Image stored inside the binary blob
    pub fn embedded(name: impl Into<String>, buffer_view: usize, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: None,
            buffer_view: Some(buffer_view),
            mime_type: Some(mime_type.into()),
        }
    }

    /// Image stored next to the document
    pub fn file(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: Some(uri.into()),
            buffer_view: None,
            mime_type: None,
        }
    }
}

/// glTF sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sampler {
    #[serde(skip_serializing_if = "Option::is_none", rename = "magFilter")]
    pub mag_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "minFilter")]
    pub min_filter: Option<u32>,
    #[serde(rename = "wrapS")]
    pub wrap_s: u32,
    #[serde(rename = "wrapT")]
    pub wrap_t: u32,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            mag_filter: Some(FILTER_LINEAR),
            min_filter: Some(FILTER_LINEAR_MIPMAP_LINEAR),
            wrap_s: WRAP_REPEAT,
            wrap_t: WRAP_REPEAT,
        }
    }
}

/// Reference from a material slot to a texture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    pub index: usize,
    #[serde(rename = "texCoord")]
    pub tex_coord: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<TextureRefExtensions>,
}

impl TextureRef {
    /// Reference `texture` (stored at `index`), attaching its UV transform
    /// only when it differs from identity.
    pub fn new(index: usize, texture: &Texture) -> Self {
        let extensions = (!texture.transform.is_identity()).then(|| TextureRefExtensions {
            khr_texture_transform: texture.transform,
        });
        Self {
            index,
            tex_coord: 0,
            extensions,
        }
    }

    pub fn has_transform(&self) -> bool {
        self.extensions.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRefExtensions {
    #[serde(rename = "KHR_texture_transform")]
    pub khr_texture_transform: TextureTransform,
}

/// glTF material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "alphaMode")]
    pub alpha_mode: AlphaMode,
    #[serde(skip_serializing_if = "Option::is_none", rename = "pbrMetallicRoughness")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "normalTexture")]
    pub normal_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "occlusionTexture")]
    pub occlusion_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "emissiveTexture")]
    pub emissive_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "emissiveFactor")]
    pub emissive_factor: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<MaterialExtensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl Material {
    /// All texture references held by this material
    pub fn texture_refs(&self) -> impl Iterator<Item = &TextureRef> {
        let pbr = self.pbr_metallic_roughness.as_ref();
        [
            pbr.and_then(|p| p.base_color_texture.as_ref()),
            pbr.and_then(|p| p.metallic_roughness_texture.as_ref()),
            self.normal_texture.as_ref(),
            self.occlusion_texture.as_ref(),
            self.emissive_texture.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_unlit(&self) -> bool {
        self.extensions
            .as_ref()
            .is_some_and(|e| e.khr_materials_unlit.is_some())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Blend,
    Mask,
}

/// PBR metallic roughness material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PbrMetallicRoughness {
    #[serde(skip_serializing_if = "Option::is_none", rename = "baseColorTexture")]
    pub base_color_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "baseColorFactor")]
    pub base_color_factor: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "metallicRoughnessTexture")]
    pub metallic_roughness_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "metallicFactor")]
    pub metallic_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "roughnessFactor")]
    pub roughness_factor: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialExtensions {
    #[serde(skip_serializing_if = "Option::is_none", rename = "KHR_materials_unlit")]
    pub khr_materials_unlit: Option<Unlit>,
}

/// Empty marker object for `KHR_materials_unlit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unlit {}

/// glTF buffer view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferView {
    pub buffer: usize,
    #[serde(skip_serializing_if = "Option::is_none", rename = "byteOffset")]
    pub byte_offset: Option<usize>,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
}

/// glTF buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buffer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
}

// glTF sampler filter constants
pub const FILTER_LINEAR: u32 = 9729;
pub const FILTER_LINEAR_MIPMAP_LINEAR: u32 = 9987;

// glTF sampler wrap constants
pub const WRAP_REPEAT: u32 = 10497;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texture(transform: TextureTransform) -> Texture {
        Texture {
            name: "t".into(),
            sampler: 0,
            source: 0,
            transform,
        }
    }

    #[test]
    fn test_texture_ref_omits_identity_transform() {
        let r = TextureRef::new(3, &texture(TextureTransform::IDENTITY));
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({ "index": 3, "texCoord": 0 })
        );
    }

    #[test]
    fn test_texture_ref_writes_transform() {
        let transform = TextureTransform {
            offset: [0.5, 0.0],
            rotation: 0.0,
            scale: [2.0, 2.0],
        };
        let r = TextureRef::new(1, &texture(transform));
        assert!(r.has_transform());
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({
                "index": 1,
                "texCoord": 0,
                "extensions": {
                    "KHR_texture_transform": { "offset": [0.5, 0.0], "rotation": 0.0, "scale": [2.0, 2.0] }
                }
            })
        );
    }

    #[test]
    fn test_texture_record_hides_transform() {
        let value = serde_json::to_value(texture(TextureTransform {
            offset: [1.0, 1.0],
            ..TextureTransform::IDENTITY
        }))
        .unwrap();
        assert_eq!(value, json!({ "name": "t", "sampler": 0, "source": 0 }));
    }

    #[test]
    fn test_image_variants() {
        assert_eq!(
            serde_json::to_value(Image::embedded("a", 2, "image/png")).unwrap(),
            json!({ "name": "a", "bufferView": 2, "mimeType": "image/png" })
        );
        assert_eq!(
            serde_json::to_value(Image::file("b", "b.jpg")).unwrap(),
            json!({ "name": "b", "uri": "b.jpg" })
        );
    }

    #[test]
    fn test_unlit_serializes_as_empty_object() {
        let mat = Material {
            extensions: Some(MaterialExtensions {
                khr_materials_unlit: Some(Unlit {}),
            }),
            ..Default::default()
        };
        assert!(mat.is_unlit());
        let value = serde_json::to_value(&mat).unwrap();
        assert_eq!(value["extensions"], json!({ "KHR_materials_unlit": {} }));
        assert_eq!(value["alphaMode"], json!("OPAQUE"));
    }
}
