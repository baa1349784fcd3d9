//! Raw materials

use std::collections::BTreeMap;

use scene2gltf_core::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::texture::TextureUsage;

/// Blend behaviour of a material, with skinned variants kept distinct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawMaterialType {
    Opaque,
    Transparent,
    TransparentMask,
    SkinnedOpaque,
    SkinnedTransparent,
    SkinnedTransparentMask,
}

impl RawMaterialType {
    pub fn is_skinned(&self) -> bool {
        matches!(
            self,
            RawMaterialType::SkinnedOpaque
                | RawMaterialType::SkinnedTransparent
                | RawMaterialType::SkinnedTransparentMask
        )
    }

    pub fn is_transparent(&self) -> bool {
        !matches!(self, RawMaterialType::Opaque | RawMaterialType::SkinnedOpaque)
    }
}

impl Default for RawMaterialType {
    fn default() -> Self {
        RawMaterialType::Opaque
    }
}

/// Lighting model the source material was authored with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawShadingModel {
    Unknown,
    Constant,
    Lambert,
    Blinn,
    Phong,
    PbrMetRough,
}

impl RawShadingModel {
    /// Display name used in exported extras
    pub fn describe(&self) -> &'static str {
        match self {
            RawShadingModel::Unknown => "<unknown>",
            RawShadingModel::Constant => "Constant",
            RawShadingModel::Lambert => "Lambert",
            RawShadingModel::Blinn => "Blinn",
            RawShadingModel::Phong => "Phong",
            RawShadingModel::PbrMetRough => "Metallic/Roughness",
        }
    }
}

impl Default for RawShadingModel {
    fn default() -> Self {
        RawShadingModel::Unknown
    }
}

/// Scalar and colour parameters of a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawMaterialInfo {
    /// Physically based metallic/roughness parameters
    MetRough {
        base_color: Vec4,
        metallic: f32,
        roughness: f32,
        #[serde(default)]
        emissive: Vec3,
        #[serde(default = "unit")]
        emissive_intensity: f32,
    },
    /// Lambert/Blinn/Phong parameters
    Traditional {
        diffuse: Vec4,
        #[serde(default)]
        specular: Vec3,
        #[serde(default)]
        shininess: f32,
        #[serde(default)]
        ambient: Vec3,
        #[serde(default)]
        emissive: Vec3,
    },
}

fn unit() -> f32 {
    1.0
}

impl Default for RawMaterialInfo {
    fn default() -> Self {
        RawMaterialInfo::MetRough {
            base_color: Vec4::ONE,
            metallic: 0.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
        }
    }
}

/// A material as read from the source asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub name: String,
    #[serde(default)]
    pub material_type: RawMaterialType,
    #[serde(default)]
    pub shading_model: RawShadingModel,
    /// Texture index per usage slot
    #[serde(default)]
    pub textures: BTreeMap<TextureUsage, usize>,
    #[serde(default)]
    pub info: RawMaterialInfo,
    /// Free-form user properties, each a JSON object string
    #[serde(default)]
    pub user_properties: Vec<String>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>, shading_model: RawShadingModel) -> Self {
        Self {
            name: name.into(),
            shading_model,
            ..Default::default()
        }
    }

    /// Texture index bound to `usage`, if any
    pub fn texture(&self, usage: TextureUsage) -> Option<usize> {
        self.textures.get(&usage).copied()
    }

    /// Builder-style texture slot assignment
    pub fn with_texture(mut self, usage: TextureUsage, index: usize) -> Self {
        self.textures.insert(usage, index);
        self
    }

    pub fn is_pbr(&self) -> bool {
        self.shading_model == RawShadingModel::PbrMetRough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_type_flags() {
        assert!(RawMaterialType::SkinnedTransparentMask.is_skinned());
        assert!(RawMaterialType::SkinnedTransparentMask.is_transparent());
        assert!(!RawMaterialType::SkinnedOpaque.is_transparent());
        assert!(!RawMaterialType::Transparent.is_skinned());
    }

    #[test]
    fn test_texture_slots() {
        let mat = RawMaterial::new("steel", RawShadingModel::PbrMetRough)
            .with_texture(TextureUsage::Albedo, 0)
            .with_texture(TextureUsage::Roughness, 3);
        assert_eq!(mat.texture(TextureUsage::Albedo), Some(0));
        assert_eq!(mat.texture(TextureUsage::Roughness), Some(3));
        assert_eq!(mat.texture(TextureUsage::Normal), None);
        assert!(mat.is_pbr());
    }

    #[test]
    fn test_deserialize_traditional() {
        let json = r#"{
            "name": "paint",
            "shading_model": "phong",
            "textures": { "diffuse": 1, "shininess": 2 },
            "info": { "kind": "traditional", "diffuse": [1.0, 0.5, 0.5, 1.0], "shininess": 20.0 }
        }"#;
        let mat: RawMaterial = serde_json::from_str(json).unwrap();
        assert_eq!(mat.texture(TextureUsage::Shininess), Some(2));
        match mat.info {
            RawMaterialInfo::Traditional { shininess, .. } => assert_eq!(shininess, 20.0),
            other => panic!("unexpected info {other:?}"),
        }
    }
}
