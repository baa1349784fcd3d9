//! Raw texture references

use std::path::{Path, PathBuf};

use scene2gltf_core::Vec2;
use serde::{Deserialize, Serialize};

/// Semantic role of a texture within its material
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureUsage {
    Unknown,
    Ambient,
    Diffuse,
    Normal,
    Specular,
    Shininess,
    Emissive,
    Reflection,
    Albedo,
    Occlusion,
    Roughness,
    Metallic,
    /// Pre-packed occlusion (R), roughness (G), metallic (B)
    AoMetRough,
    Modulation,
}

impl TextureUsage {
    /// Whether the texel values are data rather than colour, so a lossy
    /// encoding would damage them.
    pub fn is_precision_sensitive(&self) -> bool {
        matches!(
            self,
            TextureUsage::Normal
                | TextureUsage::Shininess
                | TextureUsage::AoMetRough
                | TextureUsage::Modulation
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextureUsage::Unknown => "unknown",
            TextureUsage::Ambient => "ambient",
            TextureUsage::Diffuse => "diffuse",
            TextureUsage::Normal => "normal",
            TextureUsage::Specular => "specular",
            TextureUsage::Shininess => "shininess",
            TextureUsage::Emissive => "emissive",
            TextureUsage::Reflection => "reflection",
            TextureUsage::Albedo => "albedo",
            TextureUsage::Occlusion => "occlusion",
            TextureUsage::Roughness => "roughness",
            TextureUsage::Metallic => "metallic",
            TextureUsage::AoMetRough => "ao_met_rough",
            TextureUsage::Modulation => "modulation",
        }
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        TextureUsage::Unknown
    }
}

impl std::fmt::Display for TextureUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Opacity classification of an image's alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opacity {
    /// No alpha, or every alpha value is fully opaque
    Opaque,
    /// At least one alpha value strictly between 0 and 255
    Transparent,
    /// Alpha is binary: some texels are fully transparent, none partial
    Mask,
}

impl Opacity {
    pub fn is_opaque(&self) -> bool {
        matches!(self, Opacity::Opaque)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opacity::Opaque => "opaque",
            Opacity::Transparent => "transparent",
            Opacity::Mask => "mask",
        }
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity::Opaque
    }
}

impl std::fmt::Display for Opacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A texture as read from the source asset
///
/// Immutable once the model is built; the texture builder works on clones
/// when it needs to redirect a reference to a converted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTexture {
    /// Texture name as authored
    pub name: String,
    /// File name as stored in the source asset
    #[serde(default)]
    pub file_name: String,
    /// Resolved on-disk location (empty when unresolved)
    #[serde(default)]
    pub file_location: PathBuf,
    #[serde(default)]
    pub usage: TextureUsage,
    #[serde(default)]
    pub occlusion: Opacity,
    #[serde(default = "one")]
    pub width: u32,
    #[serde(default = "one")]
    pub height: u32,
    /// UV offset
    #[serde(default)]
    pub translation: Vec2,
    /// UV rotation in radians
    #[serde(default)]
    pub rotation: f32,
    /// UV scale
    #[serde(default = "unit_scale")]
    pub scale: Vec2,
}

fn one() -> u32 {
    1
}

fn unit_scale() -> Vec2 {
    Vec2::ONE
}

impl RawTexture {
    /// Create a texture reference with identity UV transform
    pub fn new(name: impl Into<String>, file_location: impl AsRef<Path>, usage: TextureUsage) -> Self {
        let file_location = file_location.as_ref().to_path_buf();
        let file_name = file_location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: name.into(),
            file_name,
            file_location,
            usage,
            occlusion: Opacity::Opaque,
            width: 1,
            height: 1,
            translation: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }

    /// Builder-style opacity override
    pub fn with_occlusion(mut self, occlusion: Opacity) -> Self {
        self.occlusion = occlusion;
        self
    }

    /// Builder-style UV transform override
    pub fn with_transform(mut self, translation: Vec2, rotation: f32, scale: Vec2) -> Self {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    /// Whether this reference points at a file at all
    pub fn has_location(&self) -> bool {
        !self.file_location.as_os_str().is_empty()
    }

    /// Lower-cased file suffix of the resolved location
    pub fn suffix(&self) -> Option<String> {
        self.file_location
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// File stem of the resolved location (`"wood"` for `"a/wood.tga"`)
    pub fn location_stem(&self) -> String {
        self.file_location
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Forget the file reference so later resolution yields "no image"
    pub fn clear_location(&mut self) {
        self.file_location = PathBuf::new();
        self.name.clear();
    }

    /// Whether the UV transform is the identity
    pub fn has_identity_transform(&self) -> bool {
        self.translation == Vec2::ZERO && self.rotation == 0.0 && self.scale == Vec2::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_sensitive_usages() {
        assert!(TextureUsage::Normal.is_precision_sensitive());
        assert!(TextureUsage::Shininess.is_precision_sensitive());
        assert!(TextureUsage::AoMetRough.is_precision_sensitive());
        assert!(TextureUsage::Modulation.is_precision_sensitive());
        assert!(!TextureUsage::Diffuse.is_precision_sensitive());
        assert!(!TextureUsage::Albedo.is_precision_sensitive());
    }

    #[test]
    fn test_suffix_and_stem() {
        let tex = RawTexture::new("wood", "textures/Wood_Diffuse.TGA", TextureUsage::Diffuse);
        assert_eq!(tex.file_name, "Wood_Diffuse.TGA");
        assert_eq!(tex.suffix().as_deref(), Some("tga"));
        assert_eq!(tex.location_stem(), "Wood_Diffuse");
    }

    #[test]
    fn test_clear_location() {
        let mut tex = RawTexture::new("wood", "wood.tga", TextureUsage::Diffuse);
        assert!(tex.has_location());
        tex.clear_location();
        assert!(!tex.has_location());
        assert!(tex.name.is_empty());
        assert_eq!(tex.suffix(), None);
    }

    #[test]
    fn test_identity_transform() {
        let tex = RawTexture::new("t", "t.png", TextureUsage::Normal);
        assert!(tex.has_identity_transform());
        let moved = tex.with_transform(Vec2::new(0.5, 0.0), 0.0, Vec2::ONE);
        assert!(!moved.has_identity_transform());
    }

    #[test]
    fn test_deserialize_defaults() {
        let tex: RawTexture =
            serde_json::from_str(r#"{ "name": "n", "file_location": "n.png" }"#).unwrap();
        assert_eq!(tex.usage, TextureUsage::Unknown);
        assert_eq!(tex.occlusion, Opacity::Opaque);
        assert_eq!(tex.scale, Vec2::ONE);
        assert_eq!((tex.width, tex.height), (1, 1));
    }
}
