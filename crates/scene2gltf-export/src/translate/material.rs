//! Material translation
//!
//! Turns a raw material into a glTF PBR material. Metallic-roughness
//! materials pack occlusion, roughness and metallic into one texture, with
//! constant factors baked in for missing maps. Traditional materials derive
//! roughness from shininess.

use scene2gltf_core::{Vec3, Vec4};
use scene2gltf_raw::{RawMaterial, RawMaterialInfo, RawMaterialType, RawShadingModel, TextureUsage};
use serde_json::{Value, json};

use crate::gltf::{
    AlphaMode, GltfDocument, Material, MaterialExtensions, PbrMetallicRoughness, TextureRef, Unlit,
};
use crate::textures::{Pixel, TextureBuilder};
use crate::translate::merge_user_properties;

/// Tag for textures used as-is
pub const SIMPLE_TAG: &str = "simple";
/// Tag for occlusion (R), roughness (G) and metallic (B) packed together
pub const AO_MET_ROUGH_TAG: &str = "ao_met_rough";
/// Tag for roughness derived from a shininess map
pub const ROUGH_FROM_SHININESS_TAG: &str = "rough_from_shininess";

pub fn alpha_mode(material_type: RawMaterialType) -> AlphaMode {
    match material_type {
        RawMaterialType::Opaque | RawMaterialType::SkinnedOpaque => AlphaMode::Opaque,
        RawMaterialType::Transparent | RawMaterialType::SkinnedTransparent => AlphaMode::Blend,
        RawMaterialType::TransparentMask | RawMaterialType::SkinnedTransparentMask => {
            AlphaMode::Mask
        }
    }
}

/// Blinn-Phong exponent to GGX-style roughness
pub fn roughness_from_shininess(shininess: f32) -> f32 {
    (2.0 / (2.0 + shininess.max(0.0))).sqrt()
}

/// Translate a raw material, building its textures on the way
pub fn translate_material(
    builder: &mut TextureBuilder<'_>,
    doc: &mut GltfDocument,
    raw: &RawMaterial,
) -> Material {
    let normal_texture = simple(builder, doc, raw, TextureUsage::Normal);
    let emissive_texture = simple(builder, doc, raw, TextureUsage::Emissive);

    let (pbr, occlusion_texture, emissive) = match raw.info {
        RawMaterialInfo::MetRough {
            base_color,
            metallic,
            roughness,
            emissive,
            emissive_intensity,
        } => {
            let base_color_texture = simple(builder, doc, raw, TextureUsage::Albedo)
                .or_else(|| simple(builder, doc, raw, TextureUsage::Diffuse));
            let (packed, occlusion) = packed_ao_met_rough(builder, doc, raw, metallic, roughness);
            let pbr = pbr_block(
                raw.material_type,
                base_color_texture,
                base_color,
                packed,
                metallic,
                roughness,
            );
            let emissive = Vec3::new(
                emissive.x * emissive_intensity,
                emissive.y * emissive_intensity,
                emissive.z * emissive_intensity,
            );
            (pbr, occlusion, emissive)
        }
        RawMaterialInfo::Traditional {
            diffuse,
            shininess,
            emissive,
            ..
        } => {
            let base_color_texture = simple(builder, doc, raw, TextureUsage::Diffuse);
            let roughness_texture = raw.texture(TextureUsage::Shininess).and_then(|index| {
                let from_shininess =
                    |p: &[Pixel]| -> Pixel { [1.0, 1.0 - p[0][0], 0.0, 1.0] };
                let texture = builder.combine(
                    doc,
                    &[Some(index)],
                    ROUGH_FROM_SHININESS_TAG,
                    &from_shininess,
                    false,
                )?;
                doc.texture_ref(texture)
            });
            let pbr = pbr_block(
                raw.material_type,
                base_color_texture,
                diffuse,
                roughness_texture,
                0.0,
                roughness_from_shininess(shininess),
            );
            (pbr, None, emissive)
        }
    };

    let emissive = emissive.clamp01();
    let extensions = (raw.shading_model == RawShadingModel::Constant).then(|| MaterialExtensions {
        khr_materials_unlit: Some(Unlit {}),
    });

    Material {
        name: Some(raw.name.clone()),
        alpha_mode: alpha_mode(raw.material_type),
        pbr_metallic_roughness: Some(pbr),
        normal_texture,
        occlusion_texture,
        emissive_texture,
        emissive_factor: (emissive.length_squared() > 0.0).then(|| emissive.to_array()),
        extensions,
        extras: Some(extras(raw)),
    }
}

/// Texture bound to `usage`, used as-is
fn simple(
    builder: &mut TextureBuilder<'_>,
    doc: &mut GltfDocument,
    raw: &RawMaterial,
    usage: TextureUsage,
) -> Option<TextureRef> {
    let index = raw.texture(usage)?;
    let texture = builder.simple(doc, index, SIMPLE_TAG)?;
    doc.texture_ref(texture)
}

/// Metallic-roughness texture plus the occlusion texture it doubles as
fn packed_ao_met_rough(
    builder: &mut TextureBuilder<'_>,
    doc: &mut GltfDocument,
    raw: &RawMaterial,
    metallic: f32,
    roughness: f32,
) -> (Option<TextureRef>, Option<TextureRef>) {
    if let Some(index) = raw.texture(TextureUsage::AoMetRough) {
        let packed = builder
            .simple(doc, index, SIMPLE_TAG)
            .and_then(|t| doc.texture_ref(t));
        return (packed.clone(), packed);
    }

    let occlusion = raw.texture(TextureUsage::Occlusion);
    let rough = raw.texture(TextureUsage::Roughness);
    let metal = raw.texture(TextureUsage::Metallic);
    if occlusion.is_none() && rough.is_none() && metal.is_none() {
        return (None, None);
    }

    // Absent slots read as 1.0, so scaling by the factor bakes the constant
    let rough_scale = if rough.is_some() { 1.0 } else { roughness.clamp(0.0, 1.0) };
    let metal_scale = if metal.is_some() { 1.0 } else { metallic.clamp(0.0, 1.0) };
    let pack = move |p: &[Pixel]| -> Pixel {
        [p[0][0], p[1][0] * rough_scale, p[2][0] * metal_scale, 1.0]
    };

    // Baked constants are part of the image, so they go into the tag too
    let mut tag = AO_MET_ROUGH_TAG.to_string();
    if rough.is_none() {
        tag.push_str(&format!("_r{rough_scale:.3}"));
    }
    if metal.is_none() {
        tag.push_str(&format!("_m{metal_scale:.3}"));
    }

    let packed = builder
        .combine(doc, &[occlusion, rough, metal], &tag, &pack, false)
        .and_then(|t| doc.texture_ref(t));
    let occlusion_texture = if occlusion.is_some() { packed.clone() } else { None };
    (packed, occlusion_texture)
}

fn pbr_block(
    material_type: RawMaterialType,
    base_color_texture: Option<TextureRef>,
    base_color: Vec4,
    metallic_roughness_texture: Option<TextureRef>,
    metallic: f32,
    roughness: f32,
) -> PbrMetallicRoughness {
    let mut color = base_color.clamp01();
    if alpha_mode(material_type) == AlphaMode::Opaque {
        color.w = 1.0;
    }
    let base_color_factor = (color.length_squared() > 0.0).then(|| color.to_array());

    // A texture carries the real values; the factors become pass-through
    let (metallic_factor, roughness_factor) = if metallic_roughness_texture.is_some() {
        (1.0, 1.0)
    } else {
        (metallic.clamp(0.0, 1.0), roughness.clamp(0.0, 1.0))
    };

    PbrMetallicRoughness {
        base_color_texture,
        base_color_factor,
        metallic_roughness_texture,
        metallic_factor: Some(metallic_factor),
        roughness_factor: Some(roughness_factor),
    }
}

fn extras(raw: &RawMaterial) -> Value {
    let mut from_fbx = json!({
        "shadingModel": raw.shading_model.describe(),
        "isTruePBR": raw.is_pbr(),
    });
    let user_properties = merge_user_properties(&raw.name, &raw.user_properties);
    if !user_properties.is_empty() {
        from_fbx["userProperties"] = Value::Object(user_properties);
    }
    json!({ "fromFBX": from_fbx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_modes() {
        assert_eq!(alpha_mode(RawMaterialType::SkinnedOpaque), AlphaMode::Opaque);
        assert_eq!(alpha_mode(RawMaterialType::Transparent), AlphaMode::Blend);
        assert_eq!(alpha_mode(RawMaterialType::SkinnedTransparentMask), AlphaMode::Mask);
    }

    #[test]
    fn test_roughness_from_shininess() {
        assert_eq!(roughness_from_shininess(0.0), 1.0);
        assert!((roughness_from_shininess(2.0) - 0.70710677).abs() < 1e-6);
        assert!(roughness_from_shininess(1000.0) < 0.05);
    }

    #[test]
    fn test_pbr_factors_with_texture() {
        let texture = TextureRef {
            index: 0,
            tex_coord: 0,
            extensions: None,
        };
        let pbr = pbr_block(RawMaterialType::Opaque, None, Vec4::ONE, Some(texture), 0.2, 0.3);
        assert_eq!(pbr.metallic_factor, Some(1.0));
        assert_eq!(pbr.roughness_factor, Some(1.0));

        let pbr = pbr_block(RawMaterialType::Opaque, None, Vec4::ONE, None, 1.5, -0.5);
        assert_eq!(pbr.metallic_factor, Some(1.0));
        assert_eq!(pbr.roughness_factor, Some(0.0));
    }

    #[test]
    fn test_base_color_alpha_follows_blending() {
        let color = Vec4::new(0.5, 0.5, 0.5, 0.25);
        let opaque = pbr_block(RawMaterialType::Opaque, None, color, None, 0.0, 1.0);
        assert_eq!(opaque.base_color_factor, Some([0.5, 0.5, 0.5, 1.0]));
        let blend = pbr_block(RawMaterialType::Transparent, None, color, None, 0.0, 1.0);
        assert_eq!(blend.base_color_factor, Some([0.5, 0.5, 0.5, 0.25]));
    }

    #[test]
    fn test_extras() {
        let mut raw = RawMaterial::new("m", RawShadingModel::PbrMetRough);
        raw.user_properties = vec![r#"{"tint": "red"}"#.to_string()];
        assert_eq!(
            extras(&raw),
            json!({ "fromFBX": {
                "shadingModel": "Metallic/Roughness",
                "isTruePBR": true,
                "userProperties": { "tint": "red" }
            } })
        );

        let raw = RawMaterial::new("m", RawShadingModel::Lambert);
        assert_eq!(
            extras(&raw),
            json!({ "fromFBX": { "shadingModel": "Lambert", "isTruePBR": false } })
        );
    }
}
