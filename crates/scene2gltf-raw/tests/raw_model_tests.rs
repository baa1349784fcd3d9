//! Tests for the raw scene model
//!
//! These cover:
//! - Texture deduplication on insert
//! - Index validation
//! - Loading raw scenes from JSON on disk

use std::io::Write;

use scene2gltf_core::Error;
use scene2gltf_raw::{
    Opacity, RawMaterial, RawModel, RawNode, RawShadingModel, RawTexture, TextureUsage,
};

fn sample_model() -> RawModel {
    let mut raw = RawModel::new();
    let albedo = raw.add_texture(RawTexture::new("albedo", "tex/albedo.png", TextureUsage::Albedo));
    let normal = raw.add_texture(RawTexture::new("normal", "tex/normal.tga", TextureUsage::Normal));
    raw.add_material(
        RawMaterial::new("hull", RawShadingModel::PbrMetRough)
            .with_texture(TextureUsage::Albedo, albedo)
            .with_texture(TextureUsage::Normal, normal),
    );
    let child = raw.add_node(RawNode::new("child"));
    let root = raw.add_node(RawNode::new("root").with_child(child));
    raw.root_node = Some(root);
    raw
}

mod texture_tests {
    use super::*;

    #[test]
    fn test_add_texture_deduplicates() {
        let mut raw = RawModel::new();
        let a = raw.add_texture(RawTexture::new("wood", "wood.png", TextureUsage::Diffuse));
        let b = raw.add_texture(RawTexture::new("wood", "wood.png", TextureUsage::Diffuse));
        assert_eq!(a, b);
        assert_eq!(raw.texture_count(), 1);
    }

    #[test]
    fn test_add_texture_distinguishes_usage() {
        let mut raw = RawModel::new();
        let a = raw.add_texture(RawTexture::new("wood", "wood.png", TextureUsage::Diffuse));
        let b = raw.add_texture(RawTexture::new("wood", "wood.png", TextureUsage::Roughness));
        assert_ne!(a, b);
        assert_eq!(raw.texture_count(), 2);
    }

    #[test]
    fn test_get_texture_out_of_range() {
        let raw = sample_model();
        assert!(raw.get_texture(0).is_some());
        assert!(raw.get_texture(99).is_none());
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_valid_model() {
        assert!(sample_model().validate().is_ok());
    }

    #[test]
    fn test_dangling_texture_reference() {
        let mut raw = sample_model();
        raw.materials[0].textures.insert(TextureUsage::Emissive, 42);
        let err = raw.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_dangling_child() {
        let mut raw = sample_model();
        raw.nodes[0].children.push(7);
        assert!(raw.validate().is_err());
    }

    #[test]
    fn test_dangling_root() {
        let mut raw = sample_model();
        raw.root_node = Some(5);
        assert!(raw.validate().is_err());
    }
}

mod json_tests {
    use super::*;

    #[test]
    fn test_json_file_round_trip() {
        let raw = sample_model();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string_pretty(&raw).unwrap().as_bytes())
            .unwrap();

        let loaded = RawModel::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, raw);
    }

    #[test]
    fn test_minimal_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "textures": [ {{ "name": "mask", "file_location": "mask.png", "occlusion": "mask" }} ] }}"#
        )
        .unwrap();

        let loaded = RawModel::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.texture_count(), 1);
        assert_eq!(loaded.textures[0].occlusion, Opacity::Mask);
        assert!(loaded.materials.is_empty());
        assert_eq!(loaded.root_node, None);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RawModel::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = RawModel::from_json_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("parsing raw scene"));
    }
}
