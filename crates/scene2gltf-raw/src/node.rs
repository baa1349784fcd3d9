//! Raw scene nodes

use scene2gltf_core::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Scene node in hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Node name
    pub name: String,
    /// Whether this node is a skeleton joint
    #[serde(default)]
    pub is_joint: bool,
    /// Local translation
    #[serde(default)]
    pub translation: Vec3,
    /// Local rotation (quaternion, x/y/z/w)
    #[serde(default = "identity_rotation")]
    pub rotation: Vec4,
    /// Local scale
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    /// Child node indices
    #[serde(default)]
    pub children: Vec<usize>,
    /// Free-form user properties, each a JSON object string
    #[serde(default)]
    pub user_properties: Vec<String>,
}

fn identity_rotation() -> Vec4 {
    Vec4::IDENTITY
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl RawNode {
    /// Create a node with identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_joint: false,
            translation: Vec3::ZERO,
            rotation: Vec4::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            user_properties: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: usize) -> Self {
        self.children.push(child);
        self
    }
}
