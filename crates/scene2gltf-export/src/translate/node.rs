//! Node translation

use scene2gltf_raw::RawNode;
use serde_json::{Value, json};

use crate::gltf::Node;
use crate::translate::merge_user_properties;

/// Components smaller than this are written as exact zeros
pub const SNAP_EPSILON: f32 = 1e-10;

fn snap(v: f32) -> f32 {
    if v.abs() < SNAP_EPSILON { 0.0 } else { v }
}

/// Vectors containing NaN are dropped rather than written
fn finite<const N: usize>(v: [f32; N]) -> Option<[f32; N]> {
    (!v.iter().any(|c| c.is_nan())).then_some(v)
}

/// Translate one raw node; child indices carry over unchanged since nodes
/// are emitted in raw order.
pub fn translate_node(raw: &RawNode) -> Node {
    let t = raw.translation;
    let translation = [snap(t.x), snap(t.y), snap(t.z)];
    let translation = if translation == [0.0; 3] {
        None
    } else {
        finite(translation)
    };

    let r = raw.rotation;
    let rotation = [snap(r.x), snap(r.y), snap(r.z), r.w];
    let rotation = if rotation == [0.0, 0.0, 0.0, 1.0] {
        None
    } else {
        finite(rotation)
    };

    let scale = raw.scale.to_array();
    let scale = if scale == [1.0; 3] { None } else { finite(scale) };

    let user_properties = merge_user_properties(&raw.name, &raw.user_properties);
    let extras = (!user_properties.is_empty())
        .then(|| json!({ "fromFBX": { "userProperties": Value::Object(user_properties) } }));

    Node {
        name: Some(raw.name.clone()),
        translation,
        rotation,
        scale,
        children: raw.children.clone(),
        extras,
    }
}
