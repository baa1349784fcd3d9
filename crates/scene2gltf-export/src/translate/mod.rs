//! Raw scene to glTF record translation
//!
//! Field-by-field mapping of raw materials and nodes. Textures are requested
//! from the [`TextureBuilder`](crate::textures::TextureBuilder); a texture it
//! can't produce is simply left out of the material.

mod material;
mod node;

pub use material::{
    AO_MET_ROUGH_TAG, ROUGH_FROM_SHININESS_TAG, SIMPLE_TAG, alpha_mode, roughness_from_shininess,
    translate_material,
};
pub use node::{SNAP_EPSILON, translate_node};

use serde_json::{Map, Value};
use tracing::warn;

/// Merge user property objects (one JSON object per string) into one map.
/// Later keys win; strings that aren't JSON objects are skipped.
pub(crate) fn merge_user_properties(owner: &str, properties: &[String]) -> Map<String, Value> {
    let mut merged = Map::new();
    for property in properties {
        match serde_json::from_str::<Map<String, Value>>(property) {
            Ok(object) => merged.extend(object),
            Err(e) => warn!(owner, error = %e, "Ignoring malformed user property"),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_user_properties() {
        let merged = merge_user_properties(
            "n",
            &[
                r#"{"a": 1, "b": "x"}"#.to_string(),
                "not json".to_string(),
                r#"{"b": true}"#.to_string(),
            ],
        );
        assert_eq!(Value::Object(merged), json!({ "a": 1, "b": true }));
    }
}
