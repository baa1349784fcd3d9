//! scene2gltf-raw
//!
//! The raw, source-side scene graph handed to the exporter by an asset
//! reader: textures, materials and nodes, addressed by index.
//!
//! | Type          | Role |
//! |---------------|------|
//! | `RawTexture`  | Image file reference with usage, opacity and UV transform |
//! | `RawMaterial` | Shading model, factors and per-usage texture slots |
//! | `RawNode`     | Named TRS transform with child links |
//! | `RawModel`    | Owner of all of the above |
//!
//! # Example
//!
//! ```rust,ignore
//! use scene2gltf_raw::RawModel;
//!
//! let raw = RawModel::from_json_file("scene.json")?;
//! println!("{} textures, {} materials", raw.texture_count(), raw.material_count());
//! ```

pub mod material;
pub mod model;
pub mod node;
pub mod texture;

pub use material::{RawMaterial, RawMaterialInfo, RawMaterialType, RawShadingModel};
pub use model::RawModel;
pub use node::RawNode;
pub use texture::{Opacity, RawTexture, TextureUsage};
