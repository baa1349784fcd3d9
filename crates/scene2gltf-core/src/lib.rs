//! scene2gltf Core Library
//!
//! This crate provides common types, utilities, and error handling
//! shared across all scene2gltf components.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

