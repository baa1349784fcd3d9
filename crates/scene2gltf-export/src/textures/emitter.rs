//! Image resource emission
//!
//! Stores image bytes in the document's binary blob or next to the document
//! and registers an image record for them.

use std::path::{Component, Path, PathBuf};

use scene2gltf_raw::RawTexture;
use tracing::{debug, warn};

use crate::gltf::{GltfDocument, Image};
use crate::textures::{EncodedImage, TextureError, TextureResult, mime_type_for_suffix};

/// Where emitted images end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitMode {
    /// Inside the document's binary blob
    Embedded,
    /// As loose files under `output_folder`, referenced by relative URI
    Files { output_folder: PathBuf },
}

/// What an emit call actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Embedded { bytes: usize },
    Written { path: PathBuf, bytes: usize },
    Copied { path: PathBuf },
    /// File was already in place (or couldn't be copied); only referenced
    Referenced { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ResourceEmitter {
    mode: EmitMode,
}

impl ResourceEmitter {
    pub fn new(mode: EmitMode) -> Self {
        Self { mode }
    }

    pub fn embedded() -> Self {
        Self::new(EmitMode::Embedded)
    }

    pub fn files(output_folder: impl Into<PathBuf>) -> Self {
        Self::new(EmitMode::Files {
            output_folder: output_folder.into(),
        })
    }

    pub fn mode(&self) -> &EmitMode {
        &self.mode
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.mode, EmitMode::Embedded)
    }

    /// Emit freshly encoded bytes under `name`. In file mode they are
    /// written to `<output_folder>/<name>.<ext>`; a failed write fails the
    /// whole emission.
    pub fn emit_encoded(
        &self,
        doc: &mut GltfDocument,
        name: &str,
        image: &EncodedImage,
    ) -> TextureResult<(usize, Emission)> {
        match &self.mode {
            EmitMode::Embedded => {
                let view = doc.add_raw_buffer_view(&image.bytes);
                let index = doc.add_image(Image::embedded(name, view, image.mime_type()));
                Ok((index, Emission::Embedded { bytes: image.len() }))
            }
            EmitMode::Files { output_folder } => {
                let file_name = format!("{name}.{}", image.format.extension());
                let path = output_folder.join(&file_name);
                std::fs::write(&path, &image.bytes).map_err(|source| TextureError::Write {
                    path: path.clone(),
                    source,
                })?;
                let index = doc.add_image(Image::file(name, file_name));
                Ok((
                    index,
                    Emission::Written {
                        path,
                        bytes: image.len(),
                    },
                ))
            }
        }
    }

    /// Emit an existing image file as-is
    pub fn emit_source_file(
        &self,
        doc: &mut GltfDocument,
        texture: &RawTexture,
    ) -> TextureResult<(usize, Emission)> {
        if !texture.has_location() {
            return Err(TextureError::NoUsableImage(format!(
                "texture '{}' has no file",
                texture.name
            )));
        }

        match &self.mode {
            EmitMode::Embedded => {
                let mime_type = match texture.suffix() {
                    Some(suffix) => mime_type_for_suffix(&suffix),
                    None => {
                        warn!(texture = %texture.name, "Can't deduce mime type of texture without suffix; assuming jpeg");
                        "image/jpeg"
                    }
                };
                let view = doc
                    .add_buffer_view_for_file(&texture.file_location)
                    .ok_or_else(|| {
                        TextureError::NoUsableImage(format!(
                            "couldn't read '{}'",
                            texture.file_location.display()
                        ))
                    })?;
                let bytes = doc.buffer_views[view].byte_length;
                let index = doc.add_image(Image::embedded(location_file_name(texture), view, mime_type));
                Ok((index, Emission::Embedded { bytes }))
            }
            EmitMode::Files { output_folder } => {
                let relative = relative_name(output_folder, texture);
                let dst = output_folder.join(&relative);
                let emission = copy_unless_present(&texture.file_location, &dst);
                let index = doc.add_image(Image::file(relative.clone(), relative));
                Ok((index, emission))
            }
        }
    }
}

/// URI for a texture file: its path under the output folder if it already
/// lives there, otherwise its bare file name.
fn relative_name(output_folder: &Path, texture: &RawTexture) -> String {
    let absolute = |p: &Path| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    let location = absolute(&texture.file_location);
    if let Ok(inside) = location.strip_prefix(absolute(output_folder)) {
        let parts: Option<Vec<_>> = inside
            .components()
            .map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        if let Some(parts) = parts {
            return parts.join("/");
        }
    }
    if texture.file_name.is_empty() {
        location_file_name(texture)
    } else {
        texture.file_name.clone()
    }
}

/// File name of the resolved location, extension included
fn location_file_name(texture: &RawTexture) -> String {
    texture
        .file_location
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copy `src` to `dst` when `dst` doesn't exist yet and is a different file.
/// A failed copy is only warned about; the reference is kept either way.
fn copy_unless_present(src: &Path, dst: &Path) -> Emission {
    let same_file = match (std::path::absolute(src), std::path::absolute(dst)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same_file || dst.exists() {
        return Emission::Referenced {
            path: dst.to_path_buf(),
        };
    }

    if let Some(parent) = dst.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "Failed to create texture folder");
        }
    }
    match std::fs::copy(src, dst) {
        Ok(_) => {
            debug!(src = %src.display(), dst = %dst.display(), "Copied texture");
            Emission::Copied {
                path: dst.to_path_buf(),
            }
        }
        Err(e) => {
            warn!(src = %src.display(), dst = %dst.display(), error = %e, "Failed to copy texture");
            Emission::Referenced {
                path: dst.to_path_buf(),
            }
        }
    }
}
