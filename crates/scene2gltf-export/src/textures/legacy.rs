//! Legacy format conversion
//!
//! glTF core can't carry formats like TGA, so those are rewritten through an
//! external image tool before anything else touches them. The tool sits
//! behind [`ConversionTool`] so the subprocess can be swapped out.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use scene2gltf_raw::{Opacity, RawTexture, TextureUsage};
use tracing::{debug, warn};

use crate::textures::{ImageFormat, TextureBuildOptions, TextureError, TextureResult};

/// Parameters handed to the conversion tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertParams {
    /// Flip the image vertically (legacy formats store rows bottom-up)
    pub flip_vertical: bool,
    /// Shrink so neither side exceeds this; never enlarges
    pub max_dimension: u32,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            flip_vertical: true,
            max_dimension: 1024,
        }
    }
}

/// External image conversion capability
pub trait ConversionTool {
    /// Program name, for diagnostics
    fn program(&self) -> &str;

    /// Probe whether the tool can run at all
    fn is_available(&self) -> bool;

    /// Convert `src` into `dst`; the destination format follows `dst`'s suffix
    fn convert(&self, src: &Path, dst: &Path, params: &ConvertParams) -> TextureResult<()>;
}

impl<T: ConversionTool + ?Sized> ConversionTool for Arc<T> {
    fn program(&self) -> &str {
        (**self).program()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn convert(&self, src: &Path, dst: &Path, params: &ConvertParams) -> TextureResult<()> {
        (**self).convert(src, dst, params)
    }
}

/// ImageMagick invoked as a subprocess
#[derive(Debug, Clone)]
pub struct ImageMagick {
    program: String,
}

impl ImageMagick {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_args(src: &Path, dst: &Path, params: &ConvertParams) -> Vec<String> {
        let mut args = vec![src.display().to_string()];
        if params.flip_vertical {
            args.push("-flip".to_string());
        }
        args.push("-resize".to_string());
        // ">" only shrinks larger images
        args.push(format!("{}>", params.max_dimension));
        args.push(dst.display().to_string());
        args
    }
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self::new("magick")
    }
}

impl ConversionTool for ImageMagick {
    fn program(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn convert(&self, src: &Path, dst: &Path, params: &ConvertParams) -> TextureResult<()> {
        let args = Self::command_args(src, dst, params);
        debug!(program = %self.program, ?args, "Running conversion");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TextureError::ToolUnavailable {
                    program: self.program.clone(),
                },
                _ => TextureError::Io(e),
            })?;

        if !output.status.success() {
            return Err(TextureError::ToolFailed {
                program: self.program.clone(),
                input: src.to_path_buf(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

/// Pick the converted file's format
///
/// Data textures and anything with alpha stay lossless; opaque colour
/// textures go to JPEG.
pub fn select_format(usage: TextureUsage, occlusion: Opacity, jpeg_quality: u8) -> ImageFormat {
    if usage.is_precision_sensitive() || !occlusion.is_opaque() {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg {
            quality: jpeg_quality,
        }
    }
}

/// What happened to a texture reference in [`LegacyFormatConverter::prepare`]
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Format is already supported
    NotNeeded,
    /// Tool ran and the reference now points at its output
    Converted { path: PathBuf },
    /// Output from an earlier run was found and reused
    Reused { path: PathBuf },
    /// Reference has been cleared
    Failed(TextureError),
}

/// Rewrites legacy-format texture references to converted files
pub struct LegacyFormatConverter {
    tool: Box<dyn ConversionTool>,
    output_folder: PathBuf,
    converted_dir: String,
    legacy_suffixes: Vec<String>,
    params: ConvertParams,
    jpeg_quality: u8,
    available: Option<bool>,
}

impl LegacyFormatConverter {
    pub fn new(
        tool: Box<dyn ConversionTool>,
        output_folder: impl Into<PathBuf>,
        options: &TextureBuildOptions,
    ) -> Self {
        Self {
            tool,
            output_folder: output_folder.into(),
            converted_dir: options.converted_dir.clone(),
            legacy_suffixes: options
                .legacy_suffixes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            params: ConvertParams {
                flip_vertical: options.flip_vertical,
                max_dimension: options.max_dimension,
            },
            jpeg_quality: options.jpeg_quality,
            available: None,
        }
    }

    pub fn is_legacy(&self, texture: &RawTexture) -> bool {
        texture
            .suffix()
            .is_some_and(|s| self.legacy_suffixes.iter().any(|l| *l == s))
    }

    /// Directory converted files are written to
    pub fn converted_folder(&self) -> PathBuf {
        self.output_folder.join(&self.converted_dir)
    }

    /// Probe once per run
    fn tool_available(&mut self) -> bool {
        if let Some(available) = self.available {
            return available;
        }
        let available = self.tool.is_available();
        if !available {
            warn!(program = %self.tool.program(), "Image conversion tool not found");
        }
        self.available = Some(available);
        available
    }

    /// Convert `texture` in place if its format is legacy
    ///
    /// Success redirects the reference to the converted file. Failure clears
    /// it, so later resolution ends in "no image" instead of a stale file.
    pub fn prepare(&mut self, texture: &mut RawTexture, embed: bool) -> ConversionOutcome {
        if !self.is_legacy(texture) {
            return ConversionOutcome::NotNeeded;
        }

        let format = select_format(texture.usage, texture.occlusion, self.jpeg_quality);
        let file_name = format!("{}.{}", texture.location_stem(), format.extension());
        let dst = self.converted_folder().join(&file_name);

        if !embed && dst.exists() {
            debug!(texture = %texture.name, path = %dst.display(), "Reusing converted texture");
            redirect(texture, &dst, file_name);
            return ConversionOutcome::Reused { path: dst };
        }

        if !self.tool_available() {
            texture.clear_location();
            return ConversionOutcome::Failed(TextureError::ToolUnavailable {
                program: self.tool.program().to_string(),
            });
        }

        if let Err(e) = std::fs::create_dir_all(self.converted_folder()) {
            texture.clear_location();
            return ConversionOutcome::Failed(TextureError::Write {
                path: self.converted_folder(),
                source: e,
            });
        }

        match self.tool.convert(&texture.file_location, &dst, &self.params) {
            Ok(()) => {
                debug!(texture = %texture.name, format = %format, "Converted legacy texture");
                redirect(texture, &dst, file_name);
                ConversionOutcome::Converted { path: dst }
            }
            Err(e) => {
                texture.clear_location();
                ConversionOutcome::Failed(e)
            }
        }
    }
}

fn redirect(texture: &mut RawTexture, path: &Path, file_name: String) {
    texture.file_location = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    texture.name = texture.location_stem();
    texture.file_name = file_name;
}
