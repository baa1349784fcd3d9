//! scene2gltf CLI
//!
//! Command-line interface for exporting raw scenes to glTF and inspecting
//! texture images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use scene2gltf_core::logging::{self, TracingConfig};
use scene2gltf_export::textures::inspect;
use scene2gltf_export::{GltfExportOptions, GltfExporter};
use scene2gltf_raw::RawModel;

/// scene2gltf - raw scene to glTF 2.0 converter
#[derive(Parser)]
#[command(name = "scene2gltf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a raw scene (JSON) to .gltf or .glb
    Export(ExportArgs),

    /// Show dimensions and opacity of image files
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Raw scene JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Output path; the extension is replaced by .gltf or .glb
    #[arg(short, long)]
    output: PathBuf,

    /// Write a single .glb instead of .gltf + .bin
    #[arg(short, long)]
    binary: bool,

    /// Keep textures as loose files next to a .glb
    #[arg(long)]
    separate_textures: bool,

    /// Write minified JSON
    #[arg(long)]
    compact: bool,

    /// Program used to convert legacy texture formats
    #[arg(long, value_name = "PROGRAM")]
    magick: Option<String>,

    /// Export options JSON; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the export summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Image files
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Inspect(args) => cmd_inspect(args),
    }
}

fn export_options(args: &ExportArgs) -> Result<GltfExportOptions> {
    let mut options = match &args.config {
        Some(path) => GltfExportOptions::from_json_file(path)
            .with_context(|| format!("Failed to load export options from {:?}", path))?,
        None => GltfExportOptions::default(),
    };

    if args.binary {
        options.use_glb = true;
    }
    if args.separate_textures {
        options.separate_textures = true;
    }
    if args.compact {
        options.pretty_json = false;
    }
    if let Some(program) = &args.magick {
        options.textures.tool_program = program.clone();
    }
    Ok(options)
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    let options = export_options(&args)?;
    debug!(?options, "Export options");

    let raw = RawModel::from_json_file(&args.input)
        .with_context(|| format!("Failed to load raw scene {:?}", args.input))?;

    let summary = GltfExporter::new(options)
        .export(&raw, &args.output)
        .with_context(|| format!("Failed to export to {:?}", args.output))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Exported {:?}", summary.document);
    if let Some(buffer) = &summary.buffer {
        println!("  Buffer:      {:?} ({} bytes)", buffer, summary.binary_len);
    }
    println!("  Materials:   {}", summary.materials);
    println!("  Nodes:       {}", summary.nodes);
    println!("  Textures:    {}", summary.textures);
    println!("  Images:      {}", summary.images);
    println!("  Cache hits:  {}", summary.stats.cache_hits);
    println!("  Conversions: {}", summary.stats.conversions);
    if summary.stats.failures > 0 {
        println!("  Failed:      {} (see warnings)", summary.stats.failures);
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let results: Vec<_> = args
        .images
        .iter()
        .map(|path| (path, inspect(path)))
        .collect();

    if args.json {
        let json: Vec<_> = results
            .iter()
            .map(|(path, props)| {
                serde_json::json!({
                    "path": path,
                    "width": props.width,
                    "height": props.height,
                    "opacity": props.opacity,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("{:<8} {:<8} {:<12} {}", "Width", "Height", "Opacity", "Path");
    println!("{:-<8} {:-<8} {:-<12} {:-<40}", "", "", "", "");
    for (path, props) in &results {
        println!(
            "{:<8} {:<8} {:<12} {}",
            props.width,
            props.height,
            props.opacity.name(),
            path.display()
        );
    }
    Ok(())
}
