//! Patch Atlas CLI
//!
//! Pack texture patches described by a JSON manifest into atlas images.

use clap::{Parser, Subcommand};
use glam::Vec2;
use image::{GrayImage, Luma};
use patch_atlas::patch::VALID;
use patch_atlas::{assemble_layout, AtlasPacker, PackerConfig, TexturePatch};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "patch-atlas")]
#[command(author, version, about = "Pack mesh texture patches into texture atlases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack all patches of a manifest into atlas PNGs and a layout file
    Pack {
        /// Patch manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Largest atlas side length
        #[arg(long, default_value = "8192")]
        max_size: u32,

        /// Atlas side length used when patches fit comfortably
        #[arg(long, default_value = "4096")]
        preferred_size: u32,

        /// Smallest atlas side length
        #[arg(long, default_value = "256")]
        min_size: u32,

        /// Fixed padding in pixels (default: atlas size / 128)
        #[arg(long)]
        padding: Option<u32>,
    },

    /// Show information about a patch manifest
    Info {
        /// Patch manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

// JSON input format
#[derive(Deserialize)]
struct PatchManifest {
    face_count: usize,
    patches: Vec<PatchEntry>,
}

#[derive(Deserialize)]
struct PatchEntry {
    image: PathBuf,
    #[serde(default)]
    mask: Option<PathBuf>,
    faces: Vec<usize>,
    texcoords: Vec<[Vec2; 3]>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            manifest,
            output,
            max_size,
            preferred_size,
            min_size,
            padding,
        } => {
            let mut config = PackerConfig::default().with_sizes(min_size, preferred_size, max_size);
            if let Some(padding) = padding {
                config = config.with_padding(padding);
            }
            pack_manifest(&manifest, &output, config)?;
        }
        Commands::Info { manifest } => {
            show_manifest_info(&manifest)?;
        }
    }

    Ok(())
}

fn pack_manifest(
    manifest_path: &Path,
    output_dir: &Path,
    config: PackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Loading patches from {:?}...", manifest_path);
    let (face_count, patches) = load_manifest(manifest_path)?;
    log::info!("  Loaded {} patches covering {} faces", patches.len(), face_count);

    let packer = AtlasPacker::with_config(config);
    let atlases = packer.pack(&patches)?;
    let layout = assemble_layout(&atlases, face_count)?;

    fs::create_dir_all(output_dir)?;
    for (i, atlas) in atlases.iter().enumerate() {
        let png_path = output_dir.join(format!("atlas_{}.png", i));
        fs::write(&png_path, atlas.to_png()?)?;
        println!(
            "Atlas {}: {}x{}, {} faces, {:.1}% covered -> {:?}",
            i,
            atlas.size(),
            atlas.size(),
            atlas.faces().len(),
            atlas.coverage() * 100.0,
            png_path
        );
    }

    let layout_path = output_dir.join("layout.json");
    fs::write(&layout_path, layout.to_json()?)?;
    println!(
        "Exported layout ({} of {} faces textured) to {:?}",
        layout.textured_face_count(),
        face_count,
        layout_path
    );

    Ok(())
}

fn show_manifest_info(manifest_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (face_count, patches) = load_manifest(manifest_path)?;
    let pixels: u64 = patches.iter().map(TexturePatch::area).sum();
    let textured: usize = patches.iter().map(|p| p.faces().len()).sum();
    let largest = patches.iter().map(|p| p.width().max(p.height())).max().unwrap_or(0);

    println!("\nManifest Info:");
    println!("  Faces: {} ({} textured)", face_count, textured);
    println!("  Patches: {}", patches.len());
    println!("  Patch pixels: {}", pixels);
    println!("  Largest patch side: {}", largest);

    Ok(())
}

/// Read a manifest and the images it references. Paths are relative to the
/// manifest's directory.
fn load_manifest(path: &Path) -> patch_atlas::Result<(usize, Vec<TexturePatch>)> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let manifest: PatchManifest = serde_json::from_str(&fs::read_to_string(path)?)?;

    let mut patches = Vec::with_capacity(manifest.patches.len());
    for entry in manifest.patches {
        let image = image::open(base.join(&entry.image))?.to_rgb8();
        let patch = match &entry.mask {
            Some(mask_path) => {
                let mask = binarize_mask(&image::open(base.join(mask_path))?.to_luma8());
                TexturePatch::new(image, mask, entry.faces, entry.texcoords)?
            }
            None => TexturePatch::opaque(image, entry.faces, entry.texcoords)?,
        };
        patches.push(patch);
    }

    Ok((manifest.face_count, patches))
}

/// Anything brighter than mid-gray counts as valid.
fn binarize_mask(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] >= 128 {
            Luma([VALID])
        } else {
            Luma([0])
        }
    })
}
