//! # Patch Atlas
//!
//! A Rust library for packing projected mesh texture patches into texture
//! atlases.
//!
//! ## Overview
//!
//! Each [`TexturePatch`] is a small image cut from a photograph together with
//! the mesh faces it covers and their texture coordinates inside the patch.
//! The packer places patches into fixed-size square atlases, surrounds them
//! with padding so texture filtering does not bleed background colour into
//! the mesh, and rewrites every face's texture coordinates into atlas space.
//!
//! ## Quick Start
//!
//! ```ignore
//! use patch_atlas::{assemble_layout, pack_patches, PackerConfig};
//!
//! let atlases = pack_patches(&patches, &PackerConfig::default())?;
//! let layout = assemble_layout(&atlases, mesh_face_count)?;
//!
//! for (material, atlas) in atlases.iter().enumerate() {
//!     let png = atlas.to_png()?;
//!     // hand `png` and `layout` to the mesh writer
//! }
//! ```
//!
//! ## Single Atlas
//!
//! ```
//! use patch_atlas::{AtlasBuilder, TexturePatch};
//! use glam::Vec2;
//! use image::{Rgb, RgbImage};
//!
//! let patch = TexturePatch::opaque(
//!     RgbImage::from_pixel(1, 1, Rgb([200, 10, 10])),
//!     vec![0],
//!     vec![[Vec2::ZERO; 3]],
//! )?;
//!
//! let mut builder = AtlasBuilder::with_padding(256, 2);
//! assert!(builder.insert(&patch, patch.brightness_stats()));
//!
//! let atlas = builder.finalize();
//! assert_eq!(atlas.image().get_pixel(2, 2), &Rgb([200, 10, 10]));
//! # Ok::<(), patch_atlas::AtlasError>(())
//! ```

pub mod error;
pub mod types;
pub mod patch;
pub mod atlas;
pub mod packer;
pub mod export;

// Re-export main types for convenience
pub use error::{AtlasError, Result};
pub use types::{PatchStats, Rect};
pub use patch::TexturePatch;
pub use atlas::{AtlasBuilder, RectangularBin, TextureAtlas};
pub use packer::{pack_patches, AtlasPacker, PackerConfig, PaddingMode};
pub use export::{assemble_layout, AtlasLayout, FaceTexture};
