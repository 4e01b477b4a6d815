//! Texture atlas building.
//!
//! Patches are packed into a fixed-size square with [`AtlasBuilder`], which
//! copies their pixels and rewrites their texture coordinates into atlas
//! space. [`AtlasBuilder::finalize`] bakes edge padding, merges duplicate
//! coordinates and yields the read-only [`TextureAtlas`].

mod bin;
mod builder;
mod copy;
mod padding;
mod texcoords;

pub use bin::RectangularBin;
pub use builder::{default_padding, AtlasBuilder, TextureAtlas};
pub use copy::{copy_into, extend_edges};
