//! Output of packed atlases for the mesh-output stage.

pub mod layout;

pub use layout::{assemble_layout, AtlasLayout, FaceTexture, MaterialInfo};
