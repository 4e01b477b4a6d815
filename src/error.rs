//! Error types for atlas packing.

use thiserror::Error;

/// Result type alias using AtlasError.
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for patch packing operations.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// Failed to read, decode or encode an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to parse or write JSON data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A texture patch is internally inconsistent.
    #[error("Invalid texture patch: {0}")]
    InvalidPatch(String),

    /// A patch does not fit into an empty atlas of the largest allowed size.
    #[error("Patch of {width}x{height} pixels does not fit into a {max_size}x{max_size} atlas")]
    PatchTooLarge {
        width: u32,
        height: u32,
        max_size: u32,
    },

    /// Finalized atlases disagree about which faces they own.
    #[error("Invalid atlas layout: {0}")]
    InvalidLayout(String),

    /// Failed to export atlas data.
    #[error("Export error: {0}")]
    Export(String),
}
