//! Texture patches handed to the atlas packer.

use crate::error::{AtlasError, Result};
use crate::types::PatchStats;
use glam::Vec2;
use image::{GrayImage, Luma, RgbImage};

/// Mask value for pixels that hold real content.
pub const VALID: u8 = 255;

/// A rectangular piece of texture covering a set of mesh faces.
///
/// Texture coordinates are local to the patch and measured in pixels, with
/// integer values at pixel centres: `(0, 0)` is the centre of the top-left
/// pixel.
#[derive(Debug, Clone)]
pub struct TexturePatch {
    image: RgbImage,
    validity_mask: GrayImage,
    faces: Vec<usize>,
    texcoords: Vec<[Vec2; 3]>,
}

impl TexturePatch {
    /// Create a patch, checking that image, mask and coordinates agree.
    pub fn new(
        image: RgbImage,
        validity_mask: GrayImage,
        faces: Vec<usize>,
        texcoords: Vec<[Vec2; 3]>,
    ) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AtlasError::InvalidPatch(format!(
                "empty image ({}x{})",
                width, height
            )));
        }
        if validity_mask.dimensions() != (width, height) {
            return Err(AtlasError::InvalidPatch(format!(
                "validity mask is {}x{} but image is {}x{}",
                validity_mask.width(),
                validity_mask.height(),
                width,
                height
            )));
        }
        if faces.len() != texcoords.len() {
            return Err(AtlasError::InvalidPatch(format!(
                "{} faces but {} texcoord triangles",
                faces.len(),
                texcoords.len()
            )));
        }

        if let Some((x, y, value)) = validity_mask
            .enumerate_pixels()
            .find(|(_, _, p)| p[0] != 0 && p[0] != VALID)
            .map(|(x, y, p)| (x, y, p[0]))
        {
            return Err(AtlasError::InvalidPatch(format!(
                "validity mask value {} at ({}, {}) is neither 0 nor {}",
                value, x, y, VALID
            )));
        }

        let max_u = width as f32 - 0.5;
        let max_v = height as f32 - 0.5;
        for (face, triangle) in faces.iter().zip(&texcoords) {
            for uv in triangle {
                let inside = uv.is_finite()
                    && (-0.5..=max_u).contains(&uv.x)
                    && (-0.5..=max_v).contains(&uv.y);
                if !inside {
                    return Err(AtlasError::InvalidPatch(format!(
                        "texcoord ({}, {}) of face {} lies outside the {}x{} patch",
                        uv.x, uv.y, face, width, height
                    )));
                }
            }
        }

        Ok(Self {
            image,
            validity_mask,
            faces,
            texcoords,
        })
    }

    /// Create a patch whose pixels are all valid.
    pub fn opaque(image: RgbImage, faces: Vec<usize>, texcoords: Vec<[Vec2; 3]>) -> Result<Self> {
        let mask = GrayImage::from_pixel(image.width(), image.height(), Luma([VALID]));
        Self::new(image, mask, faces, texcoords)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of pixels covered by the patch.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Patch pixels.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Per-pixel validity, `VALID` or 0.
    pub fn validity_mask(&self) -> &GrayImage {
        &self.validity_mask
    }

    /// Mesh faces covered by this patch.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// Local texture coordinate triangle of each face, parallel to `faces()`.
    pub fn texcoords(&self) -> &[[Vec2; 3]] {
        &self.texcoords
    }

    /// Check if the pixel at (x, y) holds real content.
    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        self.validity_mask.get_pixel(x, y)[0] == VALID
    }

    /// Mean and maximum luma over the valid pixels.
    pub fn brightness_stats(&self) -> PatchStats {
        let mut sum = 0.0f64;
        let mut max = 0.0f32;
        let mut count = 0usize;

        for (pixel, mask) in self.image.pixels().zip(self.validity_mask.pixels()) {
            if mask[0] != VALID {
                continue;
            }
            let [r, g, b] = pixel.0;
            let luma = (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0;
            sum += luma as f64;
            max = max.max(luma);
            count += 1;
        }

        if count == 0 {
            return PatchStats::default();
        }
        PatchStats::new((sum / count as f64) as f32, max)
    }
}
