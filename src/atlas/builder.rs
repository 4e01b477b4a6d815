//! Texture atlas construction: patch insertion and finalization.

use super::bin::RectangularBin;
use super::copy::{copy_into, extend_edges};
use super::padding::apply_edge_padding;
use super::texcoords::merge_texcoords;
use crate::error::{AtlasError, Result};
use crate::patch::{TexturePatch, VALID};
use crate::types::{PatchStats, Rect};
use glam::Vec2;
use image::{GrayImage, ImageEncoder, RgbImage};
use std::sync::Arc;

/// Largest `f32` below 1.0; a corner on the far edge of the last pixel
/// column or row would otherwise map to exactly 1.0 without padding.
const MAX_TEXCOORD: f32 = 1.0 - f32::EPSILON / 2.0;

/// Padding used for an atlas of the given size when none is specified.
pub fn default_padding(size: u32) -> u32 {
    size >> 7
}

/// A texture atlas that still accepts patches.
///
/// The image only becomes readable once the builder is consumed by
/// [`AtlasBuilder::finalize`]:
///
/// ```compile_fail
/// use patch_atlas::atlas::AtlasBuilder;
///
/// let builder = AtlasBuilder::new(256);
/// let image = builder.image();
/// ```
#[derive(Debug, Clone)]
pub struct AtlasBuilder {
    size: u32,
    padding: u32,
    bin: RectangularBin,
    image: RgbImage,
    validity_mask: GrayImage,
    faces: Vec<usize>,
    texcoord_ids: Vec<[usize; 3]>,
    texcoords: Vec<Vec2>,
    patch_stats: Vec<PatchStats>,
}

impl AtlasBuilder {
    /// Create an empty `size x size` atlas with padding `size >> 7`.
    pub fn new(size: u32) -> Self {
        Self::with_padding(size, default_padding(size))
    }

    /// Create an empty `size x size` atlas with a fixed padding.
    pub fn with_padding(size: u32, padding: u32) -> Self {
        Self {
            size,
            padding,
            bin: RectangularBin::new(size),
            image: RgbImage::new(size, size),
            validity_mask: GrayImage::new(size, size),
            faces: Vec::new(),
            texcoord_ids: Vec::new(),
            texcoords: Vec::new(),
            patch_stats: Vec::new(),
        }
    }

    /// Side length of the atlas in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Margin kept around every patch, in pixels.
    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Mesh faces inserted so far.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// Texcoord indices of each face's corners, parallel to `faces()`.
    pub fn texcoord_ids(&self) -> &[[usize; 3]] {
        &self.texcoord_ids
    }

    /// Atlas-space texture coordinates, not yet deduplicated.
    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    /// Padded rectangles of the inserted patches, in insertion order.
    pub fn placements(&self) -> &[Rect] {
        self.bin.placements()
    }

    /// Check if no patch has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.bin.placements().is_empty()
    }

    /// Try to place `patch` into the atlas.
    ///
    /// Returns `false` and leaves the atlas untouched when the padded patch
    /// does not fit into the remaining space.
    pub fn insert(&mut self, patch: &TexturePatch, stats: PatchStats) -> bool {
        let padding = self.padding;
        let width = patch.width().saturating_add(padding.saturating_mul(2));
        let height = patch.height().saturating_add(padding.saturating_mul(2));

        let rect = match self.bin.insert(width, height) {
            Some(rect) => rect,
            None => return false,
        };

        // Pixels and mask both repeat their edges across the padding band, so
        // edge padding only touches gutters next to invalid patch content.
        copy_into(&extend_edges(patch.image(), padding), rect.x, rect.y, &mut self.image, 0);
        copy_into(
            &extend_edges(patch.validity_mask(), padding),
            rect.x,
            rect.y,
            &mut self.validity_mask,
            0,
        );

        let offset = Vec2::new(
            (rect.x + padding) as f32 + 0.5,
            (rect.y + padding) as f32 + 0.5,
        );
        let scale = self.size as f32;

        for (&face, triangle) in patch.faces().iter().zip(patch.texcoords()) {
            let first = self.texcoords.len();
            self.texcoords
                .extend(triangle.iter().map(|&uv| ((uv + offset) / scale).min(Vec2::splat(MAX_TEXCOORD))));
            self.faces.push(face);
            self.texcoord_ids.push([first, first + 1, first + 2]);
        }

        self.patch_stats.push(stats);
        true
    }

    /// Bake edge padding, merge texture coordinates and seal the atlas.
    pub fn finalize(mut self) -> TextureAtlas {
        apply_edge_padding(
            &mut self.image,
            &mut self.validity_mask,
            self.bin.placements(),
            self.padding,
        );
        merge_texcoords(&mut self.texcoords, &mut self.texcoord_ids);

        log::debug!(
            "Finalized {}x{} atlas: {} patches, {} faces, {} texcoords",
            self.size,
            self.size,
            self.bin.placements().len(),
            self.faces.len(),
            self.texcoords.len()
        );

        TextureAtlas {
            size: self.size,
            padding: self.padding,
            placements: self.bin.placements().to_vec(),
            image: Arc::new(self.image),
            validity_mask: self.validity_mask,
            faces: self.faces,
            texcoord_ids: self.texcoord_ids,
            texcoords: self.texcoords,
            patch_stats: self.patch_stats,
        }
    }
}

/// A finalized, read-only texture atlas.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    size: u32,
    padding: u32,
    placements: Vec<Rect>,
    image: Arc<RgbImage>,
    validity_mask: GrayImage,
    faces: Vec<usize>,
    texcoord_ids: Vec<[usize; 3]>,
    texcoords: Vec<Vec2>,
    patch_stats: Vec<PatchStats>,
}

impl TextureAtlas {
    /// Side length of the atlas in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Margin kept around every patch, in pixels.
    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Mesh faces textured by this atlas.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// Texcoord indices of each face's corners, parallel to `faces()`.
    pub fn texcoord_ids(&self) -> &[[usize; 3]] {
        &self.texcoord_ids
    }

    /// Deduplicated texture coordinates in `[0, 1)` atlas space.
    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    /// The padded atlas image.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Shared handle to the atlas image.
    pub fn shared_image(&self) -> Arc<RgbImage> {
        Arc::clone(&self.image)
    }

    /// Per-pixel validity; `VALID` marks content, padding included.
    pub fn validity_mask(&self) -> &GrayImage {
        &self.validity_mask
    }

    /// Padded rectangles of the packed patches, in insertion order.
    pub fn placements(&self) -> &[Rect] {
        &self.placements
    }

    /// Brightness statistics of the packed patches, parallel to `placements()`.
    pub fn patch_stats(&self) -> &[PatchStats] {
        &self.patch_stats
    }

    /// Fraction of atlas pixels holding valid content.
    pub fn coverage(&self) -> f32 {
        let valid = self.validity_mask.pixels().filter(|p| p[0] == VALID).count();
        valid as f32 / (self.size as f32 * self.size as f32).max(1.0)
    }

    /// Export the atlas image as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let cursor = std::io::Cursor::new(&mut bytes);
        let encoder = image::codecs::png::PngEncoder::new(cursor);

        encoder
            .write_image(
                self.image.as_raw(),
                self.size,
                self.size,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| AtlasError::Export(format!("Failed to encode PNG: {}", e)))?;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn solid_patch(width: u32, height: u32, color: [u8; 3], first_face: usize) -> TexturePatch {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        let w = width as f32 - 1.0;
        let h = height as f32 - 1.0;
        TexturePatch::opaque(
            image,
            vec![first_face, first_face + 1],
            vec![
                [Vec2::new(0.0, 0.0), Vec2::new(w, 0.0), Vec2::new(w, h)],
                [Vec2::new(0.0, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)],
            ],
        )
        .unwrap()
    }

    fn stats(patch: &TexturePatch) -> PatchStats {
        patch.brightness_stats()
    }

    #[test]
    fn test_default_padding() {
        assert_eq!(AtlasBuilder::new(256).padding(), 2);
        assert_eq!(AtlasBuilder::new(4096).padding(), 32);
        assert_eq!(AtlasBuilder::new(64).padding(), 0);
    }

    #[test]
    fn test_single_pixel_round_trip() {
        let patch = TexturePatch::opaque(
            RgbImage::from_pixel(1, 1, Rgb([12, 34, 56])),
            vec![0],
            vec![[Vec2::ZERO; 3]],
        )
        .unwrap();

        let mut builder = AtlasBuilder::with_padding(256, 2);
        assert!(builder.insert(&patch, stats(&patch)));
        assert_eq!(builder.placements(), &[Rect::new(0, 0, 5, 5)]);

        let atlas = builder.finalize();
        assert_eq!(atlas.image().get_pixel(2, 2), &Rgb([12, 34, 56]));
        assert_eq!(atlas.texcoords(), &[Vec2::splat(2.5 / 256.0)]);
        assert_eq!(atlas.texcoord_ids(), &[[0, 0, 0]]);
        assert_eq!(atlas.faces(), &[0]);
    }

    #[test]
    fn test_texcoords_offset_into_atlas() {
        let patch = solid_patch(4, 2, [1, 1, 1], 10);
        let mut builder = AtlasBuilder::with_padding(64, 1);
        assert!(builder.insert(&patch, stats(&patch)));

        assert_eq!(builder.faces(), &[10, 11]);
        assert_eq!(builder.texcoord_ids(), &[[0, 1, 2], [3, 4, 5]]);
        // Local (3, 1) -> pixel centre (1 + 3 + 0.5, 1 + 1 + 0.5)
        assert_eq!(builder.texcoords()[1], Vec2::new(4.5, 1.5) / 64.0);
        assert_eq!(builder.texcoords()[2], Vec2::new(4.5, 2.5) / 64.0);

        let atlas = builder.finalize();
        assert_eq!(atlas.texcoords().len(), 4);
        assert_eq!(atlas.texcoord_ids(), &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(atlas.faces().len(), atlas.texcoord_ids().len());
    }

    #[test]
    fn test_border_replication() {
        let mut image = RgbImage::from_pixel(2, 2, Rgb([10, 10, 10]));
        image.put_pixel(1, 1, Rgb([90, 90, 90]));
        let patch = TexturePatch::opaque(image, vec![], vec![]).unwrap();

        let mut builder = AtlasBuilder::with_padding(32, 3);
        assert!(builder.insert(&patch, stats(&patch)));

        // Content at (3, 3); corners of the band repeat the nearest corner pixel
        assert_eq!(builder.image.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(builder.image.get_pixel(7, 7), &Rgb([90, 90, 90]));
        assert_eq!(builder.validity_mask.get_pixel(3, 3), &Luma([VALID]));
        assert_eq!(builder.validity_mask.get_pixel(2, 3), &Luma([VALID]));
        assert_eq!(builder.validity_mask.get_pixel(8, 3), &Luma([0]));
    }

    #[test]
    fn test_band_survives_finalize() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 1, Rgb([200, 200, 200]));
        let patch = TexturePatch::opaque(image, vec![], vec![]).unwrap();

        let mut builder = AtlasBuilder::with_padding(32, 2);
        assert!(builder.insert(&patch, stats(&patch)));
        let atlas = builder.finalize();

        // Band pixels repeat the nearest patch edge pixel
        assert_eq!(atlas.image().get_pixel(1, 3), &Rgb([200, 200, 200]));
        assert_eq!(atlas.image().get_pixel(0, 5), &Rgb([200, 200, 200]));
        assert_eq!(atlas.image().get_pixel(1, 2), &Rgb([0, 0, 0]));
        assert_eq!(atlas.image().get_pixel(5, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_band_follows_invalid_edge() {
        let mut mask = GrayImage::from_pixel(3, 3, Luma([VALID]));
        mask.put_pixel(0, 1, Luma([0]));
        let patch = TexturePatch::new(RgbImage::from_pixel(3, 3, Rgb([40, 40, 40])), mask, vec![], vec![]).unwrap();

        let mut builder = AtlasBuilder::with_padding(32, 1);
        assert!(builder.insert(&patch, stats(&patch)));

        // The band next to an invalid edge pixel is left for edge padding
        assert_eq!(builder.validity_mask.get_pixel(0, 2), &Luma([0]));
        assert_eq!(builder.validity_mask.get_pixel(0, 1), &Luma([VALID]));

        let atlas = builder.finalize();
        assert_eq!(atlas.validity_mask().get_pixel(0, 2), &Luma([VALID]));
        assert_eq!(atlas.image().get_pixel(0, 2), &Rgb([40, 40, 40]));
    }

    #[test]
    fn test_texcoords_stay_below_one_without_padding() {
        let patch = TexturePatch::opaque(
            RgbImage::new(4, 4),
            vec![0],
            vec![[Vec2::splat(3.5), Vec2::new(3.5, -0.5), Vec2::splat(-0.5)]],
        )
        .unwrap();

        let mut builder = AtlasBuilder::with_padding(4, 0);
        assert!(builder.insert(&patch, stats(&patch)));
        let atlas = builder.finalize();

        for uv in atlas.texcoords() {
            assert!(uv.x >= 0.0 && uv.x < 1.0, "{:?}", uv);
            assert!(uv.y >= 0.0 && uv.y < 1.0, "{:?}", uv);
        }
        assert_eq!(atlas.texcoords()[atlas.texcoord_ids()[0][2]], Vec2::ZERO);
    }

    #[test]
    fn test_failed_insert_is_atomic() {
        let big = solid_patch(28, 28, [200, 0, 0], 0);
        let small = solid_patch(10, 10, [0, 200, 0], 2);

        let mut builder = AtlasBuilder::with_padding(32, 2);
        assert!(builder.insert(&big, stats(&big)));

        let before = builder.clone();
        assert!(!builder.insert(&small, stats(&small)));

        assert_eq!(builder.faces(), before.faces());
        assert_eq!(builder.texcoord_ids(), before.texcoord_ids());
        assert_eq!(builder.texcoords(), before.texcoords());
        assert_eq!(builder.image, before.image);
        assert_eq!(builder.validity_mask, before.validity_mask);
        assert_eq!(builder.patch_stats, before.patch_stats);
    }

    #[test]
    fn test_oversized_patch_always_rejected() {
        let size = 64;
        let padding = 2;
        let too_wide = solid_patch(size - 2 * padding + 1, 1, [0, 0, 0], 0);
        let too_tall = solid_patch(1, size - 2 * padding + 1, [0, 0, 0], 0);
        let exact = solid_patch(size - 2 * padding, size - 2 * padding, [0, 0, 0], 0);

        let mut builder = AtlasBuilder::with_padding(size, padding);
        assert!(!builder.insert(&too_wide, stats(&too_wide)));
        assert!(!builder.insert(&too_tall, stats(&too_tall)));
        assert!(builder.is_empty());
        assert!(builder.insert(&exact, stats(&exact)));
    }

    #[test]
    fn test_placements_disjoint_until_full() {
        let size = 128;
        let mut builder = AtlasBuilder::with_padding(size, 2);
        let mut rejected = 0;
        let mut face = 0;

        // Every padded patch covers at least 12x10 pixels: 150 of them overflow 128x128
        for i in 0..150u32 {
            let patch = solid_patch(8 + i % 9, 6 + (i * 3) % 7, [i as u8, 0, 0], face);
            face += 2;
            if !builder.insert(&patch, stats(&patch)) {
                rejected += 1;
            }
            assert_eq!(builder.faces().len(), builder.texcoord_ids().len());
        }

        assert!(rejected > 0);
        let bounds = Rect::new(0, 0, size, size);
        let placements = builder.placements();
        for (i, a) in placements.iter().enumerate() {
            assert!(bounds.contains_rect(a));
            for b in &placements[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
    }

    #[test]
    fn test_finalized_regions_valid() {
        let mut mask = GrayImage::from_pixel(10, 10, Luma([VALID]));
        // Hole in the middle of the patch, beyond the dilation reach
        for y in 1..9 {
            for x in 1..9 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let holed = TexturePatch::new(RgbImage::from_pixel(10, 10, Rgb([5, 6, 7])), mask, vec![], vec![]).unwrap();
        let solid = solid_patch(9, 3, [100, 100, 100], 0);

        let mut builder = AtlasBuilder::with_padding(64, 1);
        assert!(builder.insert(&solid, stats(&solid)));
        assert!(builder.insert(&holed, stats(&holed)));
        let atlas = builder.finalize();

        for rect in atlas.placements() {
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    assert_eq!(atlas.validity_mask().get_pixel(x, y)[0], VALID, "({}, {})", x, y);
                }
            }
        }
        assert!(atlas.coverage() > 0.0 && atlas.coverage() < 1.0);
        assert_eq!(atlas.patch_stats().len(), 2);
    }

    #[test]
    fn test_shared_image() {
        let patch = solid_patch(3, 3, [1, 2, 3], 0);
        let mut builder = AtlasBuilder::new(256);
        builder.insert(&patch, stats(&patch));
        let atlas = builder.finalize();

        let shared = atlas.shared_image();
        assert!(Arc::ptr_eq(&shared, &atlas.shared_image()));
        assert_eq!(shared.dimensions(), (256, 256));
    }

    #[test]
    fn test_to_png() {
        let atlas = AtlasBuilder::new(256).finalize();
        let png = atlas.to_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (256, 256));
    }
}
