//! Packing a whole set of patches into as many atlases as needed.
//!
//! Patches are offered to one atlas at a time in a fixed order; whatever it
//! rejects moves on to the next atlas, whose size is chosen from the patches
//! that are still left.

use crate::atlas::{default_padding, AtlasBuilder, TextureAtlas};
use crate::error::{AtlasError, Result};
use crate::patch::TexturePatch;
use crate::types::PatchStats;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How much padding each atlas page gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingMode {
    /// `size >> 7` pixels, so larger pages get wider gutters.
    Proportional,
    /// The same number of pixels on every page.
    Fixed(u32),
}

impl PaddingMode {
    /// Padding in pixels for an atlas of the given size.
    pub fn resolve(&self, size: u32) -> u32 {
        match self {
            PaddingMode::Proportional => default_padding(size),
            PaddingMode::Fixed(padding) => *padding,
        }
    }
}

/// Atlas packing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Largest atlas side length in pixels.
    pub max_size: u32,
    /// Side length used when the patches comfortably fit.
    pub preferred_size: u32,
    /// Smallest atlas side length in pixels.
    pub min_size: u32,
    /// Gutter around every patch.
    pub padding: PaddingMode,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            max_size: 8 * 1024,
            preferred_size: 4 * 1024,
            min_size: 256,
            padding: PaddingMode::Proportional,
        }
    }
}

impl PackerConfig {
    /// Use a fixed padding on every atlas.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = PaddingMode::Fixed(padding);
        self
    }

    /// Set the size limits. Values are reordered so that min <= preferred <= max.
    pub fn with_sizes(mut self, min_size: u32, preferred_size: u32, max_size: u32) -> Self {
        let mut sizes = [min_size.max(1), preferred_size.max(1), max_size.max(1)];
        sizes.sort_unstable();
        self.min_size = sizes[0];
        self.preferred_size = sizes[1];
        self.max_size = sizes[2];
        self
    }
}

/// Packs texture patches into finalized atlases.
pub struct AtlasPacker {
    config: PackerConfig,
}

impl AtlasPacker {
    /// Create a packer with default configuration.
    pub fn new() -> Self {
        Self {
            config: PackerConfig::default(),
        }
    }

    /// Create a packer with custom configuration.
    pub fn with_config(config: PackerConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Pack all patches, opening new atlases until every patch is placed.
    ///
    /// Atlases are finalized in parallel; their order matches the order in
    /// which they were opened.
    pub fn pack(&self, patches: &[TexturePatch]) -> Result<Vec<TextureAtlas>> {
        let stats: Vec<PatchStats> = patches.iter().map(TexturePatch::brightness_stats).collect();
        let mut remaining = insertion_order(patches, &stats);
        let mut builders = Vec::new();

        while !remaining.is_empty() {
            let size = calculate_texture_size(remaining.iter().map(|&i| &patches[i]), &self.config);
            let (builder, rejected) = self.fill_atlas(size, &remaining, patches, &stats)?;

            log::debug!(
                "Atlas {} ({}x{}): {} patches placed, {} left",
                builders.len(),
                builder.size(),
                builder.size(),
                remaining.len() - rejected.len(),
                rejected.len()
            );

            builders.push(builder);
            remaining = rejected;
        }

        let atlases: Vec<TextureAtlas> = builders.into_par_iter().map(AtlasBuilder::finalize).collect();

        log::info!(
            "Packed {} patches into {} atlas(es)",
            patches.len(),
            atlases.len()
        );
        Ok(atlases)
    }

    /// Offer every remaining patch to a new atlas of `size`.
    ///
    /// The chosen size always fits the first remaining patch unless that
    /// patch exceeds the maximum size, so an atlas that stays empty is an
    /// error rather than a reason to retry.
    fn fill_atlas(
        &self,
        size: u32,
        remaining: &[usize],
        patches: &[TexturePatch],
        stats: &[PatchStats],
    ) -> Result<(AtlasBuilder, Vec<usize>)> {
        let mut builder = AtlasBuilder::with_padding(size, self.config.padding.resolve(size));
        let rejected: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| !builder.insert(&patches[i], stats[i]))
            .collect();

        if builder.is_empty() {
            let patch = &patches[remaining[0]];
            log::warn!(
                "Patch {} ({}x{}) does not fit into an empty {}x{} atlas",
                remaining[0],
                patch.width(),
                patch.height(),
                size,
                size
            );
            return Err(AtlasError::PatchTooLarge {
                width: patch.width(),
                height: patch.height(),
                max_size: self.config.max_size,
            });
        }

        Ok((builder, rejected))
    }
}

impl Default for AtlasPacker {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack patches with the given configuration.
pub fn pack_patches(patches: &[TexturePatch], config: &PackerConfig) -> Result<Vec<TextureAtlas>> {
    AtlasPacker::with_config(config.clone()).pack(patches)
}

/// Indices of `patches`: largest first, then brighter mean, then brighter
/// maximum, then input order.
fn insertion_order(patches: &[TexturePatch], stats: &[PatchStats]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..patches.len()).collect();
    order.sort_by(|&a, &b| {
        patches[b]
            .area()
            .cmp(&patches[a].area())
            .then_with(|| stats[b].mean.total_cmp(&stats[a].mean))
            .then_with(|| stats[b].max.total_cmp(&stats[a].max))
            .then(a.cmp(&b))
    });
    order
}

/// Choose the side length of the next atlas from the patches still to pack,
/// given in insertion order.
///
/// Starts at the maximum size, drops to the preferred size when everything
/// would fit a handful of preferred pages, then halves while the patches would
/// use less than a fifth of the page.
pub fn calculate_texture_size<'a>(
    patches: impl Iterator<Item = &'a TexturePatch> + Clone,
    config: &PackerConfig,
) -> u32 {
    let preferred = config.preferred_size as u64;
    let mut size = config.max_size;

    loop {
        let padding = config.padding.resolve(size) as u64;
        let mut total_area = 0u64;
        let mut max_width = 0u64;
        let mut max_height = 0u64;

        for patch in patches.clone() {
            let width = patch.width() as u64 + 2 * padding;
            let height = patch.height() as u64 + 2 * padding;
            max_width = max_width.max(width);
            max_height = max_height.max(height);

            let area = width * height;
            let waste = area - patch.area();
            // Patches are sorted by size, so once padding dominates the
            // remaining ones barely matter.
            if waste as f64 / patch.area() as f64 > 1.0 {
                break;
            }
            total_area += area;
        }

        if size > config.preferred_size
            && max_width < preferred
            && max_height < preferred
            && total_area / (preferred * preferred) < 8
        {
            size = config.preferred_size;
            continue;
        }

        if size <= config.min_size {
            return config.min_size;
        }

        let side = size as u64;
        if max_width < side / 2
            && max_height < side / 2
            && (total_area as f64) / ((side * side) as f64) < 0.2
        {
            size /= 2;
            continue;
        }

        return size;
    }
}
