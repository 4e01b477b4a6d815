//! Guillotine rectangle packer for a single square atlas.

use crate::types::Rect;

/// Free-space bookkeeping for one square atlas page.
///
/// Uses guillotine packing with best short side fit. Free rectangles never
/// overlap and are never merged back together.
#[derive(Debug, Clone)]
pub struct RectangularBin {
    size: u32,
    free_rects: Vec<Rect>,
    placements: Vec<Rect>,
}

impl RectangularBin {
    /// Create an empty bin covering `[0, size) x [0, size)`.
    pub fn new(size: u32) -> Self {
        let free_rects = if size > 0 {
            vec![Rect::new(0, 0, size, size)]
        } else {
            Vec::new()
        };
        Self {
            size,
            free_rects,
            placements: Vec::new(),
        }
    }

    /// Side length of the bin.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Free rectangles; pairwise disjoint, in creation order.
    pub fn free_rects(&self) -> &[Rect] {
        &self.free_rects
    }

    /// Accepted rectangles in insertion order.
    pub fn placements(&self) -> &[Rect] {
        &self.placements
    }

    /// Total free area left in the bin.
    pub fn free_area(&self) -> u64 {
        self.free_rects.iter().map(Rect::area).sum()
    }

    /// Place a `width x height` rectangle.
    ///
    /// Returns the placed rectangle, or `None` without touching the bin when
    /// no free rectangle is large enough.
    pub fn insert(&mut self, width: u32, height: u32) -> Option<Rect> {
        if width == 0 || height == 0 || width > self.size || height > self.size {
            return None;
        }

        let index = self.find_best_short_side_fit(width, height)?;
        let free = self.free_rects.remove(index);
        let placed = Rect::new(free.x, free.y, width, height);

        self.split(&free, width, height);
        self.placements.push(placed);
        Some(placed)
    }

    /// Index of the free rectangle with the smallest short-side leftover.
    /// Ties go to the earliest rectangle.
    fn find_best_short_side_fit(&self, width: u32, height: u32) -> Option<usize> {
        let mut best_index = None;
        let mut best_short_side = u32::MAX;

        for (i, rect) in self.free_rects.iter().enumerate() {
            if rect.width < width || rect.height < height {
                continue;
            }
            let short_side = (rect.width - width).min(rect.height - height);
            if short_side < best_short_side {
                best_short_side = short_side;
                best_index = Some(i);
            }
        }

        best_index
    }

    /// Split the leftover of `free` along the shorter leftover axis.
    fn split(&mut self, free: &Rect, width: u32, height: u32) {
        let leftover_w = free.width - width;
        let leftover_h = free.height - height;

        let (right, bottom) = if leftover_w < leftover_h {
            // Horizontal cut: the bottom piece spans the full width
            (
                Rect::new(free.x + width, free.y, leftover_w, height),
                Rect::new(free.x, free.y + height, free.width, leftover_h),
            )
        } else {
            // Vertical cut: the right piece spans the full height
            (
                Rect::new(free.x + width, free.y, leftover_w, free.height),
                Rect::new(free.x, free.y + height, width, leftover_h),
            )
        };

        for rect in [right, bottom] {
            if rect.width > 0 && rect.height > 0 {
                self.free_rects.push(rect);
            }
        }
    }
}
