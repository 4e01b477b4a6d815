//! Edge padding: extrapolates patch content into the surrounding gutter so
//! bilinear filtering and mipmapping never pull in background colour.

use crate::patch::VALID;
use crate::types::Rect;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::collections::{BTreeSet, VecDeque};

/// 3x3 binomial kernel, indexed `[dy + 1][dx + 1]`.
const GAUSS: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

/// Ordered by row then column so every run visits pixels identically.
type Frontier = BTreeSet<(u32, u32)>;

/// Dilate valid content outward by `padding + 1` rings, then fill any pixel
/// of `placements` still left invalid from its nearest valid neighbour.
pub(crate) fn apply_edge_padding(
    image: &mut RgbImage,
    mask: &mut GrayImage,
    placements: &[Rect],
    padding: u32,
) {
    let mut frontier = initial_frontier(mask);

    for _ in 0..=padding {
        if frontier.is_empty() {
            break;
        }
        frontier = dilate_ring(image, mask, &frontier);
    }

    for rect in placements {
        flood_fill_rect(image, mask, rect);
    }
}

fn is_valid(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y)[0] == VALID
}

/// In-bounds 8-neighbourhood of (x, y) with kernel offsets.
fn neighbours(width: u32, height: u32, x: u32, y: u32) -> impl Iterator<Item = (u32, u32, usize, usize)> {
    (-1i64..=1).flat_map(move |dy| {
        (-1i64..=1).filter_map(move |dx| {
            if dx == 0 && dy == 0 {
                return None;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                return None;
            }
            Some((nx as u32, ny as u32, (dx + 1) as usize, (dy + 1) as usize))
        })
    })
}

/// Invalid pixels touching at least one valid pixel.
fn initial_frontier(mask: &GrayImage) -> Frontier {
    let (width, height) = mask.dimensions();
    let mut frontier = Frontier::new();

    for y in 0..height {
        for x in 0..width {
            if is_valid(mask, x, y) {
                continue;
            }
            if neighbours(width, height, x, y).any(|(nx, ny, _, _)| is_valid(mask, nx, ny)) {
                frontier.insert((y, x));
            }
        }
    }

    frontier
}

/// Fill one ring of frontier pixels and return the next ring.
///
/// Colours are averaged only over pixels that were valid before this ring
/// started, so the visiting order within a ring does not matter.
fn dilate_ring(image: &mut RgbImage, mask: &mut GrayImage, frontier: &Frontier) -> Frontier {
    let (width, height) = mask.dimensions();
    let mut filled = Vec::with_capacity(frontier.len());

    for &(y, x) in frontier {
        let mut color = [0.0f32; 3];
        let mut norm = 0.0f32;
        for (nx, ny, kx, ky) in neighbours(width, height, x, y) {
            if !is_valid(mask, nx, ny) {
                continue;
            }
            let weight = GAUSS[ky][kx];
            let pixel = image.get_pixel(nx, ny);
            for c in 0..3 {
                color[c] += weight * pixel[c] as f32;
            }
            norm += weight;
        }
        if norm > 0.0 {
            filled.push((x, y, color.map(|v| (v / norm).round().clamp(0.0, 255.0) as u8)));
        }
    }

    for &(x, y, color) in &filled {
        image.put_pixel(x, y, Rgb(color));
        mask.put_pixel(x, y, Luma([VALID]));
    }

    let mut next = Frontier::new();
    for &(x, y, _) in &filled {
        for (nx, ny, _, _) in neighbours(width, height, x, y) {
            if !is_valid(mask, nx, ny) {
                next.insert((ny, nx));
            }
        }
    }
    next
}

/// Breadth-first fill of invalid pixels inside `rect` from the valid pixels
/// of the same rectangle. Each filled pixel copies its BFS parent.
fn flood_fill_rect(image: &mut RgbImage, mask: &mut GrayImage, rect: &Rect) {
    let mut queue = VecDeque::new();
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            if is_valid(mask, x, y) {
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let color = *image.get_pixel(x, y);
        let steps: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
        for (dx, dy) in steps {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < rect.x as i64
                || ny < rect.y as i64
                || nx >= rect.right() as i64
                || ny >= rect.bottom() as i64
            {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if is_valid(mask, nx, ny) {
                continue;
            }
            image.put_pixel(nx, ny, color);
            mask.put_pixel(nx, ny, Luma([VALID]));
            queue.push_back((nx, ny));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_valid_pixel(size: u32, x: u32, y: u32, color: [u8; 3]) -> (RgbImage, GrayImage) {
        let mut image = RgbImage::new(size, size);
        let mut mask = GrayImage::new(size, size);
        image.put_pixel(x, y, Rgb(color));
        mask.put_pixel(x, y, Luma([VALID]));
        (image, mask)
    }

    #[test]
    fn test_dilation_reaches_padding_plus_one() {
        let (mut image, mut mask) = single_valid_pixel(16, 8, 8, [200, 100, 50]);
        apply_edge_padding(&mut image, &mut mask, &[], 2);

        // Three rings around the seed: a 7x7 block
        for y in 0..16 {
            for x in 0..16 {
                let inside = (5..=11).contains(&x) && (5..=11).contains(&y);
                assert_eq!(is_valid(&mask, x, y), inside, "pixel ({}, {})", x, y);
            }
        }
        assert_eq!(image.get_pixel(5, 5), &Rgb([200, 100, 50]));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_gaussian_weighting() {
        let mut image = RgbImage::new(3, 1);
        let mut mask = GrayImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(2, 0, Rgb([100, 100, 100]));
        mask.put_pixel(0, 0, Luma([VALID]));
        mask.put_pixel(2, 0, Luma([VALID]));

        apply_edge_padding(&mut image, &mut mask, &[], 0);
        assert_eq!(image.get_pixel(1, 0), &Rgb([50, 50, 50]));
        assert!(is_valid(&mask, 1, 0));
    }

    #[test]
    fn test_dilation_stays_in_bounds() {
        let (mut image, mut mask) = single_valid_pixel(4, 0, 0, [1, 2, 3]);
        apply_edge_padding(&mut image, &mut mask, &[], 8);
        assert!(mask.pixels().all(|p| p[0] == VALID));
        assert!(image.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn test_flood_fill_covers_rect() {
        let (mut image, mut mask) = single_valid_pixel(32, 1, 1, [9, 9, 9]);
        let rect = Rect::new(0, 0, 20, 12);
        apply_edge_padding(&mut image, &mut mask, &[rect], 1);

        for y in 0..12 {
            for x in 0..20 {
                assert!(is_valid(&mask, x, y));
                assert_eq!(image.get_pixel(x, y), &Rgb([9, 9, 9]));
            }
        }
        // Outside the rect only the dilation rings are filled
        assert!(!is_valid(&mask, 25, 25));
    }

    #[test]
    fn test_rect_without_content_untouched() {
        let mut image = RgbImage::new(8, 8);
        let mut mask = GrayImage::new(8, 8);
        apply_edge_padding(&mut image, &mut mask, &[Rect::new(0, 0, 4, 4)], 2);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }
}
