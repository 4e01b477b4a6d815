//! Rectangular pixel blits between image buffers.

use image::{ImageBuffer, Pixel};

/// Copy `src` into `dest` at `(x, y)`, optionally framed by a border.
///
/// The destination area is `(w + 2 * border) x (h + 2 * border)` starting at
/// `(x, y)`; source pixel `(i, j)` lands at `(x + border + i, y + border + j)`.
/// Border cells have no source pixel and are left untouched.
///
/// # Panics
///
/// Panics if the framed source does not fit into `dest` at `(x, y)`.
pub fn copy_into<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    x: u32,
    y: u32,
    dest: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    border: u32,
) {
    let (src_w, src_h) = src.dimensions();
    assert!(
        x as u64 + src_w as u64 + 2 * border as u64 <= dest.width() as u64,
        "copy_into: {}px wide source with border {} at x={} exceeds {}px destination",
        src_w,
        border,
        x,
        dest.width()
    );
    assert!(
        y as u64 + src_h as u64 + 2 * border as u64 <= dest.height() as u64,
        "copy_into: {}px high source with border {} at y={} exceeds {}px destination",
        src_h,
        border,
        y,
        dest.height()
    );

    for sy in 0..src_h {
        for sx in 0..src_w {
            dest.put_pixel(x + border + sx, y + border + sy, *src.get_pixel(sx, sy));
        }
    }
}

/// Grow `src` by `border` pixels on every side, repeating its edge pixels.
pub fn extend_edges<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    border: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (width, height) = src.dimensions();
    ImageBuffer::from_fn(width + 2 * border, height + 2 * border, |px, py| {
        let sx = (px as i64 - border as i64).clamp(0, width as i64 - 1) as u32;
        let sy = (py as i64 - border as i64).clamp(0, height as i64 - 1) as u32;
        *src.get_pixel(sx, sy)
    })
}
