//! Texture coordinate deduplication.

use glam::Vec2;
use std::collections::HashMap;

/// Bit pattern key; `-0.0` folds onto `0.0`.
fn key(uv: Vec2) -> (u32, u32) {
    ((uv.x + 0.0).to_bits(), (uv.y + 0.0).to_bits())
}

/// Collapse identical coordinates into shared entries.
///
/// Walks `ids` in face/corner order; the first occurrence of a coordinate
/// takes the next free index. Entries no id refers to are dropped. Running it
/// on its own output changes nothing.
pub(crate) fn merge_texcoords(texcoords: &mut Vec<Vec2>, ids: &mut [[usize; 3]]) {
    let mut merged: Vec<Vec2> = Vec::with_capacity(texcoords.len());
    let mut lookup: HashMap<(u32, u32), usize> = HashMap::with_capacity(texcoords.len());

    for corner in ids.iter_mut().flat_map(|triangle| triangle.iter_mut()) {
        let uv = texcoords[*corner];
        *corner = *lookup.entry(key(uv)).or_insert_with(|| {
            merged.push(uv);
            merged.len() - 1
        });
    }

    *texcoords = merged;
}
