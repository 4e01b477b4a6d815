//! Merging finalized atlases into one mesh-wide texture layout.

use crate::atlas::TextureAtlas;
use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};

/// Texture assignment of one mesh face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceTexture {
    /// Index of the atlas (material) the face samples from.
    pub material: usize,
    /// Indices into [`AtlasLayout::texcoords`] for the three corners.
    pub texcoord_ids: [usize; 3],
}

/// Per-atlas summary inside a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInfo {
    /// Atlas side length in pixels.
    pub size: u32,
    /// First texcoord of this atlas in the merged array.
    pub texcoord_offset: usize,
    /// Number of texcoords contributed by this atlas.
    pub texcoord_count: usize,
    /// Number of faces textured by this atlas.
    pub face_count: usize,
}

/// Texture coordinates and material assignment for a whole mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasLayout {
    /// Texture coordinates of all atlases, atlas by atlas.
    pub texcoords: Vec<[f32; 2]>,
    /// One entry per mesh face; `None` for faces no atlas covers.
    pub faces: Vec<Option<FaceTexture>>,
    /// One entry per atlas, indexed by material.
    pub materials: Vec<MaterialInfo>,
}

impl AtlasLayout {
    /// Number of faces that received a texture.
    pub fn textured_face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }

    /// Texture coordinates of a face's corners, if it is textured.
    pub fn face_texcoords(&self, face: usize) -> Option<[[f32; 2]; 3]> {
        let texture = self.faces.get(face)?.as_ref()?;
        Some(texture.texcoord_ids.map(|id| self.texcoords[id]))
    }

    /// Serialize the layout as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Merge atlases into one layout for a mesh with `face_count` faces.
///
/// Each atlas's texcoord ids are shifted by the number of texcoords of the
/// atlases before it; the atlas index becomes the face's material.
pub fn assemble_layout(atlases: &[TextureAtlas], face_count: usize) -> Result<AtlasLayout> {
    let total_texcoords = atlases.iter().map(|a| a.texcoords().len()).sum();
    let mut texcoords = Vec::with_capacity(total_texcoords);
    let mut faces: Vec<Option<FaceTexture>> = vec![None; face_count];
    let mut materials = Vec::with_capacity(atlases.len());

    for (material, atlas) in atlases.iter().enumerate() {
        let offset = texcoords.len();
        texcoords.extend(atlas.texcoords().iter().map(|uv| uv.to_array()));

        for (&face, ids) in atlas.faces().iter().zip(atlas.texcoord_ids()) {
            let slot = faces.get_mut(face).ok_or_else(|| {
                AtlasError::InvalidLayout(format!(
                    "atlas {} references face {} but the mesh has {} faces",
                    material, face, face_count
                ))
            })?;
            if let Some(existing) = slot {
                return Err(AtlasError::InvalidLayout(format!(
                    "face {} is textured by atlas {} and atlas {}",
                    face, existing.material, material
                )));
            }
            *slot = Some(FaceTexture {
                material,
                texcoord_ids: ids.map(|id| id + offset),
            });
        }

        materials.push(MaterialInfo {
            size: atlas.size(),
            texcoord_offset: offset,
            texcoord_count: atlas.texcoords().len(),
            face_count: atlas.faces().len(),
        });
    }

    let layout = AtlasLayout {
        texcoords,
        faces,
        materials,
    };
    log::debug!(
        "Assembled layout: {}/{} faces textured across {} material(s)",
        layout.textured_face_count(),
        face_count,
        layout.materials.len()
    );
    Ok(layout)
}
