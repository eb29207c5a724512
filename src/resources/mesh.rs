use anyhow::Context;

use crate::data_structures::model::{GeometryData, ModelVertex};

/// Reads one glTF primitive into a triangle list.
///
/// Missing normals or texture coordinates are zero-filled; a primitive without
/// indices is drawn in vertex order.
pub fn read_primitive(
    name: &str,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
) -> anyhow::Result<GeometryData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        anyhow::bail!("{name}: unsupported primitive mode {:?}", primitive.mode());
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()
        .with_context(|| format!("{name}: primitive has no positions"))?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        anyhow::bail!(
            "{name}: index {bad} out of range for {} vertices",
            vertices.len()
        );
    }

    Ok(GeometryData {
        name: name.to_string(),
        vertices,
        indices,
    })
}
