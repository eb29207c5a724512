//! Emissive glow applied to every mesh of a loaded model.

use crate::data_structures::{material::Color, scene_graph::Node, texture::TextureHandle};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmissiveParams {
    pub color: Color,
    pub map: Option<TextureHandle>,
    pub intensity: f32,
}

/// Sets the emissive colour, map and intensity on every mesh below `root`,
/// hidden ones included. Returns the number of meshes touched.
///
/// Applying the same parameters twice leaves the materials as after the first
/// call.
pub fn apply_emissive(root: &mut Node, params: &EmissiveParams) -> usize {
    let mut count = 0;
    root.for_each_mesh_mut(&mut |mesh| {
        mesh.material.set_emissive(params.color);
        mesh.material.set_emissive_map(params.map);
        mesh.material.set_emissive_intensity(params.intensity);
        count += 1;
    });
    count
}

/// Changes only the emissive intensity below `root`.
pub fn set_emissive_intensity(root: &mut Node, intensity: f32) -> usize {
    let mut count = 0;
    root.for_each_mesh_mut(&mut |mesh| {
        mesh.material.set_emissive_intensity(intensity);
        count += 1;
    });
    log::debug!("Emissive intensity set to {intensity} on {count} meshes");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{material::Material, model::GeometryId};

    fn model() -> Node {
        let mut root = Node::group();
        let mut nested = Node::group();
        nested.add_child(Node::mesh(GeometryId(0), Material::default()));
        let mut hidden = Node::mesh(GeometryId(1), Material::default());
        hidden.visible = false;
        nested.add_child(hidden);
        root.add_child(nested);
        root.add_child(Node::mesh(GeometryId(2), Material::default()));
        root
    }

    fn glow() -> EmissiveParams {
        EmissiveParams {
            color: Color::from_hex(0xFB6260),
            map: Some(TextureHandle(7)),
            intensity: 5.0,
        }
    }

    #[test]
    fn every_mesh_glows() {
        let mut root = model();
        assert_eq!(apply_emissive(&mut root, &glow()), 3);

        for mesh in root.meshes() {
            assert_eq!(mesh.material.emissive(), Color::from_hex(0xFB6260));
            assert_eq!(mesh.material.emissive_map(), Some(TextureHandle(7)));
            assert_eq!(mesh.material.emissive_intensity(), 5.0);
            assert!(mesh.material.needs_update());
        }
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut once = model();
        apply_emissive(&mut once, &glow());
        let mut twice = model();
        apply_emissive(&mut twice, &glow());
        apply_emissive(&mut twice, &glow());

        let once: Vec<_> = once.meshes().into_iter().map(|m| m.material.clone()).collect();
        let twice: Vec<_> = twice.meshes().into_iter().map(|m| m.material.clone()).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn intensity_change_keeps_colour_and_map() {
        let mut root = model();
        apply_emissive(&mut root, &glow());
        root.for_each_mesh_mut(&mut |mesh| {
            mesh.material.take_needs_update();
        });

        assert_eq!(set_emissive_intensity(&mut root, 0.0), 3);
        for mesh in root.meshes() {
            assert_eq!(mesh.material.emissive_intensity(), 0.0);
            assert_eq!(mesh.material.emissive(), Color::from_hex(0xFB6260));
            assert_eq!(mesh.material.emissive_map(), Some(TextureHandle(7)));
            assert!(mesh.material.needs_update());
        }
    }

    #[test]
    fn model_without_meshes_is_left_alone() {
        let mut root = Node::group();
        assert_eq!(apply_emissive(&mut root, &glow()), 0);
    }
}
