//! Scene graph.
//!
//! A tree of [`Node`]s. Parents own their children by value, so the tree is
//! acyclic and every node has at most one parent by construction. What a node
//! *is* is carried by the tagged [`NodeKind`]; traversals match on it instead
//! of probing for capabilities.

use crate::{
    data_structures::{
        material::{Color, Material},
        model::GeometryId,
        transform::Transform,
    },
    pipelines::basic::MeshGpu,
};

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Pure transform node.
    Group,
    Mesh(Mesh),
    Light(AmbientLight),
}

/// A renderable triangle list with its material.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub material: Material,
    // Created by the scene pass on first draw.
    pub(crate) gpu: Option<MeshGpu>,
}

impl Mesh {
    pub fn new(geometry: GeometryId, material: Material) -> Self {
        Self {
            geometry,
            material,
            gpu: None,
        }
    }
}

/// Uniform light reaching every surface regardless of orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn new(hex: u32, intensity: f32) -> Self {
        Self {
            color: Color::from_hex(hex),
            intensity,
        }
    }

    pub fn irradiance(&self) -> Color {
        self.color.scaled(self.intensity)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: Option<String>,
    pub transform: Transform,
    /// Invisible nodes are skipped together with their subtree.
    pub visible: bool,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            visible: true,
            kind,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(geometry: GeometryId, material: Material) -> Self {
        Self::new(NodeKind::Mesh(Mesh::new(geometry, material)))
    }

    pub fn light(light: AmbientLight) -> Self {
        Self::new(NodeKind::Light(light))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Depth-first, parent before children.
    pub fn traverse<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    /// Depth-first, parent before children.
    pub fn traverse_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    /// Visits every mesh in this subtree, visible or not.
    pub fn for_each_mesh_mut(&mut self, f: &mut impl FnMut(&mut Mesh)) {
        self.traverse_mut(&mut |node| {
            if let NodeKind::Mesh(mesh) = &mut node.kind {
                f(mesh);
            }
        });
    }

    pub fn meshes(&self) -> Vec<&Mesh> {
        let mut meshes = Vec::new();
        self.traverse(&mut |node| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                meshes.push(mesh);
            }
        });
        meshes
    }

    /// Visits visible nodes together with their world transform, given the
    /// world transform of this node's parent.
    pub fn visit_visible_mut(
        &mut self,
        parent: &Transform,
        f: &mut impl FnMut(&mut Node, &Transform),
    ) {
        if !self.visible {
            return;
        }
        let world = parent * &self.transform;
        f(self, &world);
        for child in &mut self.children {
            child.visit_visible_mut(&world, f);
        }
    }

    /// Re-bases local geometry and texture indices onto a shared store whose
    /// first free slots are `geometry_offset` and `texture_offset`.
    pub(crate) fn offset_resources(&mut self, geometry_offset: usize, texture_offset: usize) {
        self.for_each_mesh_mut(&mut |mesh| {
            mesh.geometry = GeometryId(mesh.geometry.0 + geometry_offset);
            mesh.material.offset_maps(texture_offset);
            mesh.gpu = None;
        });
    }
}
