//! Scene data: the node tree and what hangs off it.
//!
//! - `scene_graph` holds the node tree with its tagged node kinds
//! - `material` holds colours and the emissive metal/rough material
//! - `model` holds vertex layout and mesh geometry
//! - `texture` wraps GPU textures and render targets
//! - `transform` composes local/world transforms

pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
