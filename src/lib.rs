//! red-hot-floppy
//!
//! A single-scene hero visual: a floppy disk loaded from glTF, lit by an
//! ambient light, glowing through an emissive map and post-processed with
//! bloom. The camera orbits the model within fixed limits while the model
//! floats up and down. Runs natively and in the browser (WebGL2).
//!
//! High-level modules
//! - `app`: window, event loop and the asset-loading continuation
//! - `animation`: per-frame clock and floating motion
//! - `camera`: perspective camera and its GPU uniform
//! - `config`: every tunable of the visual, with the reference defaults
//! - `context`: window surface, device and queue
//! - `controls`: damped, clamped orbit controls
//! - `data_structures`: scene graph, materials, geometry and textures
//! - `emissive`: glow parameters applied across a model
//! - `panel`: numeric controls bound to scene state
//! - `pipelines`: the scene pass and the bloom passes
//! - `render`: render targets and the pass chain
//! - `resources`: glTF and image loading, GPU asset store
//! - `scene`: the scene root, its light and the model slot
//! - `viewport`: logical size, pixel ratio and drawing buffer size
//!

pub mod animation;
pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod emissive;
pub mod error;
pub mod panel;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewport;

pub use app::{run, run_with};
pub use config::SceneConfig;
pub use error::AssetLoadError;
