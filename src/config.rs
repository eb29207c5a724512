//! Static scene configuration.
//!
//! All tunables of the visual live here. [`SceneConfig::default`] reproduces the
//! reference look (red glow, slight bloom haze, restricted orbit); callers that
//! want a different look build their own and pass it to [`crate::run_with`].

use std::f32::consts::PI;

use crate::pipelines::bloom::KernelSize;

#[derive(Clone, Debug)]
pub struct SceneConfig {
    /// Window title / panel title.
    pub title: String,
    /// Path of the glTF/GLB model, relative to the asset root.
    pub model_path: String,
    /// Path of the emissive map image, relative to the asset root.
    pub emissive_map_path: String,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub ambient_light: AmbientLightConfig,
    pub emissive: EmissiveConfig,
    pub bloom: BloomConfig,
    pub intensity_control: ControlConfig,
    /// Vertical amplitude of the idle floating motion.
    pub float_amplitude: f32,
    /// Upper bound for the device pixel ratio used to size the drawing buffer.
    pub max_pixel_ratio: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            title: "Red Hot Floppy".to_string(),
            model_path: "models/floppy.glb".to_string(),
            emissive_map_path: "textures/floppy/floppyEmissive-grad.png".to_string(),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            ambient_light: AmbientLightConfig::default(),
            emissive: EmissiveConfig::default(),
            bloom: BloomConfig::default(),
            intensity_control: ControlConfig::default(),
            float_amplitude: 0.25,
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 75.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 1.0, 7.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Orbit camera limits and feel. Angles are in radians.
#[derive(Clone, Debug)]
pub struct OrbitConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_azimuth: f32,
    pub max_azimuth: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.1,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 0.075,
            min_azimuth: -(PI / 2.0) + 0.35,
            max_azimuth: (PI / 2.0) - 0.35,
            min_polar: 0.0,
            max_polar: PI,
            min_distance: 5.0,
            max_distance: 8.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AmbientLightConfig {
    pub color: u32,
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 2.1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmissiveConfig {
    /// sRGB hex colour of the glow.
    pub color: u32,
    pub intensity: f32,
}

impl Default for EmissiveConfig {
    fn default() -> Self {
        Self {
            color: 0xFB6260,
            intensity: 5.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BloomConfig {
    pub intensity: f32,
    pub luminance_threshold: f32,
    pub luminance_smoothing: f32,
    pub kernel_size: KernelSize,
    /// Bloom targets are this fraction of the drawing buffer size.
    pub resolution_scale: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            intensity: 1.2,
            luminance_threshold: 0.05,
            luminance_smoothing: 1.0,
            kernel_size: KernelSize::VeryLarge,
            resolution_scale: 0.5,
        }
    }
}

/// Range of a numeric panel control.
#[derive(Clone, Debug)]
pub struct ControlConfig {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 5.0,
            step: 0.01,
        }
    }
}
