//! Orbit camera controls.
//!
//! Pointer input is accumulated into pending spherical/pan/dolly deltas and
//! integrated once per frame by [`OrbitControls::update`]. With damping on,
//! only a `damping_factor` share of the pending delta is applied per frame and
//! the rest decays, which gives the camera its gliding feel.
//!
//! Left drag rotates, right drag pans, middle drag and the wheel dolly.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Rad, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::{camera::Camera, config::OrbitConfig};

const EPS: f32 = 0.000001;

/// Offset from the orbit target in spherical coordinates.
///
/// `theta` is the azimuth around +Y measured from +Z, `phi` the polar angle
/// from +Y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps `phi` away from the poles where the view matrix degenerates.
    fn make_safe(&mut self) {
        self.phi = self.phi.max(EPS).min(PI - EPS);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    None,
    Rotate,
    Pan,
    Dolly,
}

#[derive(Debug)]
pub struct OrbitControls {
    config: OrbitConfig,
    target: Point3<f32>,
    spherical_delta: Spherical,
    pan_offset: Vector3<f32>,
    // pixels not yet converted into `pan_offset`
    pending_pan: (f32, f32),
    scale: f32,
    viewport_height: f32,
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitControls {
    pub fn new(config: &OrbitConfig, camera: &Camera, viewport_height: f32) -> Self {
        Self {
            config: config.clone(),
            target: camera.target,
            spherical_delta: Spherical::default(),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            pending_pan: (0.0, 0.0),
            scale: 1.0,
            viewport_height: viewport_height.max(1.0),
            drag: Drag::None,
            cursor: None,
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height.max(1.0);
    }

    /// Drag by `dx`, `dy` pixels: a full viewport height turns the camera once.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let per_pixel = 2.0 * PI * self.config.rotate_speed / self.viewport_height;
        self.spherical_delta.theta -= dx * per_pixel;
        self.spherical_delta.phi -= dy * per_pixel;
    }

    /// Drag the target by `dx`, `dy` pixels in screen space.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pending_pan.0 += dx * self.config.pan_speed;
        self.pending_pan.1 += dy * self.config.pan_speed;
    }

    /// Positive steps move the camera closer.
    pub fn dolly(&mut self, steps: f32) {
        let zoom_scale = 0.95_f32.powf(self.config.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom_scale;
        } else if steps < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Drag::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => Drag::Pan,
                    (ElementState::Pressed, MouseButton::Middle) => Drag::Dolly,
                    (ElementState::Released, _) => Drag::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match self.drag {
                        Drag::Rotate => self.rotate(dx, dy),
                        Drag::Pan => self.pan(dx, dy),
                        // dragging down pulls the camera back
                        Drag::Dolly => self.dolly(-dy / 10.0),
                        Drag::None => (),
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
            }
            WindowEvent::MouseWheel { delta, .. } => match delta {
                MouseScrollDelta::LineDelta(_, y) => self.dolly(*y),
                MouseScrollDelta::PixelDelta(pos) => self.dolly(pos.y as f32 / 100.0),
            },
            _ => (),
        }
    }

    /// Integrates pending input into `camera` and clamps it to the configured
    /// limits. Call exactly once per frame.
    pub fn update(&mut self, camera: &mut Camera) {
        self.flush_pending_pan(camera);

        let config = &self.config;
        let damping = if config.enable_damping {
            config.damping_factor
        } else {
            1.0
        };

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        spherical.theta += self.spherical_delta.theta * damping;
        spherical.phi += self.spherical_delta.phi * damping;

        spherical.theta = clamp_azimuth(spherical.theta, config.min_azimuth, config.max_azimuth);
        spherical.phi = spherical.phi.min(config.max_polar).max(config.min_polar);
        spherical.make_safe();
        spherical.radius = (spherical.radius * self.scale)
            .min(config.max_distance)
            .max(config.min_distance);

        self.target += self.pan_offset * damping;

        camera.target = self.target;
        camera.position = self.target + spherical.to_offset();

        let decay = 1.0 - damping;
        self.spherical_delta.theta *= decay;
        self.spherical_delta.phi *= decay;
        self.pan_offset *= decay;
        self.scale = 1.0;
    }

    fn flush_pending_pan(&mut self, camera: &Camera) {
        let (dx, dy) = std::mem::take(&mut self.pending_pan);
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let offset = camera.position - self.target;
        let half_fov: Rad<f32> = (camera.fov_y() / 2.0).into();
        let target_distance = offset.magnitude() * half_fov.0.tan();

        let forward = (-offset).normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);

        let left = 2.0 * dx * target_distance / self.viewport_height;
        let upward = 2.0 * dy * target_distance / self.viewport_height;
        self.pan_offset += right * -left + up * upward;
    }
}

/// Clamps `theta` into `[min, max]`, where the range may wrap around ±π.
fn clamp_azimuth(theta: f32, min: f32, max: f32) -> f32 {
    if !min.is_finite() || !max.is_finite() {
        return theta;
    }
    let wrap = |angle: f32| {
        if angle < -PI {
            angle + 2.0 * PI
        } else if angle > PI {
            angle - 2.0 * PI
        } else {
            angle
        }
    };
    let (min, max) = (wrap(min), wrap(max));
    if min <= max {
        theta.min(max).max(min)
    } else if theta > (min + max) / 2.0 {
        theta.max(min)
    } else {
        theta.min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn setup() -> (OrbitControls, Camera, OrbitConfig) {
        let config = OrbitConfig::default();
        let camera = Camera::new(&CameraConfig::default(), 16.0 / 9.0);
        let controls = OrbitControls::new(&config, &camera, 720.0);
        (controls, camera, config)
    }

    fn azimuth(camera: &Camera) -> f32 {
        Spherical::from_offset(camera.position - camera.target).theta
    }

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).magnitude()
    }

    #[test]
    fn spherical_roundtrip_preserves_offset() {
        let offset = Vector3::new(0.0, 1.0, 7.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!((back - offset).magnitude() < 1e-4);
    }

    #[test]
    fn azimuth_stays_within_bounds_under_extreme_input() {
        let (mut controls, mut camera, config) = setup();
        for i in 0..200 {
            let dx = if i % 3 == 0 { -1.0e6 } else { 1.0e5 };
            controls.rotate(dx, 0.0);
            controls.update(&mut camera);
            let theta = azimuth(&camera);
            assert!(theta >= config.min_azimuth - 1e-4, "theta {theta} below min");
            assert!(theta <= config.max_azimuth + 1e-4, "theta {theta} above max");
        }
    }

    #[test]
    fn distance_stays_within_bounds() {
        let (mut controls, mut camera, config) = setup();
        for _ in 0..100 {
            controls.dolly(50.0);
            controls.update(&mut camera);
            assert!(distance(&camera) >= config.min_distance - 1e-4);
        }
        for _ in 0..100 {
            controls.dolly(-50.0);
            controls.update(&mut camera);
            assert!(distance(&camera) <= config.max_distance + 1e-4);
        }
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let (mut controls, mut camera, _) = setup();
        controls.rotate(-20.0, 0.0);

        controls.update(&mut camera);
        let first = azimuth(&camera);
        controls.update(&mut camera);
        let second = azimuth(&camera);

        assert!(first > 0.0);
        assert!(second > first);
        // each frame applies less than the previous one
        assert!(second - first < first);
    }

    #[test]
    fn without_damping_deltas_apply_at_once() {
        let (_, mut camera, mut config) = setup();
        config.enable_damping = false;
        let mut controls = OrbitControls::new(&config, &camera, 720.0);

        controls.rotate(-20.0, 0.0);
        controls.update(&mut camera);
        let first = azimuth(&camera);
        controls.update(&mut camera);

        assert!(first > 0.0);
        assert!((azimuth(&camera) - first).abs() < 1e-5);
    }

    #[test]
    fn idle_update_keeps_the_default_view() {
        let (mut controls, mut camera, _) = setup();
        let before = camera.position;
        controls.update(&mut camera);
        assert!((camera.position - before).magnitude() < 1e-4);
    }

    #[test]
    fn panning_moves_the_target() {
        let (mut controls, mut camera, _) = setup();
        controls.pan(100.0, 0.0);
        controls.update(&mut camera);

        // dragging right slides the target to the left
        assert!(controls.target().x < 0.0);
        assert_eq!(camera.target, controls.target());
    }

    #[test]
    fn pan_rotate_and_dolly_apply_in_one_update() {
        let (mut controls, mut camera, _) = setup();
        let start = distance(&camera);
        controls.pan(100.0, 0.0);
        controls.rotate(-20.0, 0.0);
        controls.dolly(1.0);
        controls.update(&mut camera);

        assert!(controls.target().x < 0.0);
        assert!(azimuth(&camera) > 0.0);
        assert!(distance(&camera) < start);
        assert_eq!(camera.target, controls.target());
    }

    #[test]
    fn wrapped_azimuth_range_is_respected() {
        // range crossing ±π: [170°, -170°]
        let min = 170f32.to_radians();
        let max = (-170f32).to_radians();
        assert_eq!(clamp_azimuth(PI, min, max), PI);
        assert_eq!(clamp_azimuth(0.5, min, max), min);
        assert_eq!(clamp_azimuth(-0.5, min, max), max);
    }
}
