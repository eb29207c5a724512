//! Per-frame driver: advances the clock, the orbit controls and the floating
//! motion of the model, then hands the scene to the renderer.

use instant::Instant;

use crate::{controls::OrbitControls, scene::Scene};

/// Monotonic clock that starts on its first read.
#[derive(Debug, Default)]
pub struct Clock {
    start: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub fn elapsed_secs(&mut self) -> f32 {
        let start = *self.start.get_or_insert_with(Instant::now);
        start.elapsed().as_secs_f32()
    }
}

/// Vertical offset of the model at `elapsed` seconds.
pub fn float_offset(elapsed: f32, amplitude: f32) -> f32 {
    elapsed.sin() * amplitude
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

/// Result of one running tick.
#[derive(Debug)]
pub struct Tick<R> {
    pub elapsed: f32,
    pub output: R,
}

#[derive(Debug)]
pub struct AnimationDriver {
    state: DriverState,
    clock: Clock,
    amplitude: f32,
}

impl AnimationDriver {
    pub fn new(amplitude: f32) -> Self {
        Self {
            state: DriverState::Idle,
            clock: Clock::new(),
            amplitude,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn start(&mut self) {
        if self.state == DriverState::Idle {
            log::info!("Animation loop started");
            self.state = DriverState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state == DriverState::Running {
            log::info!("Animation loop stopped");
            self.state = DriverState::Idle;
        }
    }

    /// Runs one frame: clock, controls, model motion, then `render`.
    ///
    /// Returns `None` without touching anything while idle.
    pub fn tick<R>(
        &mut self,
        scene: &mut Scene,
        controls: &mut OrbitControls,
        render: impl FnOnce(&mut Scene) -> R,
    ) -> Option<Tick<R>> {
        if self.state == DriverState::Idle {
            return None;
        }
        let elapsed = self.clock.elapsed_secs();

        controls.update(scene.camera_mut());

        if let Some(model) = scene.model_mut() {
            model.transform.position.y = float_offset(elapsed, self.amplitude);
        }

        let output = render(scene);
        Some(Tick { elapsed, output })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;
    use crate::{config::SceneConfig, data_structures::scene_graph::Node};

    fn setup() -> (AnimationDriver, Scene, OrbitControls) {
        let config = SceneConfig::default();
        let scene = Scene::new(&config, 1.0);
        let controls = OrbitControls::new(&config.orbit, scene.camera(), 600.0);
        (AnimationDriver::new(config.float_amplitude), scene, controls)
    }

    #[test]
    fn float_offset_follows_sine() {
        assert_eq!(float_offset(0.0, 0.25), 0.0);
        assert!((float_offset(std::f32::consts::FRAC_PI_2, 0.25) - 0.25).abs() < 1e-6);
        assert!((float_offset(3.0 * std::f32::consts::FRAC_PI_2, 0.25) + 0.25).abs() < 1e-6);
    }

    #[test]
    fn idle_driver_does_nothing() {
        let (mut driver, mut scene, mut controls) = setup();
        let mut rendered = false;

        let tick = driver.tick(&mut scene, &mut controls, |_| rendered = true);

        assert!(tick.is_none());
        assert!(!rendered);
    }

    #[test]
    fn clock_starts_on_first_read() {
        let mut clock = Clock::new();
        assert!(!clock.is_started());
        let first = clock.elapsed_secs();
        assert!(clock.is_started());
        assert!(clock.elapsed_secs() >= first);
    }

    #[test]
    fn running_tick_moves_the_model_before_rendering() {
        let (mut driver, mut scene, mut controls) = setup();
        scene.attach_model(Node::group().with_name("floppy"));
        driver.start();

        let tick = driver
            .tick(&mut scene, &mut controls, |scene| {
                scene.model().map(|m| m.transform.position.y)
            })
            .expect("driver is running");

        let seen = tick.output.expect("model attached");
        assert!((seen - float_offset(tick.elapsed, 0.25)).abs() < 1e-6);
    }

    #[test]
    fn controls_are_updated_before_rendering() {
        let (mut driver, mut scene, mut controls) = setup();
        driver.start();
        controls.dolly(-10.0);

        let distance = driver
            .tick(&mut scene, &mut controls, |scene| {
                let camera = scene.camera();
                (camera.position - camera.target).magnitude()
            })
            .expect("driver is running")
            .output;

        let initial = cgmath::Vector3::new(0.0f32, 1.0, 7.0).magnitude();
        assert!(distance > initial);
    }

    #[test]
    fn stop_returns_to_idle() {
        let (mut driver, mut scene, mut controls) = setup();
        driver.start();
        assert_eq!(driver.state(), DriverState::Running);
        driver.stop();
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(driver.tick(&mut scene, &mut controls, |_| ()).is_none());
    }
}
