//! Application event loop.
//!
//! [`run`] opens a window (or binds the page canvas on the web), brings up the
//! GPU context, starts loading the model and the emissive map in the
//! background and renders a frame on every redraw until the window closes.
//!
//! # Lifecycle
//!
//! 1. `resumed`: create the window and the [`AppState`]; kick off asset loading
//! 2. `user_event(AssetsLoaded)`: upload the assets, apply the glow and
//!    register the intensity control
//! 3. `window_event(RedrawRequested)`: tick the [`AnimationDriver`], which
//!    updates controls and motion and renders through the [`Composer`]
//! 4. `window_event(CloseRequested)`: stop the driver and exit

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    animation::{AnimationDriver, DriverState},
    camera::Camera,
    config::SceneConfig,
    context::Context,
    controls::OrbitControls,
    data_structures::material::Color,
    emissive::{EmissiveParams, apply_emissive, set_emissive_intensity},
    panel::{NumericControl, Panel},
    render::Composer,
    resources::{AssetStore, LoadedAssets, load_assets},
    scene::Scene,
    viewport::Viewport,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Panel key of the emissive intensity control.
pub const EMISSIVE_INTENSITY: &str = "emissiveIntensity";

/// Panel steps applied per arrow key press.
const KEY_NUDGE_STEPS: i32 = 10;

/// Everything that exists once the GPU context is up.
#[derive(Debug)]
pub struct AppState {
    pub ctx: Context,
    pub composer: Composer,
    pub assets: AssetStore,
    pub scene: Scene,
    pub controls: OrbitControls,
    pub driver: AnimationDriver,
    pub panel: Panel,
    pub viewport: Viewport,
    config: SceneConfig,
}

impl AppState {
    pub async fn new(window: Arc<Window>, config: SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let viewport = Viewport::from_physical(size, window.scale_factor(), config.max_pixel_ratio);

        let mut ctx = Context::new(window).await?;
        ctx.configure(viewport.drawing_size());

        let composer = Composer::new(&ctx, &config);
        let scene = Scene::new(&config, viewport.aspect());
        let controls = OrbitControls::new(&config.orbit, scene.camera(), size.height as f32);

        Ok(Self {
            ctx,
            composer,
            assets: AssetStore::new(),
            scene,
            controls,
            driver: AnimationDriver::new(config.float_amplitude),
            panel: Panel::new(config.title.clone()),
            viewport,
            config,
        })
    }

    /// Brings surface, render targets, camera aspect and controls in line
    /// with the window. Repeating the same size does nothing.
    pub fn resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        let next = Viewport::from_physical(size, scale_factor, self.config.max_pixel_ratio);
        let Some(drawing) = fit_view(
            &mut self.viewport,
            next,
            self.scene.camera_mut(),
            &mut self.controls,
            size.height,
        ) else {
            return;
        };
        self.ctx.configure(drawing);
        self.composer
            .set_size(&self.ctx.device, drawing.width, drawing.height);
        log::debug!(
            "Resized to {}x{} @{}",
            next.width,
            next.height,
            next.pixel_ratio
        );
        // restarts the frame loop after a minimise
        self.ctx.window.request_redraw();
    }

    /// Continuation of the background load. A missing model leaves the scene
    /// empty; a missing emissive map keeps the model without one.
    pub fn on_assets_loaded(&mut self, loaded: LoadedAssets) {
        let model = match loaded.model {
            Ok(model) => model,
            Err(e) => {
                log::error!("{e}");
                if let Err(e) = loaded.emissive_map {
                    log::error!("{e}");
                }
                return;
            }
        };
        let emissive_map = match loaded.emissive_map {
            Ok(img) => Some(self.assets.add_texture(
                &self.ctx.device,
                &self.ctx.queue,
                &img,
                "emissive_map",
            )),
            Err(e) => {
                log::error!("{e}");
                None
            }
        };

        let mut root = self
            .assets
            .add_model(&self.ctx.device, &self.ctx.queue, model);
        let touched = apply_emissive(
            &mut root,
            &EmissiveParams {
                color: Color::from_hex(self.config.emissive.color),
                map: emissive_map,
                intensity: self.config.emissive.intensity,
            },
        );
        log::info!("Emissive glow applied to {touched} meshes");
        self.scene.attach_model(root);
        self.panel.add(intensity_control(&self.config));
    }

    /// One frame. Surface loss is repaired by reconfiguring; the frame is
    /// skipped in that case.
    fn redraw(&mut self) {
        if self.viewport.is_empty() {
            return;
        }
        let Self {
            ctx,
            composer,
            assets,
            scene,
            controls,
            driver,
            ..
        } = self;
        let tick = driver.tick(scene, controls, |scene| composer.render(ctx, scene, assets));

        match tick.map(|tick| tick.output) {
            Some(Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = self.ctx.size();
                self.ctx.configure(size);
            }
            Some(Err(e)) => log::error!("Dropped frame: {e}"),
            Some(Ok(())) | None => (),
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let steps = match event.logical_key {
            Key::Named(NamedKey::ArrowUp) => KEY_NUDGE_STEPS,
            Key::Named(NamedKey::ArrowDown) => -KEY_NUDGE_STEPS,
            _ => return,
        };
        if let Some(true) = self.panel.nudge(EMISSIVE_INTENSITY, steps, &mut self.scene) {
            if let Some(control) = self.panel.get(EMISSIVE_INTENSITY) {
                log::info!("{} = {:.2}", control.label(), control.value());
            }
        }
    }
}

/// Applies `next` to the CPU side of the view: camera aspect, controls and
/// the stored viewport. Returns the drawing size the surface and render
/// targets must follow, or `None` when `next` is unchanged or has no area.
pub fn fit_view(
    current: &mut Viewport,
    next: Viewport,
    camera: &mut Camera,
    controls: &mut OrbitControls,
    physical_height: u32,
) -> Option<PhysicalSize<u32>> {
    if next == *current || next.is_empty() {
        return None;
    }
    *current = next;
    camera.set_aspect(next.aspect());
    controls.set_viewport_height(physical_height as f32);
    Some(next.drawing_size())
}

/// Whether another frame should be scheduled after a redraw. An empty
/// viewport (minimised window) idles until the next resize.
pub fn keeps_redrawing(viewport: &Viewport, driver: &AnimationDriver) -> bool {
    !viewport.is_empty() && driver.state() == DriverState::Running
}

/// The emissive intensity control, wired to every mesh of the model.
pub fn intensity_control(config: &SceneConfig) -> NumericControl {
    let range = &config.intensity_control;
    NumericControl::new(EMISSIVE_INTENSITY, config.emissive.intensity)
        .min(range.min)
        .max(range.max)
        .step(range.step)
        .name("Intensity")
        .on_change(|value, scene: &mut Scene| {
            if let Some(model) = scene.model_mut() {
                set_emissive_intensity(model, value);
            }
        })
}

pub enum AppEvent {
    /// The GPU context finished initialising (web only, where it cannot be
    /// awaited inside `resumed`).
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<AppState>),
    AssetsLoaded(Box<LoadedAssets>),
    SetEmissiveIntensity(f32),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::AssetsLoaded(_) => f.write_str("AssetsLoaded"),
            Self::SetEmissiveIntensity(value) => {
                f.debug_tuple("SetEmissiveIntensity").field(value).finish()
            }
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    config: SceneConfig,
    state: Option<AppState>,
}

impl App {
    fn new(
        event_loop: &EventLoop<AppEvent>,
        config: SceneConfig,
        #[cfg(not(target_arch = "wasm32"))] async_runtime: tokio::runtime::Runtime,
    ) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy: event_loop.create_proxy(),
            config,
            state: None,
        }
    }

    /// Starts the background load of model and emissive map.
    fn load_assets(&self) {
        let proxy = self.proxy.clone();
        let model_path = self.config.model_path.clone();
        let emissive_map_path = self.config.emissive_map_path.clone();
        let fut = async move {
            let loaded = load_assets(&model_path, &emissive_map_path).await;
            if proxy
                .send_event(AppEvent::AssetsLoaded(Box::new(loaded)))
                .is_err()
            {
                log::warn!("Event loop closed before assets finished loading");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(fut);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(fut);
    }

    fn start(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        let scale_factor = state.ctx.window.scale_factor();
        state.resize(size, scale_factor);
        state.driver.start();
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.load_assets();
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_transparent(true);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_SELECTOR: &str = "canvas.webgl";

            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .query_selector(CANVAS_SELECTOR)
                .unwrap_throw()
                .unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init_future = AppState::new(window, self.config.clone());

        #[cfg(not(target_arch = "wasm32"))]
        match self.async_runtime.block_on(init_future) {
            Ok(state) => self.start(state),
            Err(e) => {
                log::error!("GPU initialisation failed: {e:#}");
                event_loop.exit();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy
                            .send_event(AppEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::warn!("Event loop closed during initialisation");
                        }
                    }
                    Err(e) => log::error!("GPU initialisation failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            AppEvent::Initialized(state) => self.start(*state),
            AppEvent::AssetsLoaded(loaded) => {
                if let Some(state) = &mut self.state {
                    state.on_assets_loaded(*loaded);
                }
            }
            AppEvent::SetEmissiveIntensity(value) => {
                if let Some(state) = &mut self.state {
                    if state
                        .panel
                        .set(EMISSIVE_INTENSITY, value, &mut state.scene)
                        .is_none()
                    {
                        log::warn!("Emissive intensity control is not registered yet");
                    }
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                state.driver.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale_factor = state.ctx.window.scale_factor();
                state.resize(size, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = state.ctx.window.inner_size();
                state.resize(size, scale_factor);
            }
            WindowEvent::RedrawRequested => {
                state.redraw();
                if keeps_redrawing(&state.viewport, &state.driver) {
                    state.ctx.window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { ref event, .. } => state.handle_key(event),
            WindowEvent::MouseInput { .. }
            | WindowEvent::CursorMoved { .. }
            | WindowEvent::CursorLeft { .. }
            | WindowEvent::MouseWheel { .. } => state.controls.handle_window_events(&event),
            _ => (),
        }
    }
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static PROXY: std::cell::RefCell<Option<EventLoopProxy<AppEvent>>> =
        const { std::cell::RefCell::new(None) };
}

/// Sets the emissive intensity from the page, e.g. from a slider.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = setEmissiveIntensity)]
pub fn set_emissive_intensity_from_js(value: f32) {
    PROXY.with_borrow(|proxy| match proxy {
        Some(proxy) => {
            if proxy
                .send_event(AppEvent::SetEmissiveIntensity(value))
                .is_err()
            {
                log::warn!("Event loop is not running");
            }
        }
        None => log::warn!("setEmissiveIntensity called before start"),
    });
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start_web() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

/// Runs the visual with the default configuration.
pub fn run() -> anyhow::Result<()> {
    run_with(SceneConfig::default())
}

pub fn run_with(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;

    #[cfg(not(target_arch = "wasm32"))]
    let mut app = App::new(&event_loop, config, tokio::runtime::Runtime::new()?);

    #[cfg(target_arch = "wasm32")]
    let mut app = {
        let app = App::new(&event_loop, config);
        PROXY.with_borrow_mut(|proxy| *proxy = Some(app.proxy.clone()));
        app
    };

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{material::Material, model::GeometryId, scene_graph::Node};

    fn scene_with_model(config: &SceneConfig) -> Scene {
        let mut scene = Scene::new(config, 1.0);
        let mut model = Node::group().with_name("floppy");
        model.add_child(Node::mesh(GeometryId(0), Material::default()));
        model.add_child(Node::mesh(GeometryId(1), Material::default()));
        scene.attach_model(model);
        scene
    }

    fn intensities(scene: &Scene) -> Vec<f32> {
        scene
            .root()
            .meshes()
            .iter()
            .map(|mesh| mesh.material.emissive_intensity())
            .collect()
    }

    #[test]
    fn intensity_control_uses_configured_range() {
        let config = SceneConfig::default();
        let control = intensity_control(&config);

        assert_eq!(control.key(), EMISSIVE_INTENSITY);
        assert_eq!(control.label(), "Intensity");
        assert_eq!(control.value(), 5.0);
    }

    #[test]
    fn intensity_control_drives_every_mesh() {
        let config = SceneConfig::default();
        let mut scene = scene_with_model(&config);
        let mut panel = Panel::new(config.title.clone());
        panel.add(intensity_control(&config));

        assert_eq!(panel.set(EMISSIVE_INTENSITY, 2.5, &mut scene), Some(true));
        assert_eq!(intensities(&scene), vec![2.5, 2.5]);

        // above the range
        panel.set(EMISSIVE_INTENSITY, 9.0, &mut scene);
        assert_eq!(intensities(&scene), vec![5.0, 5.0]);
    }

    #[test]
    fn intensity_control_without_model_is_harmless() {
        let config = SceneConfig::default();
        let mut scene = Scene::new(&config, 1.0);
        let mut control = intensity_control(&config);

        assert!(control.set(1.0, &mut scene));
        assert_eq!(control.value(), 1.0);
    }

    fn view(config: &SceneConfig) -> (Viewport, Camera, OrbitControls) {
        let viewport = Viewport::new(800.0, 600.0, 1.0, config.max_pixel_ratio);
        let camera = Camera::new(&config.camera, viewport.aspect());
        let controls = OrbitControls::new(&config.orbit, &camera, 600.0);
        (viewport, camera, controls)
    }

    #[test]
    fn repeated_resize_is_a_no_op() {
        let config = SceneConfig::default();
        let (mut viewport, mut camera, mut controls) = view(&config);
        let next = Viewport::new(1280.0, 720.0, 1.5, config.max_pixel_ratio);

        let drawing = fit_view(&mut viewport, next, &mut camera, &mut controls, 1080);
        assert_eq!(drawing, Some(PhysicalSize::new(1920, 1080)));
        let aspect = camera.aspect();
        let projection = camera.projection();

        let again = fit_view(&mut viewport, next, &mut camera, &mut controls, 1080);
        assert_eq!(again, None);
        assert_eq!(camera.aspect(), aspect);
        assert_eq!(camera.projection(), projection);
        assert_eq!(viewport.drawing_size(), PhysicalSize::new(1920, 1080));
    }

    #[test]
    fn empty_resize_keeps_the_last_view() {
        let config = SceneConfig::default();
        let (mut viewport, mut camera, mut controls) = view(&config);
        let before = viewport;
        let aspect = camera.aspect();

        let minimised = Viewport::new(0.0, 0.0, 1.0, config.max_pixel_ratio);
        assert_eq!(fit_view(&mut viewport, minimised, &mut camera, &mut controls, 0), None);
        assert_eq!(viewport, before);
        assert_eq!(camera.aspect(), aspect);
    }

    #[test]
    fn redraw_loop_idles_while_minimised() {
        let config = SceneConfig::default();
        let mut driver = AnimationDriver::new(config.float_amplitude);
        let visible = Viewport::new(800.0, 600.0, 1.0, config.max_pixel_ratio);
        let minimised = Viewport::new(800.0, 0.0, 1.0, config.max_pixel_ratio);

        assert!(!keeps_redrawing(&visible, &driver));
        driver.start();
        assert!(keeps_redrawing(&visible, &driver));
        assert!(!keeps_redrawing(&minimised, &driver));
    }
}
