//! Render composition.
//!
//! A [`Composer`] owns an ordered list of [`Pass`]es and the offscreen
//! [`RenderTargets`] they share. Each frame the passes run in order on one
//! command encoder: the scene pass draws into the HDR scene target, the bloom
//! pass reads it and writes the final image to the surface.
//!
//! # Key types
//!
//! - [`Pass`] is the trait every stage of the chain implements
//! - [`Frame`] is what a pass gets to record its commands
//! - [`RenderTargets`] are the intermediate textures, recreated on resize
//!

use std::iter;

use crate::{
    config::SceneConfig,
    context::Context,
    data_structures::texture::Texture,
    pipelines::{basic::ScenePass, bloom::BloomPass},
    resources::AssetStore,
    scene::Scene,
};

/// Offscreen textures shared by all passes.
#[derive(Debug)]
pub struct RenderTargets {
    /// HDR colour of the lit scene.
    pub scene: Texture,
    pub depth: Texture,
    /// Ping-pong pair for the bloom chain at reduced resolution.
    pub bloom: [Texture; 2],
    pub size: [u32; 2],
    pub bloom_size: [u32; 2],
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, size: [u32; 2], bloom_scale: f32) -> Self {
        let size = target_size(size[0], size[1]);
        let bloom_size = scaled_size(size, bloom_scale);
        let bloom_target = |label| {
            Texture::create_render_target(device, bloom_size, Texture::HDR_FORMAT, label)
        };
        Self {
            scene: Texture::create_render_target(
                device,
                size,
                Texture::HDR_FORMAT,
                "scene_target",
            ),
            depth: Texture::create_depth_texture(device, size, "depth_texture"),
            bloom: [bloom_target("bloom_target_a"), bloom_target("bloom_target_b")],
            size,
            bloom_size,
        }
    }
}

/// Full-resolution target size for a `width` x `height` surface.
pub fn target_size(width: u32, height: u32) -> [u32; 2] {
    [width.max(1), height.max(1)]
}

/// Size of a target at `scale` of `size`, at least one pixel per side.
pub fn scaled_size(size: [u32; 2], scale: f32) -> [u32; 2] {
    let scale = |v: u32| ((v as f32 * scale).round() as u32).max(1);
    [scale(size[0]), scale(size[1])]
}

/// Everything a pass needs to record one frame.
pub struct Frame<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: wgpu::CommandEncoder,
    pub targets: &'a RenderTargets,
    /// The surface texture being presented this frame.
    pub output: &'a wgpu::TextureView,
}

/// One stage of the post-processing chain.
pub trait Pass {
    fn label(&self) -> &'static str;

    /// Called after the shared targets were recreated for a new size.
    fn set_size(&mut self, device: &wgpu::Device, targets: &RenderTargets);

    fn render(&mut self, frame: &mut Frame<'_>, scene: &mut Scene, assets: &AssetStore);
}

pub struct Composer {
    passes: Vec<Box<dyn Pass>>,
    targets: RenderTargets,
    bloom_scale: f32,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<_> = self.passes.iter().map(|p| p.label()).collect();
        f.debug_struct("Composer")
            .field("passes", &labels)
            .field("size", &self.targets.size)
            .finish()
    }
}

impl Composer {
    /// The scene pass followed by bloom, sized to the current surface.
    pub fn new(ctx: &Context, config: &SceneConfig) -> Self {
        let bloom_scale = config.bloom.resolution_scale;
        let targets = RenderTargets::new(
            &ctx.device,
            [ctx.config.width, ctx.config.height],
            bloom_scale,
        );
        let scene_pass = ScenePass::new(&ctx.device, &ctx.queue);
        let bloom_pass = BloomPass::new(&ctx.device, ctx.config.format, &config.bloom, &targets);
        Self {
            passes: vec![Box::new(scene_pass), Box::new(bloom_pass)],
            targets,
            bloom_scale,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.targets.size
    }

    /// Recreates the targets for `width` x `height` device pixels. Unchanged
    /// sizes are a no-op.
    pub fn set_size(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.targets.size == target_size(width, height) {
            return;
        }
        self.targets = RenderTargets::new(device, [width, height], self.bloom_scale);
        for pass in &mut self.passes {
            pass.set_size(device, &self.targets);
        }
        log::debug!("Render targets resized to {width}x{height}");
    }

    pub fn render(
        &mut self,
        ctx: &Context,
        scene: &mut Scene,
        assets: &AssetStore,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let mut frame = Frame {
            device: &ctx.device,
            queue: &ctx.queue,
            encoder,
            targets: &self.targets,
            output: &view,
        };
        for pass in &mut self.passes {
            pass.render(&mut frame, scene, assets);
        }

        ctx.queue.submit(iter::once(frame.encoder.finish()));
        ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bloom_targets_are_half_size() {
        assert_eq!(scaled_size([1600, 900], 0.5), [800, 450]);
    }

    #[test]
    fn scaled_targets_never_collapse() {
        assert_eq!(scaled_size([1, 1], 0.5), [1, 1]);
        assert_eq!(scaled_size([3, 0], 0.25), [1, 1]);
    }

    #[test]
    fn resizing_to_the_current_size_matches_the_stored_targets() {
        let size = target_size(1920, 1080);
        assert_eq!(target_size(size[0], size[1]), size);
        assert_eq!(scaled_size(size, 0.5), scaled_size(target_size(1920, 1080), 0.5));
        // a collapsed surface maps onto the 1x1 targets it already has
        assert_eq!(target_size(0, 0), target_size(1, 1));
    }
}
