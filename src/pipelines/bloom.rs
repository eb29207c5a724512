//! Bloom post-processing.
//!
//! Three stages, all drawn as a fullscreen triangle:
//! 1. a luminance pass keeps the bright parts of the scene target, written at
//!    reduced resolution into the first bloom target,
//! 2. a Kawase blur ping-pongs between the two bloom targets, one iteration
//!    per entry of the [`KernelSize`] sequence,
//! 3. a composite pass screen-blends the blurred result over the scene and
//!    writes the frame to the surface.

use wgpu::util::DeviceExt;

use crate::{
    config::BloomConfig,
    data_structures::texture::Texture,
    pipelines::basic::mk_render_pipeline,
    render::{Frame, Pass, RenderTargets},
    resources::AssetStore,
    scene::Scene,
};

/// Blur radius presets. Each maps to the sequence of Kawase offsets that is
/// run one after the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KernelSize {
    VerySmall,
    Small,
    Medium,
    #[default]
    Large,
    VeryLarge,
    Huge,
}

impl KernelSize {
    pub fn kernel(&self) -> &'static [u32] {
        match self {
            KernelSize::VerySmall => &[0, 0, 0],
            KernelSize::Small => &[0, 1, 1, 2],
            KernelSize::Medium => &[0, 1, 2, 2, 3],
            KernelSize::Large => &[0, 1, 2, 3, 4, 4, 5],
            KernelSize::VeryLarge => &[0, 1, 2, 3, 4, 5, 7, 8, 9, 10],
            KernelSize::Huge => &[0, 1, 2, 3, 4, 5, 7, 8, 9, 10, 11, 12, 13, 14],
        }
    }
}

/// Sample offset in uv units of one blur iteration with the given kernel value.
pub fn blur_offset(kernel: u32, target_size: [u32; 2]) -> [f32; 2] {
    let k = kernel as f32 + 0.5;
    [k / target_size[0].max(1) as f32, k / target_size[1].max(1) as f32]
}

/// Index of the bloom target holding the final blur result.
pub fn blur_result_index(iterations: usize) -> usize {
    iterations % 2
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn params_buffer(device: &wgpu::Device, label: &str, params: [f32; 4]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&params),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

fn mk_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    source: &'static str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        label,
        &pipeline_layout,
        format,
        Some(wgpu::BlendState::REPLACE),
        None,
        &[],
        shader,
    )
}

/// Bind groups that reference the current render targets.
#[derive(Debug)]
struct TargetBindings {
    luminance: wgpu::BindGroup,
    blur: Vec<wgpu::BindGroup>,
    composite: wgpu::BindGroup,
}

/// Size independent state the target bindings are built from.
#[derive(Debug)]
struct BloomLayouts {
    kernel: &'static [u32],
    input: wgpu::BindGroupLayout,
    composite: wgpu::BindGroupLayout,
    luminance_params: wgpu::Buffer,
    composite_params: wgpu::Buffer,
}

impl BloomLayouts {
    fn input_bind_group(
        &self,
        device: &wgpu::Device,
        input: &Texture,
        params: &wgpu::Buffer,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.input,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&input.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
            label: Some(label),
        })
    }

    fn bind(&self, device: &wgpu::Device, targets: &RenderTargets) -> TargetBindings {
        let luminance = self.input_bind_group(
            device,
            &targets.scene,
            &self.luminance_params,
            "bloom_luminance_bind_group",
        );
        let blur = self
            .kernel
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                let [x, y] = blur_offset(k, targets.bloom_size);
                let params = params_buffer(device, "Bloom Blur Params", [x, y, 0.0, 0.0]);
                self.input_bind_group(device, &targets.bloom[i % 2], &params, "bloom_blur_bind_group")
            })
            .collect();

        let bloom = &targets.bloom[blur_result_index(self.kernel.len())];
        let composite = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.composite,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.scene.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&targets.scene.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&bloom.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&bloom.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.composite_params.as_entire_binding(),
                },
            ],
            label: Some("bloom_composite_bind_group"),
        });

        TargetBindings {
            luminance,
            blur,
            composite,
        }
    }
}

#[derive(Debug)]
pub struct BloomPass {
    layouts: BloomLayouts,
    luminance_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    bindings: TargetBindings,
}

impl BloomPass {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        config: &BloomConfig,
        targets: &RenderTargets,
    ) -> Self {
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
            label: Some("bloom_input_layout"),
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                texture_entry(2),
                sampler_entry(3),
                uniform_entry(4),
            ],
            label: Some("bloom_composite_layout"),
        });

        let luminance_pipeline = mk_fullscreen_pipeline(
            device,
            "Bloom Luminance",
            &input_layout,
            Texture::HDR_FORMAT,
            concat!(include_str!("fullscreen.wgsl"), include_str!("luminance.wgsl")),
        );
        let blur_pipeline = mk_fullscreen_pipeline(
            device,
            "Bloom Blur",
            &input_layout,
            Texture::HDR_FORMAT,
            concat!(include_str!("fullscreen.wgsl"), include_str!("blur.wgsl")),
        );
        let composite_pipeline = mk_fullscreen_pipeline(
            device,
            "Bloom Composite",
            &composite_layout,
            output_format,
            concat!(include_str!("fullscreen.wgsl"), include_str!("composite.wgsl")),
        );

        let layouts = BloomLayouts {
            kernel: config.kernel_size.kernel(),
            input: input_layout,
            composite: composite_layout,
            luminance_params: params_buffer(
                device,
                "Bloom Luminance Params",
                [config.luminance_threshold, config.luminance_smoothing, 0.0, 0.0],
            ),
            composite_params: params_buffer(
                device,
                "Bloom Composite Params",
                [config.intensity, 0.0, 0.0, 0.0],
            ),
        };
        let bindings = layouts.bind(device, targets);

        Self {
            layouts,
            luminance_pipeline,
            blur_pipeline,
            composite_pipeline,
            bindings,
        }
    }
}

fn fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, bind_group, &[]);
    render_pass.draw(0..3, 0..1);
}

impl Pass for BloomPass {
    fn label(&self) -> &'static str {
        "bloom"
    }

    fn set_size(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bindings = self.layouts.bind(device, targets);
    }

    fn render(&mut self, frame: &mut Frame<'_>, _scene: &mut Scene, _assets: &AssetStore) {
        let targets = frame.targets;
        fullscreen(
            &mut frame.encoder,
            "Bloom Luminance Pass",
            &targets.bloom[0].view,
            &self.luminance_pipeline,
            &self.bindings.luminance,
        );
        for (i, bind_group) in self.bindings.blur.iter().enumerate() {
            fullscreen(
                &mut frame.encoder,
                "Bloom Blur Pass",
                &targets.bloom[(i + 1) % 2].view,
                &self.blur_pipeline,
                bind_group,
            );
        }
        fullscreen(
            &mut frame.encoder,
            "Bloom Composite Pass",
            frame.output,
            &self.composite_pipeline,
            &self.bindings.composite,
        );
    }
}
