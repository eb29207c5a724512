//! The lit scene pass: draws every visible mesh into the HDR scene target.

use wgpu::util::DeviceExt;

use crate::{
    camera::CameraResources,
    data_structures::{
        material::{Material, MaterialUniform},
        model::{self, Geometry, Vertex},
        scene_graph::NodeKind,
        texture::{Texture, TextureHandle},
        transform::{Transform, TransformRaw},
    },
    pipelines::light::LightResources,
    render::{Frame, Pass, RenderTargets},
    resources::AssetStore,
    scene::Scene,
};

/// Per-mesh GPU state, created by the scene pass on first draw.
#[derive(Clone, Debug)]
pub struct MeshGpu {
    instance_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    // maps the bind group was built with
    maps: [Option<TextureHandle>; 2],
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(1),
            sampler(2),
            texture(3),
            sampler(4),
        ],
        label: Some("material_bind_group_layout"),
    })
}

pub fn mk_scene_pipeline(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
    material_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[
            camera_bind_group_layout,
            light_bind_group_layout,
            material_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "Scene Pipeline",
        &render_pipeline_layout,
        Texture::HDR_FORMAT,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(Texture::DEPTH_FORMAT),
        &[model::ModelVertex::desc(), TransformRaw::desc()],
        shader,
    )
}

/// Shared by every pipeline of the crate: `vs_main`/`fs_main` entry points,
/// triangle lists with back-face culling, one colour target.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

struct Draw<'a> {
    geometry: &'a Geometry,
    instance: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    camera: CameraResources,
    light: LightResources,
    material_layout: wgpu::BindGroupLayout,
    // bound in place of a missing map
    white: Texture,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let camera = CameraResources::new(device);
        let light = LightResources::new(device);
        let material_layout = material_layout(device);
        let pipeline = mk_scene_pipeline(
            device,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &material_layout,
        );
        Self {
            pipeline,
            camera,
            light,
            material_layout,
            white: Texture::create_solid([255; 4], "white_texture", device, queue),
        }
    }

    fn map_view<'a>(&'a self, assets: &'a AssetStore, map: Option<TextureHandle>) -> &'a Texture {
        map.and_then(|handle| assets.texture(handle))
            .unwrap_or(&self.white)
    }

    fn material_bind_group(
        &self,
        device: &wgpu::Device,
        assets: &AssetStore,
        buffer: &wgpu::Buffer,
        maps: [Option<TextureHandle>; 2],
    ) -> wgpu::BindGroup {
        let base = self.map_view(assets, maps[0]);
        let emissive = self.map_view(assets, maps[1]);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&base.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&base.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&emissive.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&emissive.sampler),
                },
            ],
            label: Some("material_bind_group"),
        })
    }

    /// Creates or refreshes the GPU state of one mesh for this frame.
    fn sync_mesh(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        assets: &AssetStore,
        material: &mut Material,
        slot: &mut Option<MeshGpu>,
        world: &Transform,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let maps = [material.base_color_map(), material.emissive_map()];
        let dirty = material.take_needs_update();
        let instance = world.to_raw();

        let gpu = match slot.take() {
            Some(mut gpu) => {
                if dirty {
                    queue.write_buffer(
                        &gpu.material_buffer,
                        0,
                        bytemuck::cast_slice(&[material.to_uniform()]),
                    );
                    if gpu.maps != maps {
                        gpu.bind_group =
                            self.material_bind_group(device, assets, &gpu.material_buffer, maps);
                        gpu.maps = maps;
                    }
                }
                queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[instance]));
                gpu
            }
            None => {
                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Instance Buffer"),
                    contents: bytemuck::cast_slice(&[instance]),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                let uniform: MaterialUniform = material.to_uniform();
                let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Material Buffer"),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = self.material_bind_group(device, assets, &material_buffer, maps);
                MeshGpu {
                    instance_buffer,
                    material_buffer,
                    bind_group,
                    maps,
                }
            }
        };
        let bound = (gpu.instance_buffer.clone(), gpu.bind_group.clone());
        *slot = Some(gpu);
        bound
    }
}

impl Pass for ScenePass {
    fn label(&self) -> &'static str {
        "scene"
    }

    fn set_size(&mut self, _device: &wgpu::Device, _targets: &RenderTargets) {}

    fn render(&mut self, frame: &mut Frame<'_>, scene: &mut Scene, assets: &AssetStore) {
        let ambient = scene.ambient_irradiance();
        self.light.write(frame.queue, ambient);

        let (root, camera) = scene.renderables_mut();
        self.camera.write(frame.queue, camera);

        let mut draws = Vec::new();
        root.visit_visible_mut(&Transform::default(), &mut |node, world| {
            let NodeKind::Mesh(mesh) = &mut node.kind else {
                return;
            };
            let Some(geometry) = assets.geometry(mesh.geometry) else {
                log::warn!("Mesh references unknown geometry {:?}", mesh.geometry);
                return;
            };
            let (instance, bind_group) = self.sync_mesh(
                frame.device,
                frame.queue,
                assets,
                &mut mesh.material,
                &mut mesh.gpu,
                world,
            );
            draws.push(Draw {
                geometry,
                instance,
                bind_group,
            });
        });

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.targets.scene.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &frame.targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &self.light.bind_group, &[]);
        for draw in &draws {
            render_pass.set_bind_group(2, &draw.bind_group, &[]);
            render_pass.set_vertex_buffer(0, draw.geometry.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, draw.instance.slice(..));
            render_pass.set_index_buffer(
                draw.geometry.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..draw.geometry.num_elements, 0, 0..1);
        }
    }
}
