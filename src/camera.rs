//! Perspective camera and its GPU uniform.

use cgmath::{Deg, Matrix4, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera looking from `position` at `target` with +Y up.
///
/// The projection matrix is cached and only recomputed when one of its
/// inputs changes, so every aspect change must go through [`Camera::set_aspect`].
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    fov_y: Deg<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            position: Point3::from(config.position),
            target: Point3::from(config.target),
            fov_y: Deg(config.fov_y_deg),
            aspect,
            near: config.near,
            far: config.far,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn fov_y(&self) -> Deg<f32> {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    fn update_projection_matrix(&mut self) {
        self.projection =
            OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fov_y, self.aspect, self.near, self.far);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform buffer + bind group holding the camera for the scene shader.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_change_recomputes_projection() {
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        let square = camera.projection();

        camera.set_aspect(2.0);
        assert_ne!(camera.projection(), square);
        // x scale is f / aspect
        assert!((camera.projection().x.x * 2.0 - square.x.x).abs() < 1e-5);

        camera.set_aspect(1.0);
        assert_eq!(camera.projection(), square);
    }

    #[test]
    fn defaults_look_at_origin_from_front() {
        let camera = Camera::new(&CameraConfig::default(), 16.0 / 9.0);
        assert_eq!(camera.position, Point3::new(0.0, 1.0, 7.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.fov_y(), Deg(75.0));
    }
}
