use crate::{
    data_structures::{
        model::{Geometry, GeometryId},
        scene_graph::Node,
        texture::{Texture, TextureHandle},
    },
    resources::ModelData,
};

/// GPU copies of every geometry and texture the scene references.
///
/// Nodes refer to entries by [`GeometryId`] / [`TextureHandle`]; entries are
/// never removed, so ids stay valid for the lifetime of the store.
#[derive(Debug, Default)]
pub struct AssetStore {
    geometries: Vec<Geometry>,
    textures: Vec<Texture>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `model` and returns its node tree with ids pointing into the
    /// store.
    pub fn add_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, model: ModelData) -> Node {
        let geometry_offset = self.geometries.len();
        let texture_offset = self.textures.len();

        self.geometries
            .extend(model.geometries.iter().map(|geometry| geometry.upload(device)));
        for (idx, img) in model.images.iter().enumerate() {
            let label = format!("model_texture_{idx}");
            self.textures
                .push(Texture::from_image(device, queue, img, Some(&label)));
        }

        let mut root = model.root;
        root.offset_resources(geometry_offset, texture_offset);
        root
    }

    /// Uploads a colour texture (sRGB) and returns its handle.
    pub fn add_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: &str,
    ) -> TextureHandle {
        self.textures
            .push(Texture::from_image(device, queue, img, Some(label)));
        TextureHandle(self.textures.len() - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.0)
    }
}
