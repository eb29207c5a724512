//! Loading models and textures from external files.
//!
//! Loading runs in two stages. The async, GPU-free stage fetches and decodes
//! a glTF/GLB into [`ModelData`]: a node tree whose meshes reference geometry
//! and images by index into the same `ModelData`. The second stage runs on the
//! event-loop thread: [`AssetStore::add_model`] uploads the data and re-bases
//! those indices onto the store.

use std::collections::HashMap;

use anyhow::Context;

use crate::{
    data_structures::{
        material::{Color, Material},
        model::{GeometryData, GeometryId},
        scene_graph::Node,
        texture::TextureHandle,
        transform::Transform,
    },
    error::{AssetLoadError, WithAssetPath},
    resources::{
        mesh::read_primitive,
        texture::{decode_image, load_binary},
    },
};

pub mod mesh;
pub mod store;
pub mod texture;

pub use store::AssetStore;
pub use texture::load_image;

/// A decoded model that has not been uploaded yet.
#[derive(Debug)]
pub struct ModelData {
    pub root: Node,
    pub geometries: Vec<GeometryData>,
    pub images: Vec<image::DynamicImage>,
}

impl ModelData {
    pub fn mesh_count(&self) -> usize {
        self.root.meshes().len()
    }
}

/// Outcome of loading the model and its emissive map side by side.
#[derive(Debug)]
pub struct LoadedAssets {
    pub model: Result<ModelData, AssetLoadError>,
    pub emissive_map: Result<image::DynamicImage, AssetLoadError>,
}

/// Loads the model and the emissive map concurrently. Each load is attempted
/// once; a failure of one does not cancel the other.
pub async fn load_assets(model_path: &str, emissive_map_path: &str) -> LoadedAssets {
    let (model, emissive_map) =
        futures::join!(load_model(model_path), load_image(emissive_map_path));
    LoadedAssets {
        model,
        emissive_map,
    }
}

/// Fetches a `.glb` or `.gltf` file together with the buffers and images it
/// references by relative URI.
pub async fn load_model(file_name: &str) -> Result<ModelData, AssetLoadError> {
    log::info!("Loading model {file_name}");
    let model = fetch_gltf(file_name).await.with_asset_path(file_name)?;
    log::info!(
        "Loaded {file_name}: {} meshes, {} images",
        model.mesh_count(),
        model.images.len()
    );
    Ok(model)
}

async fn fetch_gltf(file_name: &str) -> anyhow::Result<ModelData> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().context("GLB binary chunk missing")?,
            gltf::buffer::Source::Uri(uri) => load_binary(&resolve_uri(file_name, uri)?).await?,
        };
        buffers.push(data);
    }

    let mut images = Vec::new();
    for image in gltf.images() {
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                decode_image(view_bytes(&buffers, &view)?, Some(mime_type))?
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let bytes = load_binary(&resolve_uri(file_name, uri)?).await?;
                decode_image(&bytes, mime_type)?
            }
        };
        images.push(decoded);
    }

    build_model(file_name, &gltf.document, &buffers, images)
}

/// Parses a self-contained glTF (a GLB, or JSON without external buffers and
/// images) that is already in memory.
pub fn parse_gltf(label: &str, bytes: &[u8]) -> anyhow::Result<ModelData> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let buffers = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().context("GLB binary chunk missing"),
            gltf::buffer::Source::Uri(uri) => {
                anyhow::bail!("external buffer `{uri}` can only be resolved by `load_model`")
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let images = gltf
        .images()
        .map(|image| match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                decode_image(view_bytes(&buffers, &view)?, Some(mime_type))
            }
            gltf::image::Source::Uri { uri, .. } => {
                anyhow::bail!("external image `{uri}` can only be resolved by `load_model`")
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    build_model(label, &gltf.document, &buffers, images)
}

/// Resolves `uri` relative to the directory of `base`.
fn resolve_uri(base: &str, uri: &str) -> anyhow::Result<String> {
    if uri.starts_with("data:") {
        anyhow::bail!("embedded data URIs are not supported");
    }
    Ok(match base.rfind('/') {
        Some(idx) => format!("{}/{}", &base[..idx], uri),
        None => uri.to_string(),
    })
}

/// The bytes a buffer view covers.
fn view_bytes<'a>(buffers: &'a [Vec<u8>], view: &gltf::buffer::View) -> anyhow::Result<&'a [u8]> {
    let buffer = buffers
        .get(view.buffer().index())
        .context("buffer view points at a missing buffer")?;
    let start = view.offset();
    buffer
        .get(start..start + view.length())
        .context("buffer view exceeds its buffer")
}

fn build_model(
    label: &str,
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    images: Vec<image::DynamicImage>,
) -> anyhow::Result<ModelData> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF contains no scene")?;

    let mut builder = TreeBuilder {
        buffers,
        image_count: images.len(),
        geometries: Vec::new(),
        primitives: HashMap::new(),
    };
    let mut root = Node::group().with_name(scene.name().unwrap_or(label));
    for node in scene.nodes() {
        root.add_child(builder.node(&node)?);
    }

    Ok(ModelData {
        root,
        geometries: builder.geometries,
        images,
    })
}

struct TreeBuilder<'a> {
    buffers: &'a [Vec<u8>],
    image_count: usize,
    geometries: Vec<GeometryData>,
    // (mesh, primitive) -> geometry, so shared meshes are read once
    primitives: HashMap<(usize, usize), GeometryId>,
}

impl TreeBuilder<'_> {
    fn node(&mut self, node: &gltf::Node) -> anyhow::Result<Node> {
        let (translation, rotation, scale) = node.transform().decomposed();
        let mut out = match node.mesh() {
            Some(mesh) => self.mesh(&mesh)?,
            None => Node::group(),
        };
        out.name = node.name().map(str::to_string);
        out.transform = Transform::from_trs(translation, rotation, scale);
        for child in node.children() {
            out.add_child(self.node(&child)?);
        }
        Ok(out)
    }

    /// A single primitive becomes a mesh node, several become a group of them.
    fn mesh(&mut self, mesh: &gltf::Mesh) -> anyhow::Result<Node> {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let key = (mesh.index(), primitive.index());
            let geometry = match self.primitives.get(&key) {
                Some(id) => *id,
                None => {
                    let name = format!("{}#{}", mesh.name().unwrap_or("mesh"), primitive.index());
                    let id = GeometryId(self.geometries.len());
                    self.geometries.push(read_primitive(&name, &primitive, self.buffers)?);
                    self.primitives.insert(key, id);
                    id
                }
            };
            primitives.push(Node::mesh(geometry, self.material(&primitive.material())));
        }

        if primitives.len() == 1 {
            Ok(primitives.remove(0))
        } else {
            let mut group = Node::group();
            primitives.into_iter().for_each(|p| group.add_child(p));
            Ok(group)
        }
    }

    fn texture(&self, texture: gltf::Texture) -> Option<TextureHandle> {
        let index = texture.source().index();
        if index < self.image_count {
            Some(TextureHandle(index))
        } else {
            log::warn!("Texture references missing image {index}");
            None
        }
    }

    fn material(&self, material: &gltf::Material) -> Material {
        let pbr = material.pbr_metallic_roughness();
        let base_map = pbr
            .base_color_texture()
            .and_then(|info| self.texture(info.texture()));
        let mut out = Material::new(pbr.base_color_factor(), base_map, pbr.metallic_factor());

        let emissive = material.emissive_factor();
        if emissive != [0.0; 3] {
            out.set_emissive(Color::from(emissive));
        }
        if let Some(info) = material.emissive_texture() {
            out.set_emissive_map(self.texture(info.texture()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_resolve_next_to_the_model() {
        assert_eq!(
            resolve_uri("models/floppy.gltf", "floppy.bin").unwrap(),
            "models/floppy.bin"
        );
        assert_eq!(resolve_uri("floppy.gltf", "tex/a.png").unwrap(), "tex/a.png");
        assert!(resolve_uri("floppy.gltf", "data:application/octet-stream;base64,AAAA").is_err());
    }

    #[test]
    fn garbage_is_not_a_model() {
        assert!(parse_gltf("garbage", b"definitely not gltf").is_err());
    }

    #[test]
    fn json_without_scene_is_rejected() {
        let json = br#"{"asset":{"version":"2.0"}}"#;
        let err = parse_gltf("empty", json).unwrap_err();
        assert!(err.to_string().contains("no scene"));
    }

    #[test]
    fn nodes_without_meshes_become_groups() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"name": "Scene", "nodes": [0]}],
            "nodes": [
                {"name": "pivot", "translation": [1.0, 2.0, 3.0], "children": [1]},
                {"name": "leaf"}
            ]
        }"#;
        let model = parse_gltf("empty", json).unwrap();

        assert_eq!(model.root.name.as_deref(), Some("Scene"));
        let pivot = &model.root.children[0];
        assert_eq!(pivot.name.as_deref(), Some("pivot"));
        assert_eq!(pivot.transform.position, cgmath::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(pivot.children[0].name.as_deref(), Some("leaf"));
        assert_eq!(model.mesh_count(), 0);
    }

    #[tokio::test]
    async fn missing_model_reports_its_path() {
        let err = load_model("models/nope.glb").await.unwrap_err();
        assert_eq!(err.path, "models/nope.glb");
    }
}
