//! Scene assembly: the root group, its ambient light, the camera and the slot
//! the loaded model is attached to.

use crate::{
    camera::Camera,
    config::SceneConfig,
    data_structures::scene_graph::{AmbientLight, Node, NodeKind},
};

/// Where the model sits among the root's children, once it has arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSlot {
    Unloaded,
    Loaded(usize),
}

#[derive(Debug)]
pub struct Scene {
    root: Node,
    camera: Camera,
    model: ModelSlot,
}

impl Scene {
    /// An empty scene lit by the configured ambient light.
    pub fn new(config: &SceneConfig, aspect: f32) -> Self {
        let mut root = Node::group().with_name("scene");
        root.add_child(
            Node::light(AmbientLight::new(
                config.ambient_light.color,
                config.ambient_light.intensity,
            ))
            .with_name("ambient_light"),
        );
        Self {
            root,
            camera: Camera::new(&config.camera, aspect),
            model: ModelSlot::Unloaded,
        }
    }

    /// Adds `model` as a child of the root.
    ///
    /// Only the first attached model is tracked by [`Scene::model`]; later ones
    /// are still rendered as siblings.
    pub fn attach_model(&mut self, model: Node) {
        self.root.add_child(model);
        let index = self.root.children.len() - 1;
        match self.model {
            ModelSlot::Unloaded => self.model = ModelSlot::Loaded(index),
            ModelSlot::Loaded(first) => log::warn!(
                "A model is already attached at child {first}, adding another one as sibling"
            ),
        }
    }

    pub fn model_slot(&self) -> ModelSlot {
        self.model
    }

    pub fn model(&self) -> Option<&Node> {
        match self.model {
            ModelSlot::Loaded(index) => self.root.children.get(index),
            ModelSlot::Unloaded => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut Node> {
        match self.model {
            ModelSlot::Loaded(index) => self.root.children.get_mut(index),
            ModelSlot::Unloaded => None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// What a renderer needs to draw a frame.
    pub fn renderables(&self) -> (&Node, &Camera) {
        (&self.root, &self.camera)
    }

    /// Mutable split borrow, used by the scene pass which syncs GPU state
    /// into the nodes while reading the camera.
    pub(crate) fn renderables_mut(&mut self) -> (&mut Node, &Camera) {
        (&mut self.root, &self.camera)
    }

    /// Sum of all visible ambient lights.
    pub fn ambient_irradiance(&self) -> [f32; 3] {
        let mut total = [0.0; 3];
        sum_ambient(&self.root, &mut total);
        total
    }
}

fn sum_ambient(node: &Node, total: &mut [f32; 3]) {
    if !node.visible {
        return;
    }
    if let NodeKind::Light(light) = &node.kind {
        let irradiance = light.irradiance();
        total[0] += irradiance.r;
        total[1] += irradiance.g;
        total[2] += irradiance.b;
    }
    for child in &node.children {
        sum_ambient(child, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{material::Material, model::GeometryId};

    fn model(name: &str) -> Node {
        let mut group = Node::group().with_name(name);
        group.add_child(Node::mesh(GeometryId(0), Material::default()));
        group
    }

    #[test]
    fn new_scene_holds_only_the_light() {
        let scene = Scene::new(&SceneConfig::default(), 1.0);

        assert_eq!(scene.model_slot(), ModelSlot::Unloaded);
        assert!(scene.model().is_none());
        assert_eq!(scene.root().children.len(), 1);
        assert!(matches!(scene.root().children[0].kind, NodeKind::Light(_)));
    }

    #[test]
    fn first_attach_fills_the_slot() {
        let mut scene = Scene::new(&SceneConfig::default(), 1.0);
        scene.attach_model(model("floppy"));

        assert_eq!(scene.model_slot(), ModelSlot::Loaded(1));
        assert_eq!(scene.model().and_then(|m| m.name.as_deref()), Some("floppy"));
    }

    #[test]
    fn second_attach_adds_a_sibling() {
        let mut scene = Scene::new(&SceneConfig::default(), 1.0);
        scene.attach_model(model("first"));
        scene.attach_model(model("second"));

        assert_eq!(scene.root().children.len(), 3);
        assert_eq!(scene.model().and_then(|m| m.name.as_deref()), Some("first"));
        assert_eq!(scene.root().meshes().len(), 2);
    }

    #[test]
    fn ambient_light_uses_configured_intensity() {
        let scene = Scene::new(&SceneConfig::default(), 1.0);
        let [r, g, b] = scene.ambient_irradiance();

        for channel in [r, g, b] {
            assert!((channel - 2.1).abs() < 1e-4);
        }
    }

    #[test]
    fn hidden_lights_do_not_contribute() {
        let mut scene = Scene::new(&SceneConfig::default(), 1.0);
        scene.root_mut().children[0].visible = false;
        assert_eq!(scene.ambient_irradiance(), [0.0; 3]);
    }
}
