use log::debug;

use crate::camera::PerspectiveCamera;
use crate::controls::ControlKind;
use crate::error::RegistryError;
use crate::input::InputState;
use crate::object::Object3D;
use crate::render::Renderer;
use crate::scene::{NodeRef, Scene};

/// Read-only view of the frame handed to per-object callbacks. The camera has
/// already been moved by this frame's control update.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub camera: &'a PerspectiveCamera,
    pub control: Option<ControlKind>,
    pub input: &'a InputState,
}

/// Per-frame callback receiving the object it was registered with, the frame
/// context and the frame delta.
pub type ObjectUpdate = Box<dyn FnMut(&mut Object3D, &FrameContext<'_>, f32) + Send>;

pub struct SceneObjectEntry {
    pub id: String,
    pub object: Object3D,
    update: Option<ObjectUpdate>,
}

impl SceneObjectEntry {
    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }
}

impl std::fmt::Debug for SceneObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObjectEntry")
            .field("id", &self.id)
            .field("object", &self.object.name)
            .field("has_update", &self.update.is_some())
            .finish()
    }
}

/// Owns every object drawn by the scene, keyed by id, in registration order.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    entries: Vec<SceneObjectEntry>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `object` under `id` and attaches it to the scene graph.
    ///
    /// Ids are never overwritten: a second registration under a live id fails and
    /// leaves the existing entry untouched.
    pub fn add(
        &mut self,
        scene: &mut Scene,
        id: impl Into<String>,
        object: Object3D,
        update: Option<ObjectUpdate>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.contains(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        scene.attach(NodeRef::Object(id.clone()));
        debug!("registry: added object {id}");
        self.entries.push(SceneObjectEntry { id, object, update });
        Ok(())
    }

    /// Detaches the object, releases its geometry and material buffers and drops the
    /// entry. Unknown ids are ignored.
    pub fn remove(&mut self, scene: &mut Scene, renderer: &mut dyn Renderer, id: &str) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.entries.remove(index);
        scene.detach(&NodeRef::Object(entry.id.clone()));
        for resource in entry.object.gpu_resources() {
            renderer.release(resource);
        }
        debug!("registry: removed object {id}");
        true
    }

    pub fn get(&self, id: &str) -> Option<&Object3D> {
        self.entry(id).map(|entry| &entry.object)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Object3D> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.object)
    }

    pub fn entry(&self, id: &str) -> Option<&SceneObjectEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Applies a mutation to the requested object.
    pub fn update<F, R>(&mut self, id: &str, updater: F) -> Option<R>
    where
        F: FnOnce(&mut Object3D) -> R,
    {
        self.get_mut(id).map(updater)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object3D)> {
        self.entries
            .iter()
            .map(|entry| (entry.id.as_str(), &entry.object))
    }

    /// Invokes every per-frame callback, in registration order.
    pub fn run_updates(&mut self, frame: &FrameContext<'_>, delta: f32) {
        for entry in &mut self.entries {
            if let Some(update) = entry.update.as_mut() {
                update(&mut entry.object, frame, delta);
            }
        }
    }

    /// Removes every entry, releasing their resources.
    pub fn clear(&mut self, scene: &mut Scene, renderer: &mut dyn Renderer) {
        for id in self.ids() {
            self.remove(scene, renderer, &id);
        }
    }
}
