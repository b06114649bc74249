//! # Shader Attachment
//!
//! An object is drawn by a shader when it carries `Renderable<S>` for that
//! shader's type. The marker's lifecycle hooks keep the [`ShaderAttachments`]
//! resource in sync, so each shader walks its own list instead of scanning
//! the whole world:
//!
//! ```text
//! insert(go, Renderable::<PhongShader>::new())  ─on_add──►  attachments[Phong] += go
//! remove / destroy                              ─on_remove► attachments[Phong] -= go
//! ```
//!
//! One object can carry markers for several shaders (a sphere drawn lit and
//! as a wireframe), and one shader serves many objects.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::ecs::{ComponentHooks, GameObject, World};

/// Attaches the object to every shader of type `S`.
pub struct Renderable<S: 'static> {
    // fn() -> S keeps the marker Send + Sync whatever S is.
    _shader: PhantomData<fn() -> S>,
}

impl<S: 'static> Renderable<S> {
    pub fn new() -> Self {
        Self {
            _shader: PhantomData,
        }
    }
}

impl<S: 'static> Default for Renderable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> Clone for Renderable<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: 'static> Copy for Renderable<S> {}

impl<S: 'static> fmt::Debug for Renderable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderable<{}>", std::any::type_name::<S>())
    }
}

/// Objects attached to each shader type, in attachment order.
#[derive(Default, Debug)]
pub struct ShaderAttachments {
    by_shader: HashMap<TypeId, Vec<GameObject>>,
}

impl ShaderAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach<S: 'static>(&mut self, object: GameObject) {
        let list = self.by_shader.entry(TypeId::of::<S>()).or_default();
        if !list.contains(&object) {
            list.push(object);
        }
    }

    pub fn detach<S: 'static>(&mut self, object: GameObject) {
        if let Some(list) = self.by_shader.get_mut(&TypeId::of::<S>()) {
            list.retain(|&o| o != object);
        }
    }

    pub fn attached<S: 'static>(&self) -> &[GameObject] {
        self.by_shader
            .get(&TypeId::of::<S>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_attached<S: 'static>(&self, object: GameObject) -> bool {
        self.attached::<S>().contains(&object)
    }

    pub fn total(&self) -> usize {
        self.by_shader.values().map(Vec::len).sum()
    }
}

fn attach_hook<S: 'static>(world: &mut World, object: GameObject) {
    if !world.has_resource::<ShaderAttachments>() {
        world.insert_resource(ShaderAttachments::new());
    }
    world.resource_mut::<ShaderAttachments>().attach::<S>(object);
}

fn detach_hook<S: 'static>(world: &mut World, object: GameObject) {
    if let Some(attachments) = world.get_resource_mut::<ShaderAttachments>() {
        attachments.detach::<S>(object);
    }
}

/// Registers the attach/detach hooks for `Renderable<S>` and attaches objects
/// that already carry the marker. Called when a shader of type `S` is added
/// to the renderer; repeated calls are harmless.
pub fn register_renderable<S: 'static>(world: &mut World) {
    if world.has_hooks::<Renderable<S>>() {
        return;
    }
    world.register_hooks::<Renderable<S>>(ComponentHooks {
        on_add: attach_hook::<S>,
        on_remove: detach_hook::<S>,
    });
    for object in world.collect::<Renderable<S>>() {
        attach_hook::<S>(world, object);
    }
}
