//! # World: Objects, Components and Resources
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │  allocator    generational GameObject handles        │
//! │  archetypes   signature → table of component columns │
//! │  locations    object index → (signature, row)        │
//! │  resources    TypeId → singleton value               │
//! │  hooks        TypeId → on_add / on_remove callbacks  │
//! │  kill_queue   deferred destroys and removals         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! A component exists only inside the row of its object. Destroying the
//! object drops the whole row, so a component can never outlive its owner.
//! Before the row goes away every component type with registered hooks gets
//! its `on_remove` call, which is how shader attachments are torn down.
//!
//! ## Deferred Removal
//!
//! Systems and shaders hold positional results across a frame, so removing
//! things in the middle of one is rarely what they want. [`World::queue_destroy`]
//! and [`World::queue_remove`] record the intent and
//! [`World::flush_kill_queue`] applies it; the engine flushes once per frame
//! after rendering.
//!
//! ## Resources
//!
//! Singletons that do not belong to any object (the [`Library`](crate::library::Library),
//! the [`Messenger`](crate::messaging::Messenger), input state) are stored by
//! type. Take one out with [`World::resource_remove`] when it has to be used
//! alongside a mutable borrow of the world, then put it back.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::archetype::{Archetype, ArchetypeKey, archetype_key};
use super::component::{ComponentColumn, ComponentHooks, component_type_id};
use super::game_object::{GameObject, GameObjectAllocator};
use super::query::QueryParam;

#[derive(Clone)]
struct Location {
    key: ArchetypeKey,
    row: usize,
}

#[derive(Default)]
struct KillQueue {
    objects: Vec<GameObject>,
    components: Vec<(GameObject, TypeId)>,
}

type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Container for every game object, component and resource.
pub struct World {
    allocator: GameObjectAllocator,
    archetypes: HashMap<ArchetypeKey, Archetype>,
    locations: HashMap<u32, Location>,
    resources: HashMap<TypeId, Box<dyn Any>>,
    hooks: HashMap<TypeId, ComponentHooks>,
    kill_queue: KillQueue,
    #[cfg(feature = "diagnostics")]
    created_this_frame: u32,
    #[cfg(feature = "diagnostics")]
    destroyed_this_frame: u32,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: GameObjectAllocator::new(),
            archetypes: HashMap::new(),
            locations: HashMap::new(),
            resources: HashMap::new(),
            hooks: HashMap::new(),
            kill_queue: KillQueue::default(),
            #[cfg(feature = "diagnostics")]
            created_this_frame: 0,
            #[cfg(feature = "diagnostics")]
            destroyed_this_frame: 0,
        }
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Inserts a resource, replacing any previous value of the same type.
    pub fn insert_resource<T: 'static>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// # Panics
    ///
    /// Panics if the resource has not been inserted.
    pub fn resource<T: 'static>(&self) -> &T {
        self.get_resource::<T>().unwrap_or_else(|| {
            panic!(
                "resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if the resource has not been inserted.
    pub fn resource_mut<T: 'static>(&mut self) -> &mut T {
        self.get_resource_mut::<T>().unwrap_or_else(|| {
            panic!(
                "resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn get_resource<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Takes a resource out of the world.
    pub fn resource_remove<T: 'static>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|b| *b)
    }

    // ── Hooks ────────────────────────────────────────────────────────

    /// Registers lifecycle callbacks for component type `T`. Replaces any
    /// hooks registered earlier for the same type.
    pub fn register_hooks<T: 'static + Send + Sync>(&mut self, hooks: ComponentHooks) {
        self.hooks.insert(component_type_id::<T>(), hooks);
    }

    pub fn has_hooks<T: 'static + Send + Sync>(&self) -> bool {
        self.hooks.contains_key(&component_type_id::<T>())
    }

    fn run_add_hook(&mut self, object: GameObject, type_id: TypeId) {
        if let Some(hooks) = self.hooks.get(&type_id).copied() {
            (hooks.on_add)(self, object);
        }
    }

    fn run_remove_hook(&mut self, object: GameObject, type_id: TypeId) {
        if let Some(hooks) = self.hooks.get(&type_id).copied() {
            (hooks.on_remove)(self, object);
        }
    }

    // ── Game Objects ─────────────────────────────────────────────────

    pub fn game_object_count(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.values().filter(|a| !a.objects.is_empty()).count()
    }

    pub fn is_alive(&self, object: GameObject) -> bool {
        self.allocator.is_alive(object)
    }

    /// Creates a game object with no components.
    pub fn create_game_object(&mut self) -> GameObject {
        self.spawn(())
    }

    /// Creates a game object from a tuple of components.
    ///
    /// # Panics
    ///
    /// Panics if the bundle names the same component type twice.
    pub fn spawn<B: SpawnBundle>(&mut self, bundle: B) -> GameObject {
        let key = archetype_key(B::type_ids());
        assert_eq!(
            key.len(),
            B::type_ids().len(),
            "duplicate component type in bundle"
        );
        let object = self.allocator.allocate();
        #[cfg(feature = "diagnostics")]
        {
            self.created_this_frame += 1;
        }
        let arch = self
            .archetypes
            .entry(key.clone())
            .or_insert_with(|| Archetype::with_key(&key));
        for (tid, name) in B::type_names() {
            arch.type_names.entry(tid).or_insert(name);
        }
        let row = arch.objects.len();
        arch.objects.push(object);
        bundle.push_into(&mut arch.columns);
        self.locations.insert(object.index, Location { key, row });

        for tid in B::type_ids() {
            self.run_add_hook(object, tid);
        }
        object
    }

    pub fn spawn_one<T: 'static + Send + Sync>(&mut self, component: T) -> GameObject {
        self.spawn((component,))
    }

    /// Destroys `object` and every component it owns.
    ///
    /// `on_remove` hooks run first, while the components are still readable.
    /// Returns `false` if the handle is stale.
    pub fn destroy(&mut self, object: GameObject) -> bool {
        if !self.allocator.is_alive(object) {
            return false;
        }

        let types = self.locations[&object.index].key.clone();
        for tid in types {
            self.run_remove_hook(object, tid);
        }
        // A hook may have destroyed the object already.
        if !self.allocator.is_alive(object) {
            return true;
        }

        if let Some(loc) = self.locations.remove(&object.index) {
            if let Some(arch) = self.archetypes.get_mut(&loc.key) {
                if let Some(moved) = arch.swap_remove(loc.row) {
                    if let Some(moved_loc) = self.locations.get_mut(&moved.index) {
                        moved_loc.row = loc.row;
                    }
                }
            }
        }
        self.allocator.deallocate(object);
        #[cfg(feature = "diagnostics")]
        {
            self.destroyed_this_frame += 1;
        }
        true
    }

    /// Destroys every game object.
    pub fn destroy_all(&mut self) {
        let objects: Vec<GameObject> = self
            .archetypes
            .values()
            .flat_map(|a| a.objects.iter().copied())
            .collect();
        for object in objects {
            self.destroy(object);
        }
    }

    // ── Kill Queue ───────────────────────────────────────────────────

    /// Destroys `object` at the next [`flush_kill_queue`](Self::flush_kill_queue).
    pub fn queue_destroy(&mut self, object: GameObject) {
        if !self.kill_queue.objects.contains(&object) {
            self.kill_queue.objects.push(object);
        }
    }

    /// Removes component `T` from `object` at the next flush.
    pub fn queue_remove<T: 'static + Send + Sync>(&mut self, object: GameObject) {
        let entry = (object, component_type_id::<T>());
        if !self.kill_queue.components.contains(&entry) {
            self.kill_queue.components.push(entry);
        }
    }

    pub fn has_pending_kills(&self) -> bool {
        !self.kill_queue.objects.is_empty() || !self.kill_queue.components.is_empty()
    }

    /// Applies queued removals, then queued destroys. Anything queued by the
    /// hooks that run meanwhile is applied in the same call. Returns the
    /// objects that were destroyed.
    pub fn flush_kill_queue(&mut self) -> Vec<GameObject> {
        let mut destroyed = Vec::new();
        while self.has_pending_kills() {
            for (object, tid) in std::mem::take(&mut self.kill_queue.components) {
                if self.allocator.is_alive(object) {
                    self.remove_by_type_id(object, tid);
                }
            }
            for object in std::mem::take(&mut self.kill_queue.objects) {
                if self.destroy(object) {
                    destroyed.push(object);
                }
            }
        }
        destroyed
    }

    // ── Per-Object Access ────────────────────────────────────────────

    pub fn get<T: 'static + Send + Sync>(&self, object: GameObject) -> Option<&T> {
        if !self.allocator.is_alive(object) {
            return None;
        }
        let loc = self.locations.get(&object.index)?;
        let col = self.archetypes.get(&loc.key)?.columns.get(&TypeId::of::<T>())?;
        Some(col.get::<T>(loc.row))
    }

    pub fn get_mut<T: 'static + Send + Sync>(&mut self, object: GameObject) -> Option<&mut T> {
        if !self.allocator.is_alive(object) {
            return None;
        }
        let loc = self.locations.get(&object.index)?;
        let col = self
            .archetypes
            .get_mut(&loc.key)?
            .columns
            .get_mut(&TypeId::of::<T>())?;
        Some(col.get_mut::<T>(loc.row))
    }

    pub fn has<T: 'static + Send + Sync>(&self, object: GameObject) -> bool {
        self.has_type_id(object, TypeId::of::<T>())
    }

    fn has_type_id(&self, object: GameObject, type_id: TypeId) -> bool {
        self.allocator.is_alive(object)
            && self
                .locations
                .get(&object.index)
                .is_some_and(|loc| loc.key.contains(&type_id))
    }

    /// Type names of every component on `object`.
    pub fn component_names(&self, object: GameObject) -> Vec<&'static str> {
        let Some(loc) = self.locations.get(&object.index) else {
            return Vec::new();
        };
        if !self.allocator.is_alive(object) {
            return Vec::new();
        }
        let arch = &self.archetypes[&loc.key];
        loc.key
            .iter()
            .filter_map(|tid| arch.type_names.get(tid).copied())
            .collect()
    }

    // ── Add / Remove ─────────────────────────────────────────────────

    /// Moves the row of `object` into the table for `new_key`. Components
    /// whose type is not part of `new_key` are handed back.
    fn move_row(
        &mut self,
        object: GameObject,
        new_key: ArchetypeKey,
    ) -> HashMap<TypeId, BoxedComponent> {
        let loc = self.locations[&object.index].clone();

        let old = self
            .archetypes
            .get_mut(&loc.key)
            .expect("object location points at a missing archetype");
        let mut taken: HashMap<TypeId, BoxedComponent> = old
            .columns
            .iter_mut()
            .map(|(&tid, col)| (tid, col.take(loc.row)))
            .collect();
        let names: Vec<(TypeId, &'static str)> =
            old.type_names.iter().map(|(&t, &n)| (t, n)).collect();
        old.objects.swap_remove(loc.row);
        if let Some(&moved) = old.objects.get(loc.row) {
            if let Some(moved_loc) = self.locations.get_mut(&moved.index) {
                moved_loc.row = loc.row;
            }
        }

        let new_arch = self
            .archetypes
            .entry(new_key.clone())
            .or_insert_with(|| Archetype::with_key(&new_key));
        for (tid, name) in names {
            if new_arch.has_component(&tid) {
                new_arch.type_names.entry(tid).or_insert(name);
            }
        }
        let row = new_arch.objects.len();
        new_arch.objects.push(object);
        for (tid, col) in new_arch.columns.iter_mut() {
            if let Some(value) = taken.remove(tid) {
                col.push_any(value);
            }
        }
        self.locations.insert(object.index, Location { key: new_key, row });
        taken
    }

    /// Adds `component` to `object`, replacing an existing component of the
    /// same type in place. `on_add` runs only when the type is new to the
    /// object.
    ///
    /// # Panics
    ///
    /// Panics if the object has been destroyed.
    pub fn insert<T: 'static + Send + Sync>(&mut self, object: GameObject, component: T) {
        assert!(
            self.allocator.is_alive(object),
            "cannot add `{}` to destroyed game object {:?}",
            std::any::type_name::<T>(),
            object
        );

        if let Some(existing) = self.get_mut::<T>(object) {
            *existing = component;
            return;
        }

        let tid = component_type_id::<T>();
        let mut types = self.locations[&object.index].key.clone();
        types.push(tid);
        let new_key = archetype_key(types);
        self.move_row(object, new_key.clone());

        let arch = self
            .archetypes
            .get_mut(&new_key)
            .expect("archetype created by move_row");
        arch.type_names
            .entry(tid)
            .or_insert(std::any::type_name::<T>());
        arch.columns
            .get_mut(&tid)
            .expect("new archetype has a column for the inserted type")
            .push(component);

        self.run_add_hook(object, tid);
    }

    /// Removes and returns component `T` of `object`, running its `on_remove`
    /// hook first. Returns `None` if the object is dead or has no `T`.
    pub fn remove<T: 'static + Send + Sync>(&mut self, object: GameObject) -> Option<T> {
        self.take_by_type_id(object, component_type_id::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Type-erased [`remove`](Self::remove); the component is dropped.
    pub fn remove_by_type_id(&mut self, object: GameObject, type_id: TypeId) -> bool {
        self.take_by_type_id(object, type_id).is_some()
    }

    fn take_by_type_id(&mut self, object: GameObject, type_id: TypeId) -> Option<BoxedComponent> {
        if !self.has_type_id(object, type_id) {
            return None;
        }
        self.run_remove_hook(object, type_id);
        if !self.has_type_id(object, type_id) {
            return None;
        }
        let new_key: ArchetypeKey = self.locations[&object.index]
            .key
            .iter()
            .copied()
            .filter(|&t| t != type_id)
            .collect();
        self.move_row(object, new_key).remove(&type_id)
    }

    // ── Collections ──────────────────────────────────────────────────

    /// Every object carrying a `T`, ordered by slot index.
    pub fn collect<T: 'static + Send + Sync>(&self) -> Vec<GameObject> {
        let tid = TypeId::of::<T>();
        let mut objects: Vec<GameObject> = self
            .archetypes
            .values()
            .filter(|a| a.has_component(&tid))
            .flat_map(|a| a.objects.iter().copied())
            .collect();
        objects.sort_by_key(|o| o.index);
        objects
    }

    pub fn component_count<T: 'static + Send + Sync>(&self) -> usize {
        let tid = TypeId::of::<T>();
        self.archetypes
            .values()
            .filter(|a| a.has_component(&tid))
            .map(|a| a.objects.len())
            .sum()
    }

    /// The only object carrying a `T`, if any.
    ///
    /// # Panics
    ///
    /// Panics if more than one object carries a `T`.
    pub fn single<T: 'static + Send + Sync>(&self) -> Option<GameObject> {
        let objects = self.collect::<T>();
        assert!(
            objects.len() <= 1,
            "expected at most one `{}`, found {}",
            std::any::type_name::<T>(),
            objects.len()
        );
        objects.first().copied()
    }

    /// Live instance counts per component type name, largest first.
    pub fn component_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for arch in self.archetypes.values() {
            for &name in arch.type_names.values() {
                *counts.entry(name).or_default() += arch.objects.len();
            }
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|&(_, n)| n > 0)
            .map(|(name, n)| (short_type_name(name), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn matching_keys(&self, required: &[TypeId]) -> Vec<ArchetypeKey> {
        let mut keys: Vec<ArchetypeKey> = self
            .archetypes
            .iter()
            .filter(|(_, arch)| !arch.objects.is_empty() && arch.has_all(required))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn run_query<Q: QueryParam>(
        &mut self,
        required: Vec<TypeId>,
        mut f: impl FnMut(GameObject, Q::Item<'_>),
    ) {
        for key in self.matching_keys(&required) {
            let arch = self.archetypes.get_mut(&key).expect("key collected above");
            let mut cols = Q::extract(&mut arch.columns);
            for row in 0..arch.objects.len() {
                f(arch.objects[row], Q::fetch(&mut cols, row));
            }
            Q::restore(cols, &mut arch.columns);
        }
    }

    /// Calls `f` with the requested components of every matching object.
    ///
    /// ```ignore
    /// world.query::<(&mut SpatialComponent, &LightComponent)>(|go, (spatial, light)| {
    ///     spatial.position.y += light.color.x;
    /// });
    /// ```
    pub fn query<Q: QueryParam>(&mut self, f: impl FnMut(GameObject, Q::Item<'_>)) {
        self.run_query::<Q>(Q::type_ids(), f);
    }

    /// Like [`query`](Self::query), restricted to objects that also carry `F`.
    pub fn query_filtered<Q: QueryParam, F: 'static + Send + Sync>(
        &mut self,
        f: impl FnMut(GameObject, Q::Item<'_>),
    ) {
        let mut required = Q::type_ids();
        required.push(TypeId::of::<F>());
        self.run_query::<Q>(required, f);
    }

    /// Calls `f` for the single object matching `Q` and carrying `F`. Does
    /// nothing when none matches.
    ///
    /// # Panics
    ///
    /// Panics if more than one object matches.
    pub fn query_single<Q: QueryParam, F: 'static + Send + Sync>(
        &mut self,
        f: impl FnOnce(GameObject, Q::Item<'_>),
    ) {
        let mut required = Q::type_ids();
        required.push(TypeId::of::<F>());

        let mut found: Option<(ArchetypeKey, usize)> = None;
        for key in self.matching_keys(&required) {
            for row in 0..self.archetypes[&key].objects.len() {
                if found.is_some() {
                    panic!(
                        "query_single: more than one game object matches `{}`",
                        std::any::type_name::<F>()
                    );
                }
                found = Some((key.clone(), row));
            }
        }

        if let Some((key, row)) = found {
            let arch = self.archetypes.get_mut(&key).expect("key collected above");
            let mut cols = Q::extract(&mut arch.columns);
            f(arch.objects[row], Q::fetch(&mut cols, row));
            Q::restore(cols, &mut arch.columns);
        }
    }

    /// Fetches the requested components of one object.
    pub fn query_one<Q: QueryParam, R>(
        &mut self,
        object: GameObject,
        f: impl FnOnce(Q::Item<'_>) -> R,
    ) -> Option<R> {
        if !self.allocator.is_alive(object) {
            return None;
        }
        let loc = self.locations.get(&object.index)?.clone();
        let arch = self.archetypes.get_mut(&loc.key)?;
        if !arch.has_all(&Q::type_ids()) {
            return None;
        }
        let mut cols = Q::extract(&mut arch.columns);
        let result = f(Q::fetch(&mut cols, loc.row));
        Q::restore(cols, &mut arch.columns);
        Some(result)
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Pool statistics; resets the per-frame create/destroy counters.
    #[cfg(feature = "diagnostics")]
    pub(crate) fn take_pool_stats(&mut self) -> crate::diag::PoolStats {
        let stats = crate::diag::PoolStats {
            total_slots: self.allocator.total_slots(),
            free_count: self.allocator.free_count(),
            alive_count: self.allocator.alive_count(),
            created_this_frame: self.created_this_frame,
            destroyed_this_frame: self.destroyed_this_frame,
        };
        self.created_this_frame = 0;
        self.destroyed_this_frame = 0;
        stats
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ── Spawn Bundles ────────────────────────────────────────────────────────

/// A tuple of components that can become a new game object.
pub trait SpawnBundle {
    fn type_ids() -> Vec<TypeId>;
    fn type_names() -> Vec<(TypeId, &'static str)>;
    fn push_into(self, columns: &mut HashMap<TypeId, ComponentColumn>);
}

impl SpawnBundle for () {
    fn type_ids() -> Vec<TypeId> {
        Vec::new()
    }

    fn type_names() -> Vec<(TypeId, &'static str)> {
        Vec::new()
    }

    fn push_into(self, _columns: &mut HashMap<TypeId, ComponentColumn>) {}
}

macro_rules! impl_spawn_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static + Send + Sync),+> SpawnBundle for ($($T,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(component_type_id::<$T>()),+]
            }

            fn type_names() -> Vec<(TypeId, &'static str)> {
                vec![$((component_type_id::<$T>(), std::any::type_name::<$T>())),+]
            }

            #[allow(non_snake_case)]
            fn push_into(self, columns: &mut HashMap<TypeId, ComponentColumn>) {
                let ($($T,)+) = self;
                $(
                    columns
                        .get_mut(&component_type_id::<$T>())
                        .expect("bundle types are unique")
                        .push::<$T>($T);
                )+
            }
        }
    };
}

impl_spawn_bundle!(A);
impl_spawn_bundle!(A, B);
impl_spawn_bundle!(A, B, C);
impl_spawn_bundle!(A, B, C, D);
impl_spawn_bundle!(A, B, C, D, E);
impl_spawn_bundle!(A, B, C, D, E, F);
impl_spawn_bundle!(A, B, C, D, E, F, G);
impl_spawn_bundle!(A, B, C, D, E, F, G, H);

/// `neo::component::MaterialComponent` → `MaterialComponent`. Generic
/// arguments keep their short form too: `Renderable<neo::render::PhongShader>`
/// → `Renderable<PhongShader>`.
pub(crate) fn short_type_name(full: &str) -> String {
    match full.split_once('<') {
        Some((outer, inner)) => {
            let inner = inner.trim_end_matches('>');
            format!("{}<{}>", short_type_name(outer), short_type_name(inner))
        }
        None => full.rsplit("::").next().unwrap_or(full).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Position(f32, f32);
    #[derive(Debug, PartialEq)]
    struct Velocity(f32, f32);
    struct Marker;

    #[test]
    fn spawn_and_get() {
        let mut world = World::new();
        let go = world.spawn((Position(1.0, 2.0), Velocity(3.0, 4.0)));
        assert_eq!(world.get::<Position>(go), Some(&Position(1.0, 2.0)));
        assert_eq!(world.get::<Velocity>(go), Some(&Velocity(3.0, 4.0)));
        assert!(world.get::<Marker>(go).is_none());
        assert_eq!(world.game_object_count(), 1);
    }

    #[test]
    #[should_panic(expected = "duplicate component type in bundle")]
    fn duplicate_bundle_types_are_rejected() {
        let mut world = World::new();
        world.spawn((Position(1.0, 0.0), Position(2.0, 0.0)));
    }

    #[test]
    fn rejected_bundle_leaves_neighbours_intact() {
        let mut world = World::new();
        let spawned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            world.spawn((Position(1.0, 0.0), Position(2.0, 0.0)));
        }));
        assert!(spawned.is_err());
        let b = world.spawn_one(Position(3.0, 0.0));
        assert_eq!(world.get::<Position>(b), Some(&Position(3.0, 0.0)));
        assert_eq!(world.component_count::<Position>(), 1);
        assert_eq!(world.game_object_count(), 1);
    }

    #[test]
    fn empty_object_gains_components() {
        let mut world = World::new();
        let go = world.create_game_object();
        world.insert(go, Position(0.0, 0.0));
        world.insert(go, Marker);
        assert!(world.has::<Position>(go));
        assert!(world.has::<Marker>(go));
    }

    #[test]
    fn insert_replaces_existing() {
        let mut world = World::new();
        let go = world.spawn_one(Position(0.0, 0.0));
        world.insert(go, Position(5.0, 5.0));
        assert_eq!(world.get::<Position>(go), Some(&Position(5.0, 5.0)));
        assert_eq!(world.component_count::<Position>(), 1);
    }

    #[test]
    fn migration_keeps_other_rows_intact() {
        let mut world = World::new();
        let a = world.spawn_one(Position(1.0, 0.0));
        let b = world.spawn_one(Position(2.0, 0.0));
        let c = world.spawn_one(Position(3.0, 0.0));
        world.insert(a, Velocity(9.0, 9.0));
        assert_eq!(world.get::<Position>(a), Some(&Position(1.0, 0.0)));
        assert_eq!(world.get::<Position>(b), Some(&Position(2.0, 0.0)));
        assert_eq!(world.get::<Position>(c), Some(&Position(3.0, 0.0)));
    }

    #[test]
    fn remove_returns_component() {
        let mut world = World::new();
        let go = world.spawn((Position(1.0, 1.0), Velocity(2.0, 2.0)));
        assert_eq!(world.remove::<Velocity>(go), Some(Velocity(2.0, 2.0)));
        assert_eq!(world.remove::<Velocity>(go), None);
        assert_eq!(world.get::<Position>(go), Some(&Position(1.0, 1.0)));
    }

    #[test]
    fn destroy_cascades_to_components() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut world = World::new();
        let go = world.spawn((Tracked, Position(0.0, 0.0)));
        let other = world.spawn_one(Position(7.0, 7.0));
        assert!(world.destroy(go));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        assert!(!world.is_alive(go));
        assert!(world.get::<Position>(go).is_none());
        assert_eq!(world.get::<Position>(other), Some(&Position(7.0, 7.0)));
        assert!(!world.destroy(go));
    }

    #[test]
    fn stale_handle_does_not_see_new_object() {
        let mut world = World::new();
        let old = world.spawn_one(Position(1.0, 1.0));
        world.destroy(old);
        let new = world.spawn_one(Position(2.0, 2.0));
        assert_eq!(old.index(), new.index());
        assert!(world.get::<Position>(old).is_none());
        assert_eq!(world.get::<Position>(new), Some(&Position(2.0, 2.0)));
    }

    #[test]
    fn query_reads_and_writes() {
        let mut world = World::new();
        world.spawn((Position(0.0, 0.0), Velocity(1.0, 2.0)));
        world.spawn((Position(5.0, 5.0), Velocity(-1.0, 0.0)));
        world.spawn_one(Position(100.0, 100.0));

        world.query::<(&mut Position, &Velocity)>(|_, (p, v)| {
            p.0 += v.0;
            p.1 += v.1;
        });

        let mut seen = Vec::new();
        world.query::<(&Position,)>(|_, (p,)| seen.push((p.0, p.1)));
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![(1.0, 2.0), (4.0, 5.0), (100.0, 100.0)]);
    }

    #[test]
    fn optional_query_param() {
        let mut world = World::new();
        world.spawn((Position(0.0, 0.0), Velocity(1.0, 1.0)));
        world.spawn_one(Position(1.0, 1.0));

        let mut with = 0;
        let mut without = 0;
        world.query::<(&Position, Option<&Velocity>)>(|_, (_, v)| match v {
            Some(_) => with += 1,
            None => without += 1,
        });
        assert_eq!((with, without), (1, 1));
    }

    #[test]
    fn query_filtered_needs_marker() {
        let mut world = World::new();
        let tagged = world.spawn((Position(0.0, 0.0), Marker));
        world.spawn_one(Position(1.0, 1.0));

        let mut hits = Vec::new();
        world.query_filtered::<(&Position,), Marker>(|go, _| hits.push(go));
        assert_eq!(hits, vec![tagged]);
    }

    #[test]
    #[should_panic(expected = "more than one")]
    fn query_single_panics_on_duplicates() {
        let mut world = World::new();
        world.spawn((Position(0.0, 0.0), Marker));
        world.spawn((Position(1.0, 0.0), Marker));
        world.query_single::<(&Position,), Marker>(|_, _| {});
    }

    #[test]
    fn query_one_fetches_tuple() {
        let mut world = World::new();
        let go = world.spawn((Position(1.0, 2.0), Velocity(3.0, 4.0)));
        let sum = world.query_one::<(&Position, &Velocity), _>(go, |(p, v)| p.0 + v.0);
        assert_eq!(sum, Some(4.0));
        let missing = world.query_one::<(&Marker,), _>(go, |_| ());
        assert!(missing.is_none());
    }

    #[test]
    fn single_lookup() {
        let mut world = World::new();
        assert!(world.single::<Marker>().is_none());
        let go = world.spawn_one(Marker);
        assert_eq!(world.single::<Marker>(), Some(go));
    }

    #[test]
    #[should_panic(expected = "at most one")]
    fn single_panics_on_duplicates() {
        let mut world = World::new();
        world.spawn_one(Marker);
        world.spawn_one(Marker);
        world.single::<Marker>();
    }

    #[test]
    fn collect_is_ordered_by_slot() {
        let mut world = World::new();
        let a = world.spawn_one(Position(0.0, 0.0));
        let b = world.spawn((Position(0.0, 0.0), Marker));
        let c = world.spawn_one(Position(0.0, 0.0));
        assert_eq!(world.collect::<Position>(), vec![a, b, c]);
    }

    struct Counted;
    static ADDS: AtomicUsize = AtomicUsize::new(0);
    static REMOVES: AtomicUsize = AtomicUsize::new(0);

    fn counted_hooks() -> ComponentHooks {
        ComponentHooks {
            on_add: |_, _| {
                ADDS.fetch_add(1, Ordering::SeqCst);
            },
            on_remove: |world, go| {
                assert!(world.has::<Counted>(go), "component still present in on_remove");
                REMOVES.fetch_add(1, Ordering::SeqCst);
            },
        }
    }

    #[test]
    fn hooks_follow_component_lifetime() {
        let mut world = World::new();
        world.register_hooks::<Counted>(counted_hooks());

        let a = world.spawn((Counted, Position(0.0, 0.0)));
        let b = world.create_game_object();
        world.insert(b, Counted);
        world.insert(b, Counted);
        assert_eq!(ADDS.load(Ordering::SeqCst), 2);

        world.remove::<Counted>(b);
        world.destroy(a);
        assert_eq!(REMOVES.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn kill_queue_is_deferred() {
        let mut world = World::new();
        let a = world.spawn((Position(0.0, 0.0), Velocity(0.0, 0.0)));
        let b = world.spawn_one(Position(1.0, 1.0));

        world.queue_remove::<Velocity>(a);
        world.queue_destroy(b);
        world.queue_destroy(b);
        assert!(world.has::<Velocity>(a));
        assert!(world.is_alive(b));

        let destroyed = world.flush_kill_queue();
        assert_eq!(destroyed, vec![b]);
        assert!(!world.has::<Velocity>(a));
        assert!(world.has::<Position>(a));
        assert!(!world.is_alive(b));
        assert!(!world.has_pending_kills());
    }

    #[test]
    fn resources_round_trip_through_remove() {
        let mut world = World::new();
        world.insert_resource(42u32);
        *world.resource_mut::<u32>() += 1;
        let value = world.resource_remove::<u32>();
        assert_eq!(value, Some(43));
        assert!(!world.has_resource::<u32>());
        assert!(world.get_resource::<u32>().is_none());
    }

    #[test]
    fn component_counts_use_short_names() {
        let mut world = World::new();
        world.spawn((Position(0.0, 0.0), Marker));
        world.spawn_one(Position(0.0, 0.0));
        let counts = world.component_counts();
        assert_eq!(counts[0], ("Position".to_string(), 2));
        assert!(counts.contains(&("Marker".to_string(), 1)));
    }

    #[test]
    fn short_names_strip_generic_paths() {
        assert_eq!(short_type_name("neo::component::MeshComponent"), "MeshComponent");
        assert_eq!(
            short_type_name("neo::component::Renderable<neo::render::shaders::PhongShader>"),
            "Renderable<PhongShader>"
        );
    }
}
