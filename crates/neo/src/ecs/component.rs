//! # Component Storage and Lifecycle
//!
//! Components are plain values: a [`SpatialComponent`](crate::component::SpatialComponent),
//! a [`MaterialComponent`](crate::component::MaterialComponent), a marker
//! type. Any `'static + Send + Sync` type can be a component, so the store
//! only ever sees them through a [`TypeId`].
//!
//! [`ComponentColumn`] is one column of an archetype table: every value in
//! it has the same concrete type and row `i` belongs to the object in row `i`
//! of the archetype's object list. Values are boxed `dyn Any` and recovered
//! with `downcast_ref`/`downcast_mut`, which keeps the store free of
//! `unsafe`.
//!
//! ## Lifecycle Hooks
//!
//! Some components must announce themselves when they appear and disappear.
//! A [`Renderable`](crate::component::Renderable) marker attaches its object
//! to a shader when it is added and detaches it when it is removed or when
//! the object is destroyed. [`ComponentHooks`] carries those two callbacks;
//! the [`World`](super::world::World) invokes them around every insertion of
//! a new component type and every removal.

use std::any::{Any, TypeId};

use super::game_object::GameObject;
use super::world::World;

pub(crate) fn component_type_id<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}

/// Callback pair invoked when a component type is added to, or removed from,
/// a game object.
#[derive(Clone, Copy)]
pub struct ComponentHooks {
    /// Runs right after the component has been stored.
    pub on_add: fn(&mut World, GameObject),
    /// Runs right before the component is dropped. The component is still
    /// readable through the world when this is called.
    pub on_remove: fn(&mut World, GameObject),
}

/// A type-erased column of same-typed components.
///
/// Named by the public [`QueryParam`](super::QueryParam) and
/// [`SpawnBundle`](super::SpawnBundle) signatures; the module stays
/// crate-private.
pub struct ComponentColumn {
    data: Vec<Box<dyn Any + Send + Sync>>,
}

impl ComponentColumn {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn push<T: 'static + Send + Sync>(&mut self, value: T) {
        self.data.push(Box::new(value));
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `T` is not the column type.
    pub fn get<T: 'static>(&self, index: usize) -> &T {
        self.data[index].downcast_ref().unwrap_or_else(|| {
            panic!(
                "component column does not hold `{}`",
                std::any::type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `T` is not the column type.
    pub fn get_mut<T: 'static>(&mut self, index: usize) -> &mut T {
        self.data[index].downcast_mut().unwrap_or_else(|| {
            panic!(
                "component column does not hold `{}`",
                std::any::type_name::<T>()
            )
        })
    }

    /// Swap-removes row `index` and hands back the boxed value. Used when an
    /// object migrates between archetypes.
    pub fn take(&mut self, index: usize) -> Box<dyn Any + Send + Sync> {
        self.data.swap_remove(index)
    }

    pub fn push_any(&mut self, value: Box<dyn Any + Send + Sync>) {
        self.data.push(value);
    }

    pub fn get_any(&self, index: usize) -> &dyn Any {
        &*self.data[index]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access() {
        let mut col = ComponentColumn::new();
        col.push(1.5f32);
        col.push(2.5f32);
        *col.get_mut::<f32>(1) += 1.0;
        assert_eq!(*col.get::<f32>(0), 1.5);
        assert_eq!(*col.get::<f32>(1), 3.5);
        assert_eq!(col.len(), 2);
    }

    #[test]
    #[should_panic(expected = "does not hold")]
    fn wrong_type_panics() {
        let mut col = ComponentColumn::new();
        col.push(1u8);
        col.get::<u32>(0);
    }

    #[test]
    fn take_moves_last_row_into_hole() {
        let mut col = ComponentColumn::new();
        col.push(10u32);
        col.push(20u32);
        col.push(30u32);
        let taken = col.take(0);
        assert_eq!(taken.downcast_ref::<u32>(), Some(&10));
        assert_eq!(*col.get::<u32>(0), 30);
        assert_eq!(*col.get::<u32>(1), 20);

        let mut other = ComponentColumn::new();
        other.push_any(taken);
        assert_eq!(*other.get::<u32>(0), 10);
    }

    #[test]
    fn removed_values_are_dropped() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut col = ComponentColumn::new();
        col.push(Tracked);
        col.push(Tracked);
        drop(col.take(0));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        drop(col);
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }
}
