//! # GameObject: Identity Without Data
//!
//! A [`GameObject`] owns its components, but it does not *contain* them. The
//! [`World`](super::world::World) maps each object to the table row holding
//! its components, so the handle itself is just two integers.
//!
//! ## Generational Handles
//!
//! Objects are destroyed explicitly and their slots are recycled. A plain
//! counter would let an old handle silently address the new occupant of the
//! slot, so every slot carries a generation:
//!
//! ```text
//! GameObject { index: 7, generation: 0 }  ← created
//! destroy(7v0)                            ← generation of slot 7 becomes 1
//! GameObject { index: 7, generation: 1 }  ← next object in slot 7
//! ```
//!
//! Any lookup with `7v0` after the destroy fails instead of returning the
//! new object's components. Components that store another object's handle
//! (a light pointing at its shadow camera, a ray pointing at its camera) can
//! therefore go stale, but never dangle.

use std::fmt;

/// Handle to a game object living in a [`World`](super::world::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObject {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl GameObject {
    /// Slot index. Recycled after the object is destroyed.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameObject({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out [`GameObject`] handles and recycles destroyed slots.
///
/// ```text
/// generations: [0, 1, 0, 2]   ← current generation of every slot
/// free_list:   [1]            ← destroyed slots waiting for reuse
/// ```
pub(crate) struct GameObjectAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl GameObjectAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn allocate(&mut self) -> GameObject {
        match self.free_list.pop() {
            Some(index) => GameObject {
                index,
                generation: self.generations[index as usize],
            },
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                GameObject {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Frees the slot of `object`. Returns `false` for stale handles and
    /// double frees.
    pub fn deallocate(&mut self, object: GameObject) -> bool {
        if !self.is_alive(object) {
            return false;
        }
        self.generations[object.index as usize] += 1;
        self.free_list.push(object.index);
        true
    }

    pub fn is_alive(&self, object: GameObject) -> bool {
        self.generations
            .get(object.index as usize)
            .is_some_and(|&generation| generation == object.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn total_slots(&self) -> u32 {
        self.generations.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slots_are_sequential() {
        let mut alloc = GameObjectAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!((a.index, a.generation), (0, 0));
        assert_eq!((b.index, b.generation), (1, 0));
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let mut alloc = GameObjectAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.deallocate(a));
        let b = alloc.allocate();
        assert_eq!(b.index, a.index);
        assert_eq!(b.generation, 1);
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(b));
    }

    #[test]
    fn double_destroy_is_rejected() {
        let mut alloc = GameObjectAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.deallocate(a));
        assert!(!alloc.deallocate(a));
    }

    #[test]
    fn unknown_index_is_not_alive() {
        let alloc = GameObjectAllocator::new();
        assert!(!alloc.is_alive(GameObject {
            index: 42,
            generation: 0
        }));
    }

    #[test]
    fn pool_counters() {
        let mut alloc = GameObjectAllocator::new();
        let a = alloc.allocate();
        let _b = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(a);
        assert_eq!(alloc.alive_count(), 1);
        assert_eq!(alloc.free_count(), 1);
        assert_eq!(alloc.total_slots(), 2);
    }

    #[test]
    fn debug_format() {
        let object = GameObject {
            index: 3,
            generation: 1,
        };
        assert_eq!(format!("{object:?}"), "GameObject(3v1)");
        assert_eq!(object.to_string(), "3v1");
    }
}
