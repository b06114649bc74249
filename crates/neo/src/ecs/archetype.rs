//! # Archetype Tables
//!
//! Every distinct set of component types gets one table. A camera object
//! (`Spatial + Camera + CameraController + Frustum`) lives in a different
//! table than a sphere (`Spatial + Mesh + Material + Renderable<Phong>`), and
//! all spheres with the same signature share rows in the same table:
//!
//! ```text
//! Archetype [Spatial, Mesh, Material]
//!   Spatial:  [s0, s1, s2]
//!   Mesh:     [m0, m1, m2]
//!   Material: [t0, t1, t2]
//!   objects:  [g0, g1, g2]
//! ```
//!
//! Adding or removing a component moves the object's whole row to the
//! table for the new signature. Queries only scan tables whose signature is
//! a superset of what they ask for.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::ComponentColumn;
use super::game_object::GameObject;

/// Sorted, deduplicated component signature.
pub(crate) type ArchetypeKey = Vec<TypeId>;

pub(crate) fn archetype_key(mut type_ids: Vec<TypeId>) -> ArchetypeKey {
    type_ids.sort();
    type_ids.dedup();
    type_ids
}

pub(crate) struct Archetype {
    pub columns: HashMap<TypeId, ComponentColumn>,
    /// Parallel to the column rows.
    pub objects: Vec<GameObject>,
    /// Readable component names for diagnostics.
    pub type_names: HashMap<TypeId, &'static str>,
}

impl Archetype {
    /// Creates an empty table with one column per type in `key`.
    pub fn with_key(key: &ArchetypeKey) -> Self {
        Self {
            columns: key.iter().map(|&t| (t, ComponentColumn::new())).collect(),
            objects: Vec::new(),
            type_names: HashMap::new(),
        }
    }

    pub fn has_component(&self, type_id: &TypeId) -> bool {
        self.columns.contains_key(type_id)
    }

    pub fn has_all(&self, type_ids: &[TypeId]) -> bool {
        type_ids.iter().all(|t| self.columns.contains_key(t))
    }

    /// Swap-removes row `index` from every column and the object list, dropping
    /// the components. Returns the object that moved into the freed row.
    pub fn swap_remove(&mut self, index: usize) -> Option<GameObject> {
        for column in self.columns.values_mut() {
            drop(column.take(index));
        }
        self.objects.swap_remove(index);
        self.objects.get(index).copied()
    }
}
