//! # Positional Queries
//!
//! A query names the component types it wants as a tuple and receives them
//! in the same positions for every matching object:
//!
//! ```text
//! world.query::<(&mut SpatialComponent, &CameraControllerComponent)>(|go, (spatial, ctrl)| {
//!     spatial.position += spatial.look_dir() * ctrl.move_speed * dt;
//! });
//! ```
//!
//! `&T` reads, `&mut T` writes and `Option<&T>` reads a component the object
//! may or may not have (it does not restrict which objects match).
//!
//! ## Column Extraction
//!
//! Handing out `&mut A` and `&B` from the same archetype at once needs the
//! borrow checker to see that the columns are distinct. Each parameter
//! removes its column from the archetype's map ([`QueryParam::extract`]),
//! the closure runs over the owned columns, and the columns go back
//! afterwards ([`QueryParam::restore`]). Asking for the same type twice in one
//! query therefore panics on extraction.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::ComponentColumn;

/// Something a query can fetch per object.
pub trait QueryParam {
    type Item<'w>;
    /// Columns held while the query runs.
    type Column;

    /// Component types an archetype must contain to match.
    fn type_ids() -> Vec<TypeId>;

    fn extract(columns: &mut HashMap<TypeId, ComponentColumn>) -> Self::Column;

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, ComponentColumn>);

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_>;
}

fn take_column<T: 'static>(columns: &mut HashMap<TypeId, ComponentColumn>) -> (TypeId, ComponentColumn) {
    let tid = TypeId::of::<T>();
    let col = columns.remove(&tid).unwrap_or_else(|| {
        panic!(
            "query: column for `{}` is missing or requested twice",
            std::any::type_name::<T>()
        )
    });
    (tid, col)
}

impl<T: 'static + Send + Sync> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = (TypeId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut HashMap<TypeId, ComponentColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, ComponentColumn>) {
        columns.insert(col.0, col.1);
    }

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
        col.1.get::<T>(row)
    }
}

impl<T: 'static + Send + Sync> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = (TypeId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut HashMap<TypeId, ComponentColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, ComponentColumn>) {
        columns.insert(col.0, col.1);
    }

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
        col.1.get_mut::<T>(row)
    }
}

/// Optional read: yields `None` for objects without a `T`.
impl<T: 'static + Send + Sync> QueryParam for Option<&T> {
    type Item<'w> = Option<&'w T>;
    type Column = Option<(TypeId, ComponentColumn)>;

    fn type_ids() -> Vec<TypeId> {
        Vec::new()
    }

    fn extract(columns: &mut HashMap<TypeId, ComponentColumn>) -> Self::Column {
        let tid = TypeId::of::<T>();
        columns.remove(&tid).map(|col| (tid, col))
    }

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, ComponentColumn>) {
        if let Some((tid, col)) = col {
            columns.insert(tid, col);
        }
    }

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
        col.as_ref().map(|(_, c)| c.get::<T>(row))
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            fn extract(columns: &mut HashMap<TypeId, ComponentColumn>) -> Self::Column {
                ($($P::extract(columns),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, columns: &mut HashMap<TypeId, ComponentColumn>) {
                let ($($P,)+) = col;
                $($P::restore($P, columns);)+
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
                let ($($P,)+) = col;
                ($($P::fetch($P, row),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
