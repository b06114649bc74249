//! # Component Store
//!
//! Game objects, their components, and the systems that update them. The
//! layout follows the archetype pattern: objects with the same set of
//! component types share a table, and queries walk only the tables that
//! contain everything they ask for.
//!
//! ## Module Overview
//!
//! - [`game_object`]: Generational handles
//! - [`component`]: Type-erased columns and lifecycle hooks
//! - [`archetype`]: Tables grouped by component signature
//! - [`world`]: Objects, components, resources and the kill queue
//! - [`query`]: Positional tuple queries
//! - [`system`]: System trait and ordered schedule

pub(crate) mod archetype;
pub(crate) mod component;
pub mod game_object;
pub(crate) mod query;
pub mod system;
pub mod world;

pub use component::ComponentHooks;
pub use game_object::GameObject;
pub use query::QueryParam;
pub use system::{Schedule, System};
pub use world::{SpawnBundle, World};
