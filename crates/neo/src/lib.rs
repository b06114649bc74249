//! # Neo: Component-Based Rendering Engine
//!
//! A small engine for trying out rendering techniques: game objects carry
//! plain-data components, systems update them once per frame, and shaders
//! attached through [`Renderable<S>`](component::Renderable) markers record
//! draw calls that a wgpu backend presents.
//!
//! ```text
//! Engine::tick
//!   relay messages ─► systems ─► renderer (pre ─► scene ─► post) ─► kill queue
//! ```
//!
//! Start with `use neo::prelude::*` and build an [`Engine`](engine::Engine).

pub mod component;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod input;
pub mod library;
pub mod math;
pub mod mesh;
pub mod messaging;
pub mod prelude;
pub mod render;
pub mod systems;
pub mod time;
pub(crate) mod window;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use engine::init_logging;
