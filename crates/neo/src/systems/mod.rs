//! # Built-In Systems
//!
//! Applications register the ones they need, in the order they should run:
//!
//! ```text
//! CameraControllerSystem   input ──► camera spatial + fov
//! FrustumSystem            camera ──► FrustumComponent planes
//! FrustumBoundsSystem      camera ──► FrustumBoundsComponent corners
//! FrustumToLineSystem      corners ──► LineComponent (12 edges)
//! MouseRaySystem           cursor ──► MouseRayComponent on the main camera
//! SelectingSystem          ray ──► SelectedComponent + ComponentSelectedMessage
//! FrustaFittingSystem      mock perspective frustum ──► mock ortho camera
//! ```
//!
//! Each reads input from the `Input<KeyCode>`, `Input<MouseButton>` and
//! [`Mouse`](crate::input::Mouse) resources when it needs it and does
//! nothing if they are missing, so systems also run in bare test worlds.

mod camera_controller;
mod frusta_fitting;
mod frustum;
mod mouse_ray;
mod selecting;

pub use camera_controller::CameraControllerSystem;
pub use frusta_fitting::{FittingMethod, FrustaFittingSystem};
pub use frustum::{FrustumBoundsSystem, FrustumSystem, FrustumToLineSystem};
pub use mouse_ray::MouseRaySystem;
pub use selecting::SelectingSystem;
