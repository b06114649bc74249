//! Math types.
//!
//! Re-exports [glam](https://docs.rs/glam) so applications don't need to
//! depend on it directly. Projection matrices follow OpenGL conventions
//! (`*_rh_gl`); see [`CameraComponent`](crate::component::CameraComponent).

pub use glam::{Mat3, Mat4, Quat, UVec2, Vec2, Vec3, Vec4};
