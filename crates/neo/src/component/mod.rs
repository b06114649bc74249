//! # Components
//!
//! Plain data attached to game objects. Nothing here holds GPU state or a
//! reference to another component; meshes and textures are handles into the
//! [`Library`](crate::library::Library) and relations between objects are
//! [`GameObject`](crate::ecs::GameObject) handles.
//!
//! | Component | Read by |
//! |-----------|---------|
//! | [`SpatialComponent`] | everything with a position |
//! | [`CameraComponent`], [`FrustumComponent`], [`FrustumBoundsComponent`] | renderer, culling, frusta fitting |
//! | [`LightComponent`], [`MaterialComponent`] | lit shaders |
//! | [`DiffuseMapComponent`], [`SpecularMapComponent`], [`NormalMapComponent`] | lit and G-buffer shaders |
//! | [`SkyboxComponent`], [`CubeMapComponent`] | skybox shader, environment mapping |
//! | [`ReflectionComponent`], [`RefractionComponent`] | environment-mapped shaders |
//! | [`MeshComponent`], [`BoundingBoxComponent`] | shaders, culling, selection |
//! | [`LineComponent`] | line shader |
//! | [`MouseRayComponent`], [`SelectableComponent`], [`SelectedComponent`] | selection |
//! | [`Renderable<S>`] | shader `S` |

mod camera;
mod environment;
mod frustum;
mod light;
mod line;
mod material;
mod mesh;
pub mod renderable;
mod selecting;
mod spatial;

pub use camera::{
    CameraComponent, CameraControllerComponent, MainCameraComponent, MockOrthoComponent,
    MockPerspectiveComponent, Projection,
};
pub use environment::{
    CubeMapComponent, ReflectionComponent, RefractionComponent, SkyboxComponent, skybox_cube_map,
};
pub use frustum::{FrustumBoundsComponent, FrustumComponent};
pub use light::LightComponent;
pub use line::LineComponent;
pub use material::{DiffuseMapComponent, MaterialComponent, NormalMapComponent, SpecularMapComponent};
pub use mesh::{BoundingBoxComponent, MeshComponent};
pub use renderable::{Renderable, ShaderAttachments, register_renderable};
pub use selecting::{MouseRayComponent, SelectableComponent, SelectedComponent};
pub use spatial::SpatialComponent;
