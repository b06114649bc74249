//! Convenience re-exports: `use neo::prelude::*` for the common items.

pub use crate::component::{
    BoundingBoxComponent, CameraComponent, CameraControllerComponent, CubeMapComponent, DiffuseMapComponent,
    FrustumBoundsComponent, FrustumComponent, LightComponent, LineComponent, MainCameraComponent,
    MaterialComponent, MeshComponent, MockOrthoComponent, MockPerspectiveComponent, MouseRayComponent,
    NormalMapComponent, Projection, ReflectionComponent, RefractionComponent, Renderable, SelectableComponent,
    SelectedComponent, SkyboxComponent, SpatialComponent, SpecularMapComponent,
};
pub use crate::config::EngineConfig;
pub use crate::ecs::{GameObject, System, World};
pub use crate::engine::{Engine, FrameReport, init_logging};
pub use crate::error::NeoError;
pub use crate::input::{Input, KeyCode, Mouse, MouseButton};
pub use crate::library::{Library, MeshHandle, TextureData, TextureHandle};
pub use crate::math::{Mat3, Mat4, Quat, UVec2, Vec2, Vec3, Vec4};
pub use crate::messaging::{
    ComponentSelectedMessage, KeyMessage, Messenger, MouseButtonMessage, WindowFrameSizeMessage,
};
pub use crate::render::shaders::{
    AlphaTestShader, DepthOfFieldShader, GBufferShader, GammaCorrectShader, LightPassShader, LineShader,
    PhongShader, PhongShadowShader, PostProcessShader, ReflectionShader, RefractionShader, ShadowCasterShader,
    SkyboxShader, WireframeShader,
};
pub use crate::render::{RenderContext, Renderer, Shader, ShaderProgram};
pub use crate::systems::{
    CameraControllerSystem, FittingMethod, FrustaFittingSystem, FrustumBoundsSystem, FrustumSystem,
    FrustumToLineSystem, MouseRaySystem, SelectingSystem,
};
pub use crate::time::Time;
