//! # Render: Shaders, Renderer and GPU Backend
//!
//! ```text
//! Renderer ──► Shader::render(ctx) ──► CommandBuffer ──► Vec<RenderCommand>
//!                    │                                         │
//!              ShaderProgram                               WgpuBackend
//!       (uniform locations, texture units)          (plan, upload, present)
//! ```
//!
//! Everything above the backend runs without a GPU.

pub mod api;
pub mod backend;
pub mod gpu;
pub mod program;
pub mod renderer;
pub mod shader;
pub mod shaders;

pub use api::{
    BlendMode, CommandBuffer, CullMode, DepthFunc, FramebufferTarget, PolygonMode, RenderCommand, RenderPhase,
    UniformValue,
};
pub use backend::WgpuBackend;
pub use gpu::GpuContext;
pub use program::{ShaderProgram, ShaderStage, StageKind};
pub use renderer::{FrameSize, PING_FBO, PONG_FBO, PassStats, RenderStats, Renderer, SCENE_FBO};
pub use shader::{CameraUniforms, PostProcessInput, RenderContext, Shader};
