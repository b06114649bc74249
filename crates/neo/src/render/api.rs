//! # Command Buffer: The Draw-Call Surface
//!
//! Shaders never talk to the GPU. They record what they want into a
//! [`CommandBuffer`], in the order a GL-style immediate API would execute
//! it:
//!
//! ```text
//! Phase(Scene)
//! BindFramebuffer(Backbuffer)  Viewport(1280×720)  Clear { color, depth }
//! UseProgram("phong")
//!   SetUniform P, V, camPos, lightPos ...        once per shader
//!   SetUniform M, N, diffuseColor ...            per object
//!   DrawMesh(sphere)
//! ```
//!
//! The buffer is then handed to a backend (the wgpu presenter) or simply
//! inspected, which is how the renderer and every shader are tested without
//! a window.

use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};

use crate::library::{MeshHandle, TextureHandle};

/// Where draw output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferTarget {
    Backbuffer,
    Named(String),
}

impl FramebufferTarget {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// Which part of the frame a run of commands belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    PreProcess,
    Scene,
    PostProcess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

/// Depth comparison. `LessEqual` lets a skybox drawn at the far plane pass
/// against a cleared depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
}

/// Color blending for subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Off,
    /// `src + dst`, for accumulating light volumes.
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

macro_rules! impl_uniform_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$ty> for UniformValue {
            fn from(value: $ty) -> Self {
                UniformValue::$variant(value)
            }
        })+
    };
}

impl_uniform_from!(
    bool => Bool,
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
);

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Phase(RenderPhase),
    BindFramebuffer(FramebufferTarget),
    Viewport(UVec2),
    Clear { color: Option<Vec4>, depth: bool },
    DepthTest(bool),
    DepthFunc(DepthFunc),
    Blend(BlendMode),
    Cull(CullMode),
    PolygonMode(PolygonMode),
    UseProgram(String),
    SetUniform {
        location: u32,
        name: String,
        value: UniformValue,
    },
    BindTexture { unit: u32, texture: TextureHandle },
    DrawMesh(MeshHandle),
    /// World-space segments, two nodes each.
    DrawLines(Vec<Vec3>),
}

/// Ordered list of render commands for one frame.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<RenderCommand>,
    draws: u32,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        if matches!(
            command,
            RenderCommand::DrawMesh(_) | RenderCommand::DrawLines(_)
        ) {
            self.draws += 1;
        }
        self.commands.push(command);
    }

    pub fn phase(&mut self, phase: RenderPhase) {
        self.push(RenderCommand::Phase(phase));
    }

    pub fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        self.push(RenderCommand::BindFramebuffer(target));
    }

    pub fn viewport(&mut self, size: UVec2) {
        self.push(RenderCommand::Viewport(size));
    }

    pub fn clear(&mut self, color: Option<Vec4>, depth: bool) {
        self.push(RenderCommand::Clear { color, depth });
    }

    pub fn depth_test(&mut self, enabled: bool) {
        self.push(RenderCommand::DepthTest(enabled));
    }

    pub fn depth_func(&mut self, func: DepthFunc) {
        self.push(RenderCommand::DepthFunc(func));
    }

    pub fn blend(&mut self, mode: BlendMode) {
        self.push(RenderCommand::Blend(mode));
    }

    pub fn cull(&mut self, mode: CullMode) {
        self.push(RenderCommand::Cull(mode));
    }

    pub fn polygon_mode(&mut self, mode: PolygonMode) {
        self.push(RenderCommand::PolygonMode(mode));
    }

    pub fn draw_mesh(&mut self, mesh: MeshHandle) {
        self.push(RenderCommand::DrawMesh(mesh));
    }

    pub fn draw_lines(&mut self, nodes: Vec<Vec3>) {
        self.push(RenderCommand::DrawLines(nodes));
    }

    /// Number of draw commands recorded so far.
    pub fn draw_count(&self) -> u32 {
        self.draws
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn take(&mut self) -> Vec<RenderCommand> {
        self.draws = 0;
        std::mem::take(&mut self.commands)
    }

    /// Latest value recorded for uniform `name`, for tests and debugging.
    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.commands.iter().rev().find_map(|c| match c {
            RenderCommand::SetUniform { name: n, value, .. } if n == name => Some(*value),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_counted() {
        let mut cmd = CommandBuffer::new();
        cmd.clear(Some(Vec4::ONE), true);
        cmd.draw_mesh(MeshHandle(0));
        cmd.draw_lines(vec![Vec3::ZERO, Vec3::X]);
        assert_eq!(cmd.draw_count(), 2);
        assert_eq!(cmd.len(), 3);

        let taken = cmd.take();
        assert_eq!(taken.len(), 3);
        assert!(cmd.is_empty());
        assert_eq!(cmd.draw_count(), 0);
    }

    #[test]
    fn pipeline_state_is_hashable() {
        use std::collections::HashSet;

        let culls: HashSet<CullMode> = [CullMode::None, CullMode::Back, CullMode::Front, CullMode::Back]
            .into_iter()
            .collect();
        assert_eq!(culls.len(), 3);
        let state: HashSet<(CullMode, DepthFunc, BlendMode)> = [
            (CullMode::Back, DepthFunc::Less, BlendMode::Off),
            (CullMode::None, DepthFunc::LessEqual, BlendMode::Off),
            (CullMode::Front, DepthFunc::Less, BlendMode::Additive),
        ]
        .into_iter()
        .collect();
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn last_uniform_finds_latest_value() {
        let mut cmd = CommandBuffer::new();
        for v in [1.0f32, 2.0] {
            cmd.push(RenderCommand::SetUniform {
                location: 0,
                name: "shine".into(),
                value: v.into(),
            });
        }
        assert_eq!(cmd.last_uniform("shine"), Some(UniformValue::Float(2.0)));
        assert_eq!(cmd.last_uniform("missing"), None);
    }
}
