//! # Built-In Shaders
//!
//! | Shader | List | Draws |
//! |--------|------|-------|
//! | [`PhongShader`] | scene | lit meshes, material + optional diffuse map, frustum culled |
//! | [`AlphaTestShader`] | scene | textured meshes, fragments under the alpha cutoff discarded |
//! | [`WireframeShader`] | scene | mesh edges, no culling |
//! | [`LineShader`] | scene | [`LineComponent`](crate::component::LineComponent) segments |
//! | [`ShadowCasterShader`] | pre-process | depth from the light's camera into `"depthMap"` |
//! | [`PhongShadowShader`] | scene | lit meshes sampling `"depthMap"` |
//! | [`GBufferShader`] | pre-process | surface attributes into `"gbuffer"` |
//! | [`LightPassShader`] | pre-process | light volumes shaded from the G-buffer into `"lightpass"` |
//! | [`SkyboxShader`] | scene | the skybox cube map around the camera |
//! | [`ReflectionShader`], [`RefractionShader`] | scene | environment-mapped meshes |
//! | [`PostProcessShader`] | post-process | fullscreen pass over the previous color |
//! | [`DepthOfFieldShader`] | post-process | depth-weighted blur over the previous color |
//! | [`GammaCorrectShader`] | post-process | `pow(color, 1 / gamma)` |
//!
//! The engine ships program interfaces only. A backend that compiles GLSL
//! loads the sources itself, or a demo builds its program with
//! [`ShaderProgram::from_files`](super::ShaderProgram::from_files).

mod alpha_test;
mod deferred;
mod line;
mod phong;
mod post_process;
mod shadow;
mod skybox;
mod wireframe;

pub use alpha_test::AlphaTestShader;
pub use deferred::{GBUFFER_ATTACHMENTS, GBUFFER_FBO, GBufferShader, LIGHT_PASS_FBO, LightPassShader, light_volume};
pub use line::LineShader;
pub use phong::PhongShader;
pub use post_process::{DepthOfFieldShader, GammaCorrectShader, PostProcessShader};
pub use shadow::{
    PhongShadowShader, SHADOW_MAP_FBO, SHADOW_MAP_SIZE, ShadowCasterShader, light_looking_at, shadow_bias,
};
pub use skybox::{ReflectionShader, RefractionShader, SkyboxShader};
pub use wireframe::WireframeShader;

use crate::component::{
    BoundingBoxComponent, DiffuseMapComponent, FrustumComponent, MaterialComponent, MeshComponent,
    SpatialComponent,
};
use crate::ecs::GameObject;
use crate::library::MeshHandle;

use super::program::ShaderProgram;
use super::shader::RenderContext;

/// Mesh and spatial of `object`, the minimum needed to draw it.
pub(crate) fn drawable(ctx: &RenderContext<'_>, object: GameObject) -> Option<(MeshHandle, SpatialComponent)> {
    let mesh = ctx.world.get::<MeshComponent>(object)?;
    let spatial = ctx.world.get::<SpatialComponent>(object)?;
    Some((mesh.0, *spatial))
}

/// View-frustum culling. An object is kept unless it has a bounding box and
/// its bounding sphere (radius scaled by the largest axis scale) is outside
/// `frustum`. Culled objects are counted on the context.
pub(crate) fn cull(
    ctx: &mut RenderContext<'_>,
    frustum: Option<&FrustumComponent>,
    object: GameObject,
    spatial: &SpatialComponent,
) -> bool {
    let (Some(frustum), Some(bounds)) = (frustum, ctx.world.get::<BoundingBoxComponent>(object)) else {
        return false;
    };
    let radius = spatial.max_scale() * bounds.radius();
    if frustum.is_in_frustum(spatial.position, radius) {
        false
    } else {
        ctx.culled += 1;
        true
    }
}

/// Loads `M` and `N` for `spatial`.
pub(crate) fn load_transform(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>, spatial: &SpatialComponent) {
    program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
    program.load_uniform(ctx.cmd, "N", spatial.normal_matrix());
}

/// Loads `ambient`, `diffuseColor`, `specularColor` and `shine` when the
/// object has a material.
pub(crate) fn load_material(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>, object: GameObject) {
    let Some(material) = ctx.world.get::<MaterialComponent>(object).copied() else {
        return;
    };
    program.load_uniform(ctx.cmd, "ambient", material.ambient);
    program.load_uniform(ctx.cmd, "diffuseColor", material.diffuse);
    program.load_uniform(ctx.cmd, "specularColor", material.specular);
    program.load_uniform(ctx.cmd, "shine", material.shine);
}

/// Binds the object's diffuse map and sets `useTexture` accordingly.
pub(crate) fn load_diffuse_map(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>, object: GameObject) -> bool {
    program.reset_texture_units();
    match ctx.world.get::<DiffuseMapComponent>(object).copied() {
        Some(map) => {
            program.load_texture(ctx.cmd, "diffuseMap", map.0);
            program.load_uniform(ctx.cmd, "useTexture", true);
            true
        }
        None => {
            program.load_uniform(ctx.cmd, "useTexture", false);
            false
        }
    }
}
