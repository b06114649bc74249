use glam::Vec3;

use crate::library::TextureHandle;

/// Blinn-Phong surface parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialComponent {
    pub ambient: f32,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shine: f32,
}

impl MaterialComponent {
    pub fn new(ambient: f32, diffuse: Vec3, specular: Vec3, shine: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            shine,
        }
    }

    pub fn diffuse(diffuse: Vec3) -> Self {
        Self {
            diffuse,
            ..Self::default()
        }
    }
}

impl Default for MaterialComponent {
    fn default() -> Self {
        Self::new(0.2, Vec3::ONE, Vec3::ONE, 20.0)
    }
}

/// Texture sampled for the diffuse color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffuseMapComponent(pub TextureHandle);

/// Texture sampled for the specular color. Replaces the material's
/// specular color and shine where a shader supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecularMapComponent(pub TextureHandle);

/// Tangent-space normals. A shader that reads it skips the `N` matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalMapComponent(pub TextureHandle);
