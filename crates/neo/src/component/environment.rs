//! Environment mapping.
//!
//! ```text
//! SkyboxComponent + CubeMapComponent   one object, drawn around the camera
//!        │ cube map
//!        ├──► ReflectionComponent   mirror objects sample reflect(view, normal)
//!        └──► RefractionComponent   glassy objects sample refract(view, normal, ratio)
//! ```

use crate::ecs::{GameObject, World};
use crate::library::TextureHandle;

/// A cube map texture from the [`Library`](crate::library::Library).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeMapComponent(pub TextureHandle);

/// Marks the object whose [`CubeMapComponent`] is the sky. At most one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkyboxComponent;

/// Draws the object as a mirror of the skybox.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionComponent;

/// Draws the object as a see-through surface bending the skybox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefractionComponent {
    /// Ratio of refractive indices, outside over inside.
    pub ratio: f32,
}

impl RefractionComponent {
    /// Air into water.
    pub const WATER: f32 = 1.0 / 1.33;
    /// Air into glass.
    pub const GLASS: f32 = 1.0 / 1.52;

    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }
}

impl Default for RefractionComponent {
    fn default() -> Self {
        Self::new(Self::WATER)
    }
}

/// The skybox object and its cube map, if both exist.
pub fn skybox_cube_map(world: &World) -> Option<(GameObject, TextureHandle)> {
    let sky = world.single::<SkyboxComponent>()?;
    let cube = world.get::<CubeMapComponent>(sky)?;
    Some((sky, cube.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;

    #[test]
    fn skybox_needs_its_cube_map() {
        let mut world = World::new();
        let sky = world.spawn_one(SkyboxComponent);
        assert!(skybox_cube_map(&world).is_none());

        let texture = Library::new().get_texture("sky").unwrap();
        world.insert(sky, CubeMapComponent(texture));
        assert_eq!(skybox_cube_map(&world), Some((sky, texture)));
    }

    #[test]
    fn refraction_defaults_to_water() {
        assert!((RefractionComponent::default().ratio - 0.7519).abs() < 1e-3);
        assert!(RefractionComponent::new(RefractionComponent::GLASS).ratio < RefractionComponent::WATER);
    }
}
