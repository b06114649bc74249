//! Shadow mapping.
//!
//! A hundred random cubes float over a ground slab. The shadow caster pass
//! renders them from an orbiting orthographic light into the `"depthMap"`
//! framebuffer; the scene pass lights everything with Phong and darkens
//! what the shadow map says is occluded.
//!
//! Space pauses the light's orbit. Drag to look, WASD to fly.

use neo::prelude::*;
use neo::render::shaders::light_looking_at;
use rand::Rng;

const LIGHT_HEIGHT: f32 = 50.0;
const LIGHT_RADIUS: f32 = 40.0;
/// Radians per second.
const ORBIT_SPEED: f32 = 0.25;

fn orbit_light() -> impl FnMut(&mut World, f32) + 'static {
    let mut angle = 0.0_f32;
    let mut paused = false;
    move |world: &mut World, dt: f32| {
        if world.resource::<Input<KeyCode>>().just_pressed(KeyCode::Space) {
            paused = !paused;
        }
        if paused {
            return;
        }
        angle += ORBIT_SPEED * dt;
        let position = Vec3::new(angle.cos() * LIGHT_RADIUS, LIGHT_HEIGHT, angle.sin() * LIGHT_RADIUS);
        world.query_filtered::<&mut SpatialComponent, LightComponent>(|_, spatial| {
            *spatial = light_looking_at(position, Vec3::ZERO);
        });
    }
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("Shadows"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));
    if let Some(spatial) = engine.world_mut().get_mut::<SpatialComponent>(camera) {
        spatial.set_position(Vec3::new(0.0, 15.0, 45.0));
        spatial.set_look_dir(Vec3::new(0.0, -0.3, -1.0));
    }

    engine.spawn((
        light_looking_at(Vec3::new(LIGHT_RADIUS, LIGHT_HEIGHT, 0.0), Vec3::ZERO),
        LightComponent::new(Vec3::ONE, Vec3::ZERO),
        CameraComponent::orthographic(Vec2::new(-40.0, 40.0), Vec2::new(-40.0, 40.0), 1.0, 150.0),
    ));

    let Some(cube) = engine.world().resource::<Library>().get_mesh("cube") else {
        log::error!("library has no cube mesh");
        return Ok(());
    };

    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let position = Vec3::new(
            rng.gen_range(-25.0..25.0),
            rng.gen_range(0.0..25.0),
            rng.gen_range(-25.0..25.0),
        );
        let scale = Vec3::new(rng.gen_range(0.2..3.5), rng.gen_range(0.2..3.5), rng.gen_range(0.2..3.5));
        let diffuse = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
        engine.spawn((
            SpatialComponent::new(position, scale),
            MeshComponent(cube),
            MaterialComponent::new(0.2, diffuse, Vec3::ONE, 20.0),
            Renderable::<ShadowCasterShader>::new(),
            Renderable::<PhongShadowShader>::new(),
        ));
    }

    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(100.0, 0.5, 100.0)),
        MeshComponent(cube),
        MaterialComponent::new(0.2, Vec3::splat(0.7), Vec3::ZERO, 1.0),
        Renderable::<PhongShadowShader>::new(),
    ));

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(orbit_light());

    let renderer = engine.renderer_mut();
    renderer.add_preprocess_shader(ShadowCasterShader::new());
    renderer.add_scene_shader(PhongShadowShader::new());

    engine.run()
}
