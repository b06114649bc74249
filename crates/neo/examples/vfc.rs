//! View-frustum culling.
//!
//! Randomly sized spheres scattered over a textured ground plane, each drawn
//! lit by the Phong shader and again as a wireframe of its bounding sphere.
//! Spheres outside the camera frustum are culled; the cull count is logged
//! once a second.
//!
//! R regenerates the spheres. Up/Down multiply or divide their count by ten.
//! Drag to look, WASD to fly.

use std::f32::consts::FRAC_PI_2;

use neo::prelude::*;
use neo::render::RenderStats;
use rand::Rng;

const INITIAL_COUNT: usize = 10;

/// Tags everything [`generate_objects`] spawns so it can be cleared.
struct Generated;

fn generate_objects(world: &mut World, amount: usize) {
    for object in world.collect::<Generated>() {
        world.queue_destroy(object);
    }

    let library = world.resource::<Library>();
    let Some(sphere) = library.get_mesh("sphere") else {
        log::error!("library has no sphere mesh");
        return;
    };
    let positions: Vec<Vec3> = library.mesh(sphere).positions().collect();
    let bounds = BoundingBoxComponent::from_positions(&positions);

    let mut rng = rand::thread_rng();
    for _ in 0..amount {
        let position = Vec3::new(rng.gen_range(-15.0..15.0), 0.0, rng.gen_range(-15.0..15.0));
        let size = Vec3::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0));

        world.spawn((
            SpatialComponent::new(position, size),
            MeshComponent(sphere),
            MaterialComponent::new(0.2, position.normalize_or_zero(), Vec3::ONE, 20.0),
            bounds,
            Renderable::<PhongShader>::new(),
            Generated,
        ));

        // Bounding sphere, drawn separately so it is never culled.
        world.spawn((
            SpatialComponent::new(position, Vec3::splat(size.max_element())),
            MeshComponent(sphere),
            Renderable::<WireframeShader>::new(),
            Generated,
        ));
    }
    log::info!("generated {amount} spheres");
}

/// R regenerates; Up/Down scale the object count between 1 and 10000.
fn regenerate(mut count: usize) -> impl FnMut(&mut World, f32) + 'static {
    move |world: &mut World, _dt: f32| {
        let keys = world.resource::<Input<KeyCode>>();
        let mut changed = keys.just_pressed(KeyCode::KeyR);
        if keys.just_pressed(KeyCode::ArrowUp) {
            count = (count * 10).min(10_000);
            changed = true;
        }
        if keys.just_pressed(KeyCode::ArrowDown) {
            count = (count / 10).max(1);
            changed = true;
        }
        if changed {
            generate_objects(world, count);
        }
    }
}

fn report_culling() -> impl FnMut(&mut World, f32) + 'static {
    let mut since_report = 0.0;
    move |world: &mut World, dt: f32| {
        since_report += dt;
        if since_report < 1.0 {
            return;
        }
        since_report = 0.0;
        if let Some(stats) = world.get_resource::<RenderStats>() {
            log::info!("draws: {}, culled: {}", stats.total_draws(), stats.total_culled());
        }
    }
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("VFC"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));
    engine.add_component(camera, FrustumComponent::default());

    engine.spawn((
        SpatialComponent::at(Vec3::new(-100.0, 100.0, 100.0)),
        LightComponent::new(Vec3::ONE, Vec3::new(0.0, 0.015, 0.0)),
    ));

    generate_objects(engine.world_mut(), INITIAL_COUNT);

    let library = engine.world().resource::<Library>();
    if let (Some(quad), Some(grid)) = (library.get_mesh("quad"), library.get_texture("grid")) {
        engine.spawn((
            SpatialComponent::new(Vec3::ZERO, Vec3::splat(30.0)).with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
            MeshComponent(quad),
            DiffuseMapComponent(grid),
            Renderable::<AlphaTestShader>::new(),
        ));
    }

    // Order matters: the frustum must follow the camera's move this frame.
    engine.add_system(CameraControllerSystem::new());
    engine.add_system(FrustumSystem);
    engine.add_system(regenerate(INITIAL_COUNT));
    engine.add_system(report_culling());

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(AlphaTestShader::new());
    renderer.add_scene_shader(PhongShader::new());
    renderer.add_scene_shader(LineShader::new());
    renderer.add_scene_shader(WireframeShader::new());
    renderer.add_post_process_shader(GammaCorrectShader::default());

    engine.run()
}
