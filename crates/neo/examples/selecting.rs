//! Mouse picking.
//!
//! Hold the left mouse button over a sphere to select it: the selecting
//! system marches the cursor ray, selected spheres turn red and the rest
//! stay white. The ray itself is drawn as a line. Each sphere logs when it
//! is selected.
//!
//! Drag to look, WASD to fly. Hold C while clicking to clear the selection.

use std::f32::consts::FRAC_PI_2;

use neo::prelude::*;
use rand::Rng;

const RED: Vec3 = Vec3::new(1.0, 0.0, 0.0);

fn spawn_spheres(engine: &mut Engine, count: usize) {
    let library = engine.world().resource::<Library>();
    let Some(sphere) = library.get_mesh("sphere") else {
        log::error!("library has no sphere mesh");
        return;
    };
    let positions: Vec<Vec3> = library.mesh(sphere).positions().collect();
    let bounds = BoundingBoxComponent::from_positions(&positions);

    let mut rng = rand::thread_rng();
    for _ in 0..count {
        let position = Vec3::new(rng.gen_range(-7.5..7.5), 0.0, rng.gen_range(-7.5..7.5));
        let object = engine.spawn((
            SpatialComponent::at(position),
            MeshComponent(sphere),
            MaterialComponent::new(0.2, Vec3::new(1.0, 0.0, 1.0), Vec3::ONE, 20.0),
            bounds,
            SelectableComponent,
            Renderable::<PhongShader>::new(),
        ));
        engine
            .messenger_mut()
            .add_receiver_for(object, move |_world: &mut World, msg: &ComponentSelectedMessage| {
                log::info!("{object:?} selected at {:.2}", msg.hit);
            });
    }
}

fn set_diffuse(world: &mut World, object: GameObject, color: Vec3) {
    if let Some(material) = world.get_mut::<MaterialComponent>(object) {
        material.diffuse = color;
    }
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("Selecting"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));

    engine.spawn((
        SpatialComponent::at(Vec3::new(0.0, 2.0, 20.0)),
        LightComponent::new(Vec3::ONE, Vec3::new(0.6, 0.2, 0.0)),
    ));

    spawn_spheres(&mut engine, 30);

    let library = engine.world().resource::<Library>();
    if let (Some(quad), Some(grid)) = (library.get_mesh("quad"), library.get_texture("grid")) {
        engine.spawn((
            SpatialComponent::new(Vec3::ZERO, Vec3::splat(15.0)).with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
            MeshComponent(quad),
            MaterialComponent::new(0.2, Vec3::new(1.0, 0.0, 1.0), Vec3::ONE, 20.0),
            DiffuseMapComponent(grid),
            Renderable::<AlphaTestShader>::new(),
        ));
    }

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(MouseRaySystem::new(true));
    engine.add_system(
        SelectingSystem::new(20, 100.0)
            .with_remove_decider(|world, _| {
                world
                    .get_resource::<Input<KeyCode>>()
                    .is_some_and(|keys| keys.pressed(KeyCode::KeyC))
            })
            .with_reset_op(|world, object| set_diffuse(world, object, Vec3::ONE))
            .with_select_op(|world, object, _hit| set_diffuse(world, object, RED)),
    );

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(PhongShader::new());
    renderer.add_scene_shader(AlphaTestShader::new());
    renderer.add_scene_shader(LineShader::new());
    renderer.add_post_process_shader(GammaCorrectShader::default());

    engine.run()
}
