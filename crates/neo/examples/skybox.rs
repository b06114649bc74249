//! Skybox with reflection and refraction.
//!
//! The built-in `"sky"` cube map surrounds the scene. A mirrored sphere and
//! a glass cube both sample it: the sphere along the reflected view ray, the
//! cube along the refracted one. R cycles the cube's refraction ratio
//! through water, glass and diamond.

use neo::prelude::*;

const RATIOS: [(&str, f32); 3] = [
    ("water", RefractionComponent::WATER),
    ("glass", RefractionComponent::GLASS),
    ("diamond", 1.0 / 2.42),
];

fn cycle_ratio() -> impl FnMut(&mut World, f32) + 'static {
    let mut index = 0;
    move |world: &mut World, _dt: f32| {
        if !world.resource::<Input<KeyCode>>().just_pressed(KeyCode::KeyR) {
            return;
        }
        index = (index + 1) % RATIOS.len();
        let (name, ratio) = RATIOS[index];
        log::info!("refraction ratio: {name} ({ratio:.3})");
        world.query::<(&mut RefractionComponent,)>(|_, (refraction,)| refraction.ratio = ratio);
    }
}

fn spin(world: &mut World, dt: f32) {
    world.query_filtered::<&mut SpatialComponent, RefractionComponent>(|_, spatial| {
        spatial.rotate(Mat3::from_rotation_y(dt * 0.5));
    });
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("Skybox"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));
    if let Some(spatial) = engine.world_mut().get_mut::<SpatialComponent>(camera) {
        spatial.set_position(Vec3::new(0.0, 1.0, 9.0));
    }

    let library = engine.world().resource::<Library>();
    let (Some(sky), Some(sphere), Some(cube)) = (
        library.get_texture("sky"),
        library.get_mesh("sphere"),
        library.get_mesh("cube"),
    ) else {
        log::error!("library is missing the sky cube map or a mesh");
        return Ok(());
    };

    engine.spawn((SkyboxComponent, CubeMapComponent(sky)));
    engine.spawn((
        SpatialComponent::new(Vec3::new(-2.5, 0.0, 0.0), Vec3::splat(1.5)),
        MeshComponent(sphere),
        ReflectionComponent,
    ));
    engine.spawn((
        SpatialComponent::new(Vec3::new(2.5, 0.0, 0.0), Vec3::splat(1.5)),
        MeshComponent(cube),
        RefractionComponent::new(RATIOS[0].1),
    ));

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(cycle_ratio());
    engine.add_system(spin);

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(SkyboxShader::new());
    renderer.add_scene_shader(ReflectionShader::new());
    renderer.add_scene_shader(RefractionShader::new());

    engine.run()
}
