//! Post-process chain.
//!
//! A lit, textured cube spins in front of the camera. The scene is rendered
//! into the `"default"` framebuffer and then passed through three fullscreen
//! passes, ping-ponging between `"ping"` and `"pong"`:
//!
//! ```text
//! scene ─► DepthShader ─► BlueShader ─► InvertShader ─► backbuffer
//! ```
//!
//! D, B and I fade the depth, blue and invert effects in and out. The pass
//! uniforms are read from the [`Effects`] resource each frame.

use neo::prelude::*;

/// Strength of each effect, 0 to 1.
#[derive(Debug, Clone, Copy)]
struct Effects {
    depth: f32,
    blue: f32,
    invert: f32,
}

/// Seconds for a full fade in or out.
const FADE_SECS: f32 = 0.5;

/// Keys flip the target of each effect; the strengths ease toward it.
fn fade_effects() -> impl FnMut(&mut World, f32) + 'static {
    let mut target = [0.0_f32, 1.0, 0.0];
    move |world: &mut World, dt: f32| {
        let keys = world.resource::<Input<KeyCode>>();
        for (i, key) in [KeyCode::KeyD, KeyCode::KeyB, KeyCode::KeyI].into_iter().enumerate() {
            if keys.just_pressed(key) {
                target[i] = 1.0 - target[i];
            }
        }
        let step = dt / FADE_SECS;
        let effects = world.resource_mut::<Effects>();
        for (value, goal) in [&mut effects.depth, &mut effects.blue, &mut effects.invert]
            .into_iter()
            .zip(target)
        {
            *value += (goal - *value).clamp(-step, step);
        }
    }
}

fn spin(world: &mut World, dt: f32) {
    world.query_filtered::<&mut SpatialComponent, Spinning>(|_, spatial| {
        spatial.rotate(Mat3::from_rotation_y(dt * 0.8));
    });
}

struct Spinning;

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("Post Process"));
    engine.world_mut().insert_resource(Effects {
        depth: 0.0,
        blue: 1.0,
        invert: 0.0,
    });

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));

    engine.spawn((
        SpatialComponent::at(Vec3::new(0.0, 2.0, 20.0)),
        LightComponent::new(Vec3::ONE, Vec3::new(0.6, 0.2, 0.0)),
    ));

    let library = engine.world().resource::<Library>();
    if let (Some(cube), Some(grid)) = (library.get_mesh("cube"), library.get_texture("grid")) {
        engine.spawn((
            SpatialComponent::at(Vec3::ZERO).with_rotation(Vec3::new(0.4, 0.0, 0.2)),
            MeshComponent(cube),
            MaterialComponent::new(0.2, Vec3::new(1.0, 0.0, 1.0), Vec3::ONE, 20.0),
            DiffuseMapComponent(grid),
            Renderable::<PhongShader>::new(),
            Spinning,
        ));
    }

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(fade_effects());
    engine.add_system(spin);

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(PhongShader::new());
    renderer.add_post_process_shader(
        PostProcessShader::new("DepthShader", "depth.frag")
            .with_uniform_names(&["strength", "near", "far"])
            .with_uniforms(|program, cmd, world| {
                program.load_uniform(cmd, "strength", world.resource::<Effects>().depth);
                let camera = world
                    .single::<MainCameraComponent>()
                    .and_then(|go| world.get::<CameraComponent>(go));
                if let Some(camera) = camera {
                    program.load_uniform(cmd, "near", camera.near);
                    program.load_uniform(cmd, "far", camera.far);
                }
            }),
    );
    renderer.add_post_process_shader(
        PostProcessShader::new("BlueShader", "blue.frag")
            .with_uniform_names(&["strength"])
            .with_uniforms(|program, cmd, world| {
                program.load_uniform(cmd, "strength", world.resource::<Effects>().blue);
            }),
    );
    renderer.add_post_process_shader(
        PostProcessShader::new("InvertShader", "invert.frag")
            .with_uniform_names(&["strength"])
            .with_uniforms(|program, cmd, world| {
                program.load_uniform(cmd, "strength", world.resource::<Effects>().invert);
            }),
    );

    engine.run()
}
