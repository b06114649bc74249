//! Frusta fitting.
//!
//! A mock perspective camera sweeps around the origin while a mock
//! orthographic camera is fitted to its frustum, the way a shadow map
//! camera would be. Both frusta are drawn as lines: perspective in green,
//! ortho in yellow.
//!
//! | Key | Effect |
//! |-----|--------|
//! | M | next fitting method (Dumb, Naive, A, B) |
//! | P | pause or resume the perspective sweep |
//! | O | pause or resume the ortho fit |
//!
//! Drag to look, WASD to fly.

use std::f32::consts::FRAC_PI_2;

use neo::prelude::*;

/// Key bindings wrapped around the fitting system it drives.
struct FittingControls {
    fitting: FrustaFittingSystem,
}

impl System for FittingControls {
    fn name(&self) -> String {
        self.fitting.name()
    }

    fn init(&mut self, world: &mut World) {
        self.fitting.init(world);
        log::info!("fitting method: {:?}", self.fitting.method);
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        if let Some(keys) = world.get_resource::<Input<KeyCode>>() {
            if keys.just_pressed(KeyCode::KeyM) {
                self.fitting.method = self.fitting.method.next();
                log::info!("fitting method: {:?}", self.fitting.method);
            }
            if keys.just_pressed(KeyCode::KeyP) {
                self.fitting.update_perspective = !self.fitting.update_perspective;
            }
            if keys.just_pressed(KeyCode::KeyO) {
                self.fitting.update_ortho = !self.fitting.update_ortho;
            }
        }
        self.fitting.update(world, dt);
    }
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("FrustaFitting"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));
    if let Some(spatial) = engine.world_mut().get_mut::<SpatialComponent>(camera) {
        spatial.set_position(Vec3::new(0.0, 8.0, 25.0));
        spatial.set_look_dir(-spatial.position);
    }

    engine.spawn((
        SpatialComponent::at(Vec3::new(0.0, 20.0, 20.0)),
        LightComponent::new(Vec3::ONE, Vec3::new(0.0, 0.02, 0.0)),
    ));

    engine.spawn((
        SpatialComponent::at(Vec3::ZERO),
        CameraComponent::perspective(45.0, 1.0, 10.0),
        FrustumBoundsComponent::default(),
        LineComponent::world(Vec3::new(0.0, 1.0, 0.0)),
        MockPerspectiveComponent,
    ));

    engine.spawn((
        SpatialComponent::at(Vec3::new(0.0, 5.0, 5.0)),
        CameraComponent::orthographic(Vec2::new(-2.0, 2.0), Vec2::new(-2.0, 2.0), 0.1, 5.0),
        FrustumBoundsComponent::default(),
        LineComponent::world(Vec3::new(1.0, 1.0, 0.0)),
        MockOrthoComponent::new(10.0, 15.0),
    ));

    let library = engine.world().resource::<Library>();
    if let (Some(quad), Some(grid)) = (library.get_mesh("quad"), library.get_texture("grid")) {
        engine.spawn((
            SpatialComponent::new(Vec3::new(0.0, -2.0, 0.0), Vec3::splat(30.0))
                .with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
            MeshComponent(quad),
            DiffuseMapComponent(grid),
            Renderable::<AlphaTestShader>::new(),
        ));
    }

    // Fit first, then derive the corners and edges from the updated cameras.
    engine.add_system(CameraControllerSystem::new());
    engine.add_system(FittingControls {
        fitting: FrustaFittingSystem::new(FittingMethod::Naive),
    });
    engine.add_system(FrustumBoundsSystem);
    engine.add_system(FrustumToLineSystem);

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(AlphaTestShader::new());
    renderer.add_scene_shader(LineShader::new());

    engine.run()
}
