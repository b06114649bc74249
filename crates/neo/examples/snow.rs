//! Snow accumulation.
//!
//! A custom shader whitens the faces of a mesh that point into the falling
//! snow and adds a rim light. The snow direction comes from the orientation
//! of a separate "snow" object, drawn as a green line.
//!
//! | Key | Effect |
//! |-----|--------|
//! | Arrows | tilt the snow direction |
//! | [ / ] | less / more snow |
//! | - / = | thinner / thicker snow |
//!
//! Drag to look, WASD to fly.

use neo::prelude::*;

// ── Snow Component ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SnowComponent {
    /// Direction snow piles up on, unit length. Kept in step with the
    /// object's orientation by [`SnowSystem`].
    snow_angle: Vec3,
    snow_color: Vec3,
    /// Fraction of facing surfaces covered, 0 to 1.
    snow_size: f32,
    /// Extrusion of covered vertices along their normal.
    height: f32,
    rim_color: Vec3,
    rim_power: f32,
}

impl Default for SnowComponent {
    fn default() -> Self {
        Self {
            snow_angle: Vec3::Y,
            snow_color: Vec3::splat(0.95),
            snow_size: 0.6,
            height: 0.05,
            rim_color: Vec3::new(0.6, 0.7, 1.0),
            rim_power: 4.0,
        }
    }
}

// ── Snow System ─────────────────────────────────────────────────────────

/// Radians per second of tilt while an arrow key is held.
const TILT_SPEED: f32 = 1.2;

#[derive(Default)]
struct SnowSystem;

impl System for SnowSystem {
    fn name(&self) -> String {
        "Snow System".into()
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let keys = world.resource::<Input<KeyCode>>();
        let axis = |pos: KeyCode, neg: KeyCode| (keys.pressed(pos) as i32 - keys.pressed(neg) as i32) as f32;
        let tilt = Vec2::new(
            axis(KeyCode::ArrowDown, KeyCode::ArrowUp),
            axis(KeyCode::ArrowRight, KeyCode::ArrowLeft),
        ) * TILT_SPEED
            * dt;
        let size = axis(KeyCode::BracketRight, KeyCode::BracketLeft) * dt;
        let height = axis(KeyCode::Equal, KeyCode::Minus) * 0.1 * dt;

        world.query::<(&mut SnowComponent, &mut SpatialComponent)>(|_, (snow, spatial)| {
            if tilt != Vec2::ZERO {
                spatial.rotate(Mat3::from_rotation_x(tilt.x) * Mat3::from_rotation_z(tilt.y));
            }
            snow.snow_angle = (spatial.orientation * Vec3::Y).normalize_or(Vec3::Y);
            snow.snow_size = (snow.snow_size + size).clamp(0.0, 1.0);
            snow.height = (snow.height + height).clamp(0.0, 0.25);
        });
    }
}

// ── Snow Shader ─────────────────────────────────────────────────────────

struct SnowShader {
    program: ShaderProgram,
}

impl SnowShader {
    fn new() -> Self {
        Self {
            program: ShaderProgram::new("Snow Shader")
                .with_attributes(&["vertPos", "vertNor", "vertTex"])
                .with_uniforms(&[
                    "P", "V", "M", "N", "camPos", "lightPos", "lightCol", "lightAtt", "ambient",
                    "diffuseColor", "specularColor", "shine", "snowAngle", "snowColor", "snowSize",
                    "height", "rimColor", "rimPower",
                ]),
        }
    }
}

impl Shader for SnowShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(snow) = ctx
            .world
            .single::<SnowComponent>()
            .and_then(|go| ctx.world.get::<SnowComponent>(go).copied())
        else {
            return;
        };

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "snowAngle", snow.snow_angle);
        program.load_uniform(ctx.cmd, "snowColor", snow.snow_color);
        program.load_uniform(ctx.cmd, "snowSize", snow.snow_size);
        program.load_uniform(ctx.cmd, "height", snow.height);
        program.load_uniform(ctx.cmd, "rimColor", snow.rim_color);
        program.load_uniform(ctx.cmd, "rimPower", snow.rim_power);
        ctx.load_camera(program);
        ctx.load_light(program);

        for go in ctx.attached::<Self>() {
            let (Some(mesh), Some(spatial)) = (
                ctx.world.get::<MeshComponent>(go).copied(),
                ctx.world.get::<SpatialComponent>(go).copied(),
            ) else {
                continue;
            };
            program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
            program.load_uniform(ctx.cmd, "N", spatial.normal_matrix());
            if let Some(material) = ctx.world.get::<MaterialComponent>(go).copied() {
                program.load_uniform(ctx.cmd, "ambient", material.ambient);
                program.load_uniform(ctx.cmd, "diffuseColor", material.diffuse);
                program.load_uniform(ctx.cmd, "specularColor", material.specular);
                program.load_uniform(ctx.cmd, "shine", material.shine);
            }
            ctx.cmd.draw_mesh(mesh.0);
        }
    }
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig {
        clear_color: Vec4::new(0.2, 0.3, 0.4, 1.0),
        ..EngineConfig::named("Snow")
    });

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));

    engine.spawn((
        SpatialComponent::at(Vec3::new(0.0, 65.0, 20.0)),
        LightComponent::new(Vec3::ONE, Vec3::ZERO),
    ));

    let library = engine.world().resource::<Library>();
    if let (Some(sphere), Some(cube)) = (library.get_mesh("sphere"), library.get_mesh("cube")) {
        engine.spawn((
            SpatialComponent::new(Vec3::new(-1.2, 0.0, 0.0), Vec3::ONE),
            MeshComponent(sphere),
            MaterialComponent::diffuse(Vec3::new(1.0, 0.0, 0.0)),
            Renderable::<SnowShader>::new(),
        ));
        engine.spawn((
            SpatialComponent::new(Vec3::new(1.2, 0.0, 0.0), Vec3::splat(0.8)).with_rotation(Vec3::new(0.3, 0.6, 0.0)),
            MeshComponent(cube),
            MaterialComponent::diffuse(Vec3::new(0.2, 0.4, 1.0)),
            Renderable::<SnowShader>::new(),
        ));
    }

    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, 1.5, 0.0), Vec3::ONE),
        SnowComponent::default(),
        LineComponent::new(Vec3::new(0.0, 1.0, 0.0)).with_segment(Vec3::ZERO, Vec3::Y),
    ));

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(SnowSystem);

    let renderer = engine.renderer_mut();
    renderer.add_scene_shader(SnowShader::new());
    renderer.add_scene_shader(LineShader::new());

    engine.run()
}
