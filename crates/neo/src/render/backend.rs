//! # Wgpu Backend: Presenting the Command Buffer
//!
//! The renderer records GL-style commands; this backend replays the scene
//! phase of them onto the window surface with a single forward pipeline
//! (`forward.wgsl`).
//!
//! ```text
//! Vec<RenderCommand> ──plan_frame──► FramePlan { clear, items, line_vertices }
//!                                        │
//!          upload meshes/textures ◄──────┤
//!          write dynamic uniforms ◄──────┤
//!                                        ▼
//!               one render pass: clear, then one draw per item
//! ```
//!
//! ## Replaying GL state
//!
//! Uniforms are GL program state: a value set once stays set until the
//! program sets it again. The planner keeps a uniform table per program and
//! snapshots it into a [`DrawUniform`] at every draw. What the snapshot
//! renders as depends on which uniforms the program declared:
//!
//! | Uniforms present            | Mode     | Output                         |
//! |-----------------------------|----------|--------------------------------|
//! | `cubeMap` without `N`       | sky      | environment around the camera  |
//! | `cubeMap` and `N`           | env      | reflected or refracted sky     |
//! | `alphaCutoff`               | textured | diffuse map, discard below cut |
//! | `lineColor` / `wireColor`   | flat     | the color                      |
//! | `lightPos` / `diffuseColor` | lit      | Blinn-Phong with attenuation   |
//!
//! Cube maps are not uploaded. Sky and env draws shade a gradient through
//! the map's zenith, horizon and ground averages, so a procedural sky reads
//! the same as a sampled one.
//!
//! Pre-process and post-process passes are planned but not drawn: offscreen
//! framebuffers have no GPU storage in this backend, so attached textures
//! sample as white.
//!
//! ## Pipelines
//!
//! Pipelines are created on demand, keyed by primitive, cull mode, depth
//! test and function, and blending. `PolygonMode::Line` draws a mesh's edge
//! list with the line primitive instead of needing the `POLYGON_MODE_LINE`
//! feature.

use std::collections::{HashMap, HashSet};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::library::{
    CUBE_FACES, FACE_NEG_Y, FACE_POS_Y, Library, MeshHandle, TextureData, TextureFormat, TextureHandle, TextureWrap,
};
use crate::mesh::{MeshVertex, Topology};

use super::api::{BlendMode, CullMode, DepthFunc, PolygonMode, RenderCommand, RenderPhase, UniformValue};
use super::gpu::GpuContext;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MODE_LIT: f32 = 0.0;
const MODE_FLAT: f32 = 1.0;
const MODE_TEXTURED: f32 = 2.0;
const MODE_SKY: f32 = 3.0;
const MODE_ENV: f32 = 4.0;

// ── Per-draw uniform ────────────────────────────────────────────────────

/// Everything `forward.wgsl` reads for one draw. Matches `struct Draw`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub cam_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub light_col: [f32; 4],
    pub light_att: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    /// `w` is the shine exponent.
    pub specular: [f32; 4],
    pub color: [f32; 4],
    /// `x` mode, `y` use texture, `z` alpha cutoff, `w` refraction ratio
    /// (0 reflects).
    pub params: [f32; 4],
}

impl DrawUniform {
    /// Snapshot of one program's uniforms. `cube` is the texture behind the
    /// program's `cubeMap` sampler, if it is a cube map.
    fn from_program(uniforms: &HashMap<String, UniformValue>, cube: Option<&TextureData>) -> Self {
        let mat = |name: &str| {
            uniforms
                .get(name)
                .and_then(|v| as_mat4(*v))
                .unwrap_or(Mat4::IDENTITY)
                .to_cols_array_2d()
        };
        let vec = |name: &str, default: Vec4| {
            uniforms
                .get(name)
                .and_then(|v| as_vec4(*v))
                .unwrap_or(default)
                .to_array()
        };
        let flag = |name: &str| matches!(uniforms.get(name), Some(UniformValue::Bool(true)));

        let mut sky = None;
        let (mode, color) = if let Some(cube) = cube {
            let gradient = SkyGradient::of(cube);
            sky = Some(gradient);
            let mode = if uniforms.contains_key("N") { MODE_ENV } else { MODE_SKY };
            (mode, gradient.zenith)
        } else if uniforms.contains_key("alphaCutoff") {
            (MODE_TEXTURED, Vec4::ONE)
        } else if let Some(color) = ["lineColor", "wireColor"]
            .iter()
            .find_map(|n| uniforms.get(*n).and_then(|v| as_vec4(*v)))
        {
            (MODE_FLAT, color)
        } else if uniforms.contains_key("lightPos") || uniforms.contains_key("diffuseColor") {
            (MODE_LIT, Vec4::ONE)
        } else {
            (MODE_FLAT, Vec4::ONE)
        };

        let mut specular = vec("specularColor", Vec4::ZERO);
        specular[3] = vec("shine", Vec4::splat(1.0))[0];
        let use_texture = mode == MODE_TEXTURED || flag("useTexture");
        let ratio = if mode == MODE_ENV { vec("ratio", Vec4::ZERO)[0] } else { 0.0 };

        let mut uniform = Self {
            proj: mat("P"),
            view: mat("V"),
            model: mat("M"),
            normal: mat("N"),
            cam_pos: vec("camPos", Vec4::ZERO),
            light_pos: vec("lightPos", Vec4::new(0.0, 10.0, 0.0, 0.0)),
            light_col: vec("lightCol", Vec4::ONE),
            light_att: vec("lightAtt", Vec4::new(1.0, 0.0, 0.0, 0.0)),
            ambient: vec("ambient", Vec4::splat(0.2)),
            diffuse: vec("diffuseColor", Vec4::ONE),
            specular,
            color: color.to_array(),
            params: [
                mode,
                if use_texture { 1.0 } else { 0.0 },
                vec("alphaCutoff", Vec4::ZERO)[0],
                ratio,
            ],
        };
        if let Some(sky) = sky {
            uniform.diffuse = sky.horizon.to_array();
            uniform.ambient = sky.ground.to_array();
        }
        uniform
    }

    pub fn mode(&self) -> f32 {
        self.params[0]
    }
}

/// Colors a cube map averages to looking up, sideways and down.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SkyGradient {
    zenith: Vec4,
    horizon: Vec4,
    ground: Vec4,
}

impl SkyGradient {
    fn of(cube: &TextureData) -> Self {
        let face = |i| cube.face_average(i).unwrap_or(Vec4::ONE);
        let sides = (0..CUBE_FACES)
            .filter(|&i| i != FACE_POS_Y && i != FACE_NEG_Y)
            .map(face)
            .sum::<Vec4>()
            / 4.0;
        Self {
            zenith: face(FACE_POS_Y),
            horizon: sides,
            ground: face(FACE_NEG_Y),
        }
    }
}

fn as_mat4(value: UniformValue) -> Option<Mat4> {
    match value {
        UniformValue::Mat4(m) => Some(m),
        UniformValue::Mat3(m) => Some(Mat4::from_mat3(m)),
        _ => None,
    }
}

fn as_vec4(value: UniformValue) -> Option<Vec4> {
    match value {
        UniformValue::Float(x) => Some(Vec4::new(x, 0.0, 0.0, 0.0)),
        UniformValue::Int(x) => Some(Vec4::new(x as f32, 0.0, 0.0, 0.0)),
        UniformValue::Bool(b) => Some(Vec4::new(if b { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0)),
        UniformValue::Vec2(v) => Some(v.extend(0.0).extend(0.0)),
        UniformValue::Vec3(v) => Some(v.extend(0.0)),
        UniformValue::Vec4(v) => Some(v),
        UniformValue::Mat3(_) | UniformValue::Mat4(_) => None,
    }
}

// ── Frame planning ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub primitive: Primitive,
    pub cull: CullMode,
    pub depth_test: bool,
    pub depth_func: DepthFunc,
    pub blend: BlendMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Mesh(MeshHandle),
    /// The mesh's triangle edges, for wireframe.
    Edges(MeshHandle),
    /// A range of [`FramePlan::line_vertices`].
    Lines { first: u32, count: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub geometry: Geometry,
    pub key: PipelineKey,
    pub uniform: DrawUniform,
    pub texture: Option<TextureHandle>,
}

/// What one frame draws on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub clear: Vec4,
    pub items: Vec<DrawItem>,
    pub line_vertices: Vec<MeshVertex>,
}

/// Replays `commands` against GL-like state and keeps the scene phase's
/// draws.
pub fn plan_frame(commands: &[RenderCommand], library: &Library) -> FramePlan {
    let mut plan = FramePlan {
        clear: Vec4::new(0.0, 0.0, 0.0, 1.0),
        items: Vec::new(),
        line_vertices: Vec::new(),
    };

    let mut phase = None;
    let mut program = String::new();
    let mut uniforms: HashMap<String, HashMap<String, UniformValue>> = HashMap::new();
    let mut units: HashMap<u32, TextureHandle> = HashMap::new();
    let mut cull = CullMode::Back;
    let mut polygon = PolygonMode::Fill;
    let mut depth_test = true;
    let mut depth_func = DepthFunc::Less;
    let mut blend = BlendMode::Off;

    for command in commands {
        match command {
            RenderCommand::Phase(p) => phase = Some(*p),
            RenderCommand::Cull(mode) => cull = *mode,
            RenderCommand::PolygonMode(mode) => polygon = *mode,
            RenderCommand::DepthTest(enabled) => depth_test = *enabled,
            RenderCommand::DepthFunc(func) => depth_func = *func,
            RenderCommand::Blend(mode) => blend = *mode,
            RenderCommand::UseProgram(name) => program.clone_from(name),
            RenderCommand::SetUniform { name, value, .. } => {
                uniforms
                    .entry(program.clone())
                    .or_default()
                    .insert(name.clone(), *value);
            }
            RenderCommand::BindTexture { unit, texture } => {
                units.insert(*unit, *texture);
            }
            RenderCommand::Clear { color: Some(color), .. } if phase == Some(RenderPhase::Scene) => {
                plan.clear = *color;
            }
            RenderCommand::Clear { .. } | RenderCommand::BindFramebuffer(_) | RenderCommand::Viewport(_) => {}
            RenderCommand::DrawMesh(_) | RenderCommand::DrawLines(_) if phase != Some(RenderPhase::Scene) => {}
            RenderCommand::DrawMesh(mesh) => {
                let state = uniforms.get(&program).cloned().unwrap_or_default();
                let topology = library.mesh(*mesh).topology;
                let (geometry, primitive) = match (topology, polygon) {
                    (Topology::Lines, _) => (Geometry::Mesh(*mesh), Primitive::Lines),
                    (Topology::Triangles, PolygonMode::Line) => (Geometry::Edges(*mesh), Primitive::Lines),
                    (Topology::Triangles, PolygonMode::Fill) => (Geometry::Mesh(*mesh), Primitive::Triangles),
                };
                let uniform = DrawUniform::from_program(&state, bound_cube_map(&state, &units, library));
                let texture = bound_diffuse(&state, &units, &uniform);
                plan.items.push(DrawItem {
                    geometry,
                    key: PipelineKey {
                        primitive,
                        cull: if primitive == Primitive::Lines { CullMode::None } else { cull },
                        depth_test,
                        depth_func,
                        blend,
                    },
                    uniform,
                    texture,
                });
            }
            RenderCommand::DrawLines(nodes) => {
                let state = uniforms.get(&program).cloned().unwrap_or_default();
                let first = plan.line_vertices.len() as u32;
                let count = (nodes.len() / 2 * 2) as u32;
                plan.line_vertices.extend(
                    nodes[..count as usize]
                        .iter()
                        .map(|p| MeshVertex::new(*p, glam::Vec3::Y, [0.0, 0.0])),
                );
                plan.items.push(DrawItem {
                    geometry: Geometry::Lines { first, count },
                    key: PipelineKey {
                        primitive: Primitive::Lines,
                        cull: CullMode::None,
                        depth_test,
                        depth_func,
                        blend,
                    },
                    uniform: DrawUniform::from_program(&state, None),
                    texture: None,
                });
            }
        }
    }
    plan
}

fn bound_diffuse(
    state: &HashMap<String, UniformValue>,
    units: &HashMap<u32, TextureHandle>,
    uniform: &DrawUniform,
) -> Option<TextureHandle> {
    if uniform.params[1] < 0.5 {
        return None;
    }
    match state.get("diffuseMap") {
        Some(UniformValue::Int(unit)) => units.get(&(*unit as u32)).copied(),
        _ => None,
    }
}

fn bound_cube_map<'a>(
    state: &HashMap<String, UniformValue>,
    units: &HashMap<u32, TextureHandle>,
    library: &'a Library,
) -> Option<&'a TextureData> {
    let Some(UniformValue::Int(unit)) = state.get("cubeMap") else {
        return None;
    };
    let texture = library.texture(*units.get(&(*unit as u32))?);
    texture.is_cube_map().then_some(texture)
}

/// Unique edges of a triangle list, two indices per edge.
pub fn edge_indices(indices: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if seen.insert((a.min(b), a.max(b))) {
                edges.extend([a, b]);
            }
        }
    }
    edges
}

// ── GPU resources ───────────────────────────────────────────────────────

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    edge_buffer: wgpu::Buffer,
    edge_count: u32,
}

struct GpuTexture {
    bind_group: wgpu::BindGroup,
    revision: u32,
}

/// Presents the scene phase of each frame's commands on the window surface.
pub struct WgpuBackend {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    texture_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: usize,

    meshes: HashMap<MeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, GpuTexture>,
    white: wgpu::BindGroup,

    line_buffer: Option<(wgpu::Buffer, usize)>,

    depth_texture: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl WgpuBackend {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        // ── Shader ──────────────────────────────────────────────────────
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("neo forward shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("forward.wgsl").into()),
        });

        // ── Group 0: per-draw uniform (dynamic offset) ──────────────────
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("neo draw layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });

        // ── Group 1: diffuse texture + sampler ──────────────────────────
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("neo texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("neo pipeline layout"),
            bind_group_layouts: &[&draw_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let draw_capacity = 64;
        let (draw_buffer, draw_bind_group) = create_draw_buffer(device, &draw_layout, draw_capacity);

        let white = texture_bind_group(
            gpu,
            &texture_layout,
            "neo white 1x1",
            (1, 1),
            &[255, 255, 255, 255],
            TextureWrap::Repeat,
        );

        let (w, h) = gpu.surface_size();
        Self {
            shader,
            pipeline_layout,
            texture_layout,
            draw_layout,
            pipelines: HashMap::new(),
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            white,
            line_buffer: None,
            depth_texture: create_depth_texture(device, w, h),
            depth_size: (w, h),
        }
    }

    /// Plans, uploads and presents one frame. Returns the number of draws
    /// submitted.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        library: &Library,
        commands: &[RenderCommand],
    ) -> Result<u32, wgpu::SurfaceError> {
        let plan = plan_frame(commands, library);
        let (w, h) = gpu.surface_size();
        self.resize_depth_if_needed(&gpu.device, w, h);

        for item in &plan.items {
            if let Geometry::Mesh(mesh) | Geometry::Edges(mesh) = item.geometry {
                self.ensure_mesh(gpu, library, mesh);
            }
            if let Some(texture) = item.texture {
                self.ensure_texture(gpu, library, texture);
            }
            self.ensure_pipeline(gpu, item.key);
        }

        let stride = self.ensure_draw_capacity(&gpu.device, plan.items.len());
        if !plan.items.is_empty() {
            let mut bytes = vec![0u8; stride * plan.items.len()];
            for (i, item) in plan.items.iter().enumerate() {
                let start = i * stride;
                bytes[start..start + std::mem::size_of::<DrawUniform>()]
                    .copy_from_slice(bytemuck::bytes_of(&item.uniform));
            }
            gpu.queue.write_buffer(&self.draw_buffer, 0, &bytes);
        }
        self.upload_lines(gpu, &plan.line_vertices);

        let output = gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("neo frame encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("neo scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: plan.clear.x as f64,
                            g: plan.clear.y as f64,
                            b: plan.clear.z as f64,
                            a: plan.clear.w as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (i, item) in plan.items.iter().enumerate() {
                let Some(pipeline) = self.pipelines.get(&item.key) else {
                    continue;
                };
                let texture = item
                    .texture
                    .and_then(|t| self.textures.get(&t))
                    .map_or(&self.white, |t| &t.bind_group);

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.draw_bind_group, &[(i * stride) as u32]);
                pass.set_bind_group(1, texture, &[]);

                match item.geometry {
                    Geometry::Mesh(handle) | Geometry::Edges(handle) => {
                        let Some(mesh) = self.meshes.get(&handle) else {
                            continue;
                        };
                        let (indices, count) = match item.geometry {
                            Geometry::Edges(_) => (&mesh.edge_buffer, mesh.edge_count),
                            _ => (&mesh.index_buffer, mesh.index_count),
                        };
                        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..count, 0, 0..1);
                    }
                    Geometry::Lines { first, count } => {
                        let Some((buffer, _)) = &self.line_buffer else {
                            continue;
                        };
                        pass.set_vertex_buffer(0, buffer.slice(..));
                        pass.draw(first..first + count, 0..1);
                    }
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(plan.items.len() as u32)
    }

    fn resize_depth_if_needed(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (width, height) != self.depth_size && width > 0 && height > 0 {
            self.depth_texture = create_depth_texture(device, width, height);
            self.depth_size = (width, height);
        }
    }

    /// Grows the dynamic uniform buffer to hold `count` draws. Returns the
    /// aligned stride in bytes.
    fn ensure_draw_capacity(&mut self, device: &wgpu::Device, count: usize) -> usize {
        let align = device.limits().min_uniform_buffer_offset_alignment as usize;
        if count > self.draw_capacity {
            let capacity = count.next_power_of_two();
            let (buffer, bind_group) = create_draw_buffer(device, &self.draw_layout, capacity);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            self.draw_capacity = capacity;
        }
        align_up(std::mem::size_of::<DrawUniform>(), align)
    }

    fn ensure_mesh(&mut self, gpu: &GpuContext, library: &Library, handle: MeshHandle) {
        if self.meshes.contains_key(&handle) {
            return;
        }
        let data = library.mesh(handle);
        let edges = match data.topology {
            Topology::Triangles => edge_indices(&data.indices),
            Topology::Lines => data.indices.clone(),
        };
        let vertex_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("neo mesh vertices"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("neo mesh indices"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let edge_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("neo mesh edges"),
            contents: bytemuck::cast_slice(&edges),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "uploaded mesh {} ({} vertices, {} indices)",
            handle.id(),
            data.vertices.len(),
            data.indices.len()
        );
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: data.index_count(),
                edge_buffer,
                edge_count: edges.len() as u32,
            },
        );
    }

    /// Uploads `handle` unless it is current. Render targets, depth
    /// textures and cube maps fall back to white.
    fn ensure_texture(&mut self, gpu: &GpuContext, library: &Library, handle: TextureHandle) {
        let data = library.texture(handle);
        if data.is_render_target() || data.is_cube_map() || data.format != TextureFormat::Rgba8 {
            return;
        }
        if self.textures.get(&handle).is_some_and(|t| t.revision == data.revision) {
            return;
        }
        let bind_group = texture_bind_group(
            gpu,
            &self.texture_layout,
            "neo texture",
            (data.size.x, data.size.y),
            &data.pixels,
            data.wrap,
        );
        self.textures.insert(
            handle,
            GpuTexture {
                bind_group,
                revision: data.revision,
            },
        );
    }

    fn ensure_pipeline(&mut self, gpu: &GpuContext, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let pipeline = gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("neo forward pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[VERTEX_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: match key.blend {
                        BlendMode::Off => None,
                        BlendMode::Additive => Some(wgpu::BlendState {
                            color: ADDITIVE,
                            alpha: ADDITIVE,
                        }),
                    },
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: match key.primitive {
                    Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
                    Primitive::Lines => wgpu::PrimitiveTopology::LineList,
                },
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: match key.cull {
                    CullMode::None => None,
                    CullMode::Back => Some(wgpu::Face::Back),
                    CullMode::Front => Some(wgpu::Face::Front),
                },
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth_test,
                depth_compare: match (key.depth_test, key.depth_func) {
                    (false, _) => wgpu::CompareFunction::Always,
                    (true, DepthFunc::Less) => wgpu::CompareFunction::Less,
                    (true, DepthFunc::LessEqual) => wgpu::CompareFunction::LessEqual,
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        log::debug!("created pipeline {key:?}");
        self.pipelines.insert(key, pipeline);
    }

    fn upload_lines(&mut self, gpu: &GpuContext, vertices: &[MeshVertex]) {
        if vertices.is_empty() {
            return;
        }
        let needed = vertices.len();
        let grow = self.line_buffer.as_ref().is_none_or(|(_, capacity)| *capacity < needed);
        if grow {
            let capacity = needed.next_power_of_two();
            let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("neo line vertices"),
                size: (capacity * std::mem::size_of::<MeshVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.line_buffer = Some((buffer, capacity));
        }
        if let Some((buffer, _)) = &self.line_buffer {
            gpu.queue.write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
        }
    }
}

const ADDITIVE: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
};

const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        // position
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        // normal
        wgpu::VertexAttribute {
            offset: 12,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        // uv
        wgpu::VertexAttribute {
            offset: 24,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("neo depth texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let align = device.limits().min_uniform_buffer_offset_alignment as usize;
    let stride = align_up(std::mem::size_of::<DrawUniform>(), align);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("neo draw uniforms"),
        size: (stride * capacity) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("neo draw bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn texture_bind_group(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    (width, height): (u32, u32),
    pixels: &[u8],
    wrap: TextureWrap,
) -> wgpu::BindGroup {
    let texture = gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    // Border clamping needs an optional feature; edge clamping is close enough.
    let address_mode = match wrap {
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
        TextureWrap::ClampToEdge | TextureWrap::ClampToBorder(_) => wgpu::AddressMode::ClampToEdge,
    };
    let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("neo sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use glam::{Mat3, Vec3};

    use super::*;
    use crate::component::{
        DiffuseMapComponent, LineComponent, MaterialComponent, MeshComponent, Renderable, SpatialComponent,
    };
    use crate::component::{CubeMapComponent, ReflectionComponent, RefractionComponent, SkyboxComponent};
    use crate::library::{grid_texture, sky_cube_map};
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::shaders::{
        AlphaTestShader, GammaCorrectShader, LightPassShader, LineShader, PhongShader, ReflectionShader,
        RefractionShader, SkyboxShader, WireframeShader,
    };

    #[test]
    fn uniform_layout_matches_the_wgsl_struct() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 4 * 64 + 9 * 16);
        assert_eq!(align_up(400, 256), 512);
        assert_eq!(align_up(512, 256), 512);
    }

    #[test]
    fn edges_are_shared_between_triangles() {
        // Two triangles sharing the 1-2 edge.
        let edges = edge_indices(&[0, 1, 2, 2, 1, 3]);
        assert_eq!(edges.len(), 10);
        assert_eq!(edges, vec![0, 1, 1, 2, 2, 0, 1, 3, 3, 2]);
    }

    #[test]
    fn phong_draws_become_lit_items_with_their_material() {
        let (mut world, cam) = scene();
        let sphere = world.resource::<Library>().get_mesh("sphere").unwrap();
        let diffuse = Vec3::new(0.8, 0.1, 0.1);
        world.spawn((
            MeshComponent(sphere),
            SpatialComponent::at(Vec3::new(1.0, 0.0, 0.0)),
            MaterialComponent::diffuse(diffuse),
            Renderable::<PhongShader>::new(),
        ));
        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PhongShader::new());
        renderer.add_post_process_shader(GammaCorrectShader::default());
        let commands = renderer.render(&mut world);

        let plan = plan_frame(&commands, world.resource::<Library>());
        assert_eq!(plan.items.len(), 1);
        let item = &plan.items[0];
        assert_eq!(item.geometry, Geometry::Mesh(sphere));
        assert_eq!(
            item.key,
            PipelineKey {
                primitive: Primitive::Triangles,
                cull: CullMode::Back,
                depth_test: true,
                depth_func: DepthFunc::Less,
                blend: BlendMode::Off,
            }
        );
        assert_eq!(item.uniform.mode(), MODE_LIT);
        assert_eq!(item.uniform.diffuse, diffuse.extend(0.0).to_array());
        assert_eq!(item.uniform.model[3], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(item.texture, None);
    }

    #[test]
    fn wireframe_and_lines_use_the_line_primitive() {
        let (mut world, cam) = scene();
        let cube = world.resource::<Library>().get_mesh("cube").unwrap();
        world.spawn((
            MeshComponent(cube),
            SpatialComponent::at(Vec3::ZERO),
            Renderable::<WireframeShader>::new(),
        ));
        world.spawn_one(LineComponent::world(Vec3::X).with_segment(Vec3::ZERO, Vec3::Y));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(WireframeShader::new());
        renderer.add_scene_shader(LineShader::new());
        let commands = renderer.render(&mut world);

        let plan = plan_frame(&commands, world.resource::<Library>());
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].geometry, Geometry::Edges(cube));
        assert_eq!(plan.items[0].key.primitive, Primitive::Lines);
        assert_eq!(plan.items[0].uniform.mode(), MODE_FLAT);
        assert_eq!(plan.items[1].geometry, Geometry::Lines { first: 0, count: 2 });
        assert_eq!(plan.items[1].uniform.color, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(plan.line_vertices.len(), 2);
    }

    #[test]
    fn textures_resolve_through_units() {
        let (mut world, cam) = scene();
        let grid = world
            .resource_mut::<Library>()
            .insert_texture("grid", grid_texture(8, 2));
        let quad = world.resource::<Library>().get_mesh("quad").unwrap();
        world.spawn((
            MeshComponent(quad),
            SpatialComponent::at(Vec3::ZERO),
            DiffuseMapComponent(grid),
            Renderable::<AlphaTestShader>::new(),
        ));
        let mut renderer = renderer(cam);
        renderer.add_scene_shader(AlphaTestShader::new());
        let commands = renderer.render(&mut world);

        let plan = plan_frame(&commands, world.resource::<Library>());
        assert_eq!(plan.items[0].texture, Some(grid));
        assert_eq!(plan.items[0].uniform.mode(), MODE_TEXTURED);
        assert_eq!(plan.items[0].key.cull, CullMode::None);
    }

    #[test]
    fn offscreen_phases_are_not_drawn() {
        let library = Library::new();
        let quad = library.get_mesh("quad").unwrap();
        let commands = vec![
            RenderCommand::Phase(RenderPhase::PostProcess),
            RenderCommand::UseProgram("Gamma Correct".into()),
            RenderCommand::DrawMesh(quad),
            RenderCommand::Phase(RenderPhase::Scene),
            RenderCommand::Clear {
                color: Some(Vec4::new(0.1, 0.2, 0.3, 1.0)),
                depth: true,
            },
        ];
        let plan = plan_frame(&commands, &library);
        assert!(plan.items.is_empty());
        assert_eq!(plan.clear, Vec4::new(0.1, 0.2, 0.3, 1.0));
    }

    #[test]
    fn skybox_and_environment_draws_shade_the_sky_gradient() {
        let (mut world, cam) = scene();
        let sky = world.resource::<Library>().get_texture("sky").unwrap();
        world.spawn((SkyboxComponent, CubeMapComponent(sky)));
        let sphere = world.resource::<Library>().get_mesh("sphere").unwrap();
        world.spawn((MeshComponent(sphere), SpatialComponent::at(Vec3::X), ReflectionComponent));
        world.spawn((
            MeshComponent(sphere),
            SpatialComponent::at(-Vec3::X),
            RefractionComponent::new(0.5),
        ));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(SkyboxShader::new());
        renderer.add_scene_shader(ReflectionShader::new());
        renderer.add_scene_shader(RefractionShader::new());
        let commands = renderer.render(&mut world);
        let plan = plan_frame(&commands, world.resource::<Library>());
        assert_eq!(plan.items.len(), 3);

        let expected = sky_cube_map(32);
        let zenith = expected.face_average(FACE_POS_Y).unwrap().to_array();
        let ground = expected.face_average(FACE_NEG_Y).unwrap().to_array();

        let skybox = &plan.items[0];
        assert_eq!(skybox.uniform.mode(), MODE_SKY);
        assert_eq!(skybox.key.depth_func, DepthFunc::LessEqual);
        assert_eq!(skybox.key.cull, CullMode::None);
        assert_eq!(skybox.uniform.color, zenith);
        assert_eq!(skybox.uniform.ambient, ground);
        assert_eq!(skybox.texture, None);

        let (mirror, glass) = (&plan.items[1], &plan.items[2]);
        assert_eq!(mirror.uniform.mode(), MODE_ENV);
        assert_eq!(mirror.uniform.params[3], 0.0);
        assert_eq!(mirror.key.depth_func, DepthFunc::Less);
        assert_eq!(glass.uniform.mode(), MODE_ENV);
        assert_eq!(glass.uniform.params[3], 0.5);
        assert_eq!(glass.uniform.diffuse, skybox.uniform.diffuse);
    }

    #[test]
    fn blend_and_depth_func_key_the_pipeline() {
        let library = Library::new();
        let quad = library.get_mesh("quad").unwrap();
        let commands = vec![
            RenderCommand::Phase(RenderPhase::Scene),
            RenderCommand::DepthFunc(DepthFunc::LessEqual),
            RenderCommand::DrawMesh(quad),
            RenderCommand::Blend(BlendMode::Additive),
            RenderCommand::DepthFunc(DepthFunc::Less),
            RenderCommand::DrawMesh(quad),
        ];
        let plan = plan_frame(&commands, &library);
        assert_eq!(plan.items[0].key.depth_func, DepthFunc::LessEqual);
        assert_eq!(plan.items[0].key.blend, BlendMode::Off);
        assert_eq!(plan.items[1].key.depth_func, DepthFunc::Less);
        assert_eq!(plan.items[1].key.blend, BlendMode::Additive);
        assert_ne!(plan.items[0].key, plan.items[1].key);
    }

    #[test]
    fn deferred_passes_stay_offscreen() {
        let (mut world, cam) = scene();
        world.spawn((
            crate::component::LightComponent::default(),
            SpatialComponent::at(Vec3::ZERO),
            Renderable::<LightPassShader>::new(),
        ));
        let mut renderer = renderer(cam);
        renderer.add_preprocess_shader(LightPassShader::new());
        let commands = renderer.render(&mut world);
        assert!(commands.contains(&RenderCommand::Blend(BlendMode::Additive)));
        assert!(plan_frame(&commands, world.resource::<Library>()).items.is_empty());
    }

    #[test]
    fn mat3_uniforms_widen() {
        let m = Mat3::from_diagonal(Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(as_mat4(m.into()), Some(Mat4::from_mat3(m)));
        assert_eq!(as_vec4(Vec3::ONE.into()), Some(Vec4::new(1.0, 1.0, 1.0, 0.0)));
        assert_eq!(as_mat4(1.0f32.into()), None);
    }
}
