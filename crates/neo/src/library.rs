//! # Library: Named Meshes, Textures and Framebuffers
//!
//! Components refer to shared resources through small `Copy` handles; the
//! library owns the data and resolves names to handles.
//!
//! ```text
//! "sphere" ──► MeshHandle(2) ──► MeshData { vertices, indices }
//! "grid"   ──► TextureHandle(0) ──► TextureData { 64×64 RGBA }
//! "sky"    ──► TextureHandle(1) ──► TextureData { 6 faces of 32×32, cube }
//! "depthMap" ──► Framebuffer { depth: TextureHandle(3), 2048×2048 }
//! "gbuffer"  ──► Framebuffer { colors: [position, normal, diffuse, specular], depth }
//! ```
//!
//! Nothing here talks to the GPU. The backend uploads a mesh or texture the
//! first time a command references it and re-uploads a texture whenever its
//! `revision` changes (framebuffer attachments are re-created on resize).
//!
//! Framebuffers are created on first use by name with [`Library::get_fbo`],
//! then given attachments with [`FramebufferBuilder::with_color`],
//! [`FramebufferBuilder::with_color_attachment`] and
//! [`FramebufferBuilder::with_depth`]. Color attachments keep the order they
//! were first attached in, which is the draw-buffer order a multi-target
//! shader writes to.

use std::collections::HashMap;

use glam::{UVec2, Vec3, Vec4};

use crate::mesh::{self, MeshData};

/// Handle to a mesh in the [`Library`]. Lightweight and `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub(crate) u32);

/// Handle to a texture in the [`Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

impl MeshHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl TextureHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    /// Unclamped color, for positions and normals in a G-buffer.
    Rgba16Float,
    Depth32,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    /// Six square faces in `+X, -X, +Y, -Y, +Z, -Z` order.
    Cube,
}

/// Cube face index, in storage order.
pub const CUBE_FACES: usize = 6;
pub const FACE_POS_Y: usize = 2;
pub const FACE_NEG_Y: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    /// Samples outside `[0, 1]` read this color. Shadow maps use white so
    /// everything outside the light's view counts as lit.
    ClampToBorder(Vec4),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    /// Per face for cube maps.
    pub size: UVec2,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
    pub wrap: TextureWrap,
    /// Empty for render targets. Cube maps store their faces back to back.
    pub pixels: Vec<u8>,
    /// Bumped whenever the storage is re-created.
    pub revision: u32,
}

impl TextureData {
    /// # Panics
    ///
    /// Panics if `pixels` is not `4 · width · height` bytes.
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(
            pixels.len(),
            (width * height * 4) as usize,
            "rgba8 texture of {width}×{height} needs {} bytes",
            width * height * 4
        );
        Self {
            size: UVec2::new(width, height),
            format: TextureFormat::Rgba8,
            dimension: TextureDimension::D2,
            wrap: TextureWrap::Repeat,
            pixels,
            revision: 0,
        }
    }

    /// A cube map from six square RGBA faces of `size`, in `+X, -X, +Y, -Y,
    /// +Z, -Z` order.
    ///
    /// # Panics
    ///
    /// Panics if a face is not `4 · size · size` bytes.
    pub fn cube_map(size: u32, faces: [Vec<u8>; CUBE_FACES]) -> Self {
        let face_len = (size * size * 4) as usize;
        let mut pixels = Vec::with_capacity(face_len * CUBE_FACES);
        for (i, face) in faces.iter().enumerate() {
            assert_eq!(face.len(), face_len, "cube face {i} of {size}×{size} needs {face_len} bytes");
            pixels.extend_from_slice(face);
        }
        Self {
            size: UVec2::splat(size),
            format: TextureFormat::Rgba8,
            dimension: TextureDimension::Cube,
            wrap: TextureWrap::ClampToEdge,
            pixels,
            revision: 0,
        }
    }

    pub fn render_target(size: UVec2, format: TextureFormat) -> Self {
        Self {
            size,
            format,
            dimension: TextureDimension::D2,
            wrap: TextureWrap::ClampToEdge,
            pixels: Vec::new(),
            revision: 0,
        }
    }

    pub fn with_wrap(mut self, wrap: TextureWrap) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn is_render_target(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn is_cube_map(&self) -> bool {
        self.dimension == TextureDimension::Cube
    }

    /// RGBA bytes of cube face `face`, or the whole image for 2D textures.
    pub fn face(&self, face: usize) -> Option<&[u8]> {
        match self.dimension {
            TextureDimension::D2 => (face == 0).then_some(self.pixels.as_slice()),
            TextureDimension::Cube => {
                let len = (self.size.x * self.size.y * 4) as usize;
                self.pixels.get(face * len..(face + 1) * len)
            }
        }
    }

    /// Mean color of a face, `0..1` per channel.
    pub fn face_average(&self, face: usize) -> Option<Vec4> {
        let bytes = self.face(face).filter(|b| !b.is_empty())?;
        let sum = bytes.chunks_exact(4).fold(Vec4::ZERO, |acc, px| {
            acc + Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32)
        });
        Some(sum / (255.0 * (bytes.len() / 4) as f32))
    }
}

/// An offscreen render target: any number of color attachments and an
/// optional depth attachment, all the same size.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    pub name: String,
    pub size: UVec2,
    /// In draw-buffer order.
    pub colors: Vec<TextureHandle>,
    pub depth: Option<TextureHandle>,
    /// Resized along with the window.
    pub follows_window: bool,
}

impl Framebuffer {
    /// The first color attachment.
    pub fn color(&self) -> Option<TextureHandle> {
        self.colors.first().copied()
    }

    pub fn color_at(&self, index: usize) -> Option<TextureHandle> {
        self.colors.get(index).copied()
    }
}

/// Name-keyed store of meshes, textures and framebuffers.
pub struct Library {
    meshes: Vec<MeshData>,
    mesh_names: HashMap<String, MeshHandle>,
    textures: Vec<TextureData>,
    texture_names: HashMap<String, TextureHandle>,
    framebuffers: HashMap<String, Framebuffer>,
}

impl Library {
    /// Creates a library holding the built-in `cube`, `quad` and `sphere`
    /// meshes, the `grid` texture and the `sky` cube map.
    pub fn new() -> Self {
        let mut lib = Self::empty();
        lib.insert_mesh("cube", mesh::cube());
        lib.insert_mesh("quad", mesh::quad());
        lib.insert_mesh("sphere", mesh::sphere(32, 16));
        lib.insert_texture("grid", grid_texture(64, 8));
        lib.insert_texture("sky", sky_cube_map(32));
        lib
    }

    pub fn empty() -> Self {
        Self {
            meshes: Vec::new(),
            mesh_names: HashMap::new(),
            textures: Vec::new(),
            texture_names: HashMap::new(),
            framebuffers: HashMap::new(),
        }
    }

    // ── Meshes ───────────────────────────────────────────────────────

    /// Stores `data` under `name`. Replacing an existing mesh keeps its
    /// handle.
    pub fn insert_mesh(&mut self, name: &str, data: MeshData) -> MeshHandle {
        if let Some(&handle) = self.mesh_names.get(name) {
            self.meshes[handle.0 as usize] = data;
            return handle;
        }
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(data);
        self.mesh_names.insert(name.to_string(), handle);
        log::debug!("library: mesh `{name}` -> {handle:?}");
        handle
    }

    pub fn get_mesh(&self, name: &str) -> Option<MeshHandle> {
        self.mesh_names.get(name).copied()
    }

    /// # Panics
    ///
    /// Panics if `handle` came from another library.
    pub fn mesh(&self, handle: MeshHandle) -> &MeshData {
        &self.meshes[handle.0 as usize]
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    // ── Textures ─────────────────────────────────────────────────────

    pub fn insert_texture(&mut self, name: &str, data: TextureData) -> TextureHandle {
        if let Some(&handle) = self.texture_names.get(name) {
            let revision = self.textures[handle.0 as usize].revision + 1;
            self.textures[handle.0 as usize] = TextureData { revision, ..data };
            return handle;
        }
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(data);
        self.texture_names.insert(name.to_string(), handle);
        log::debug!("library: texture `{name}` -> {handle:?}");
        handle
    }

    pub fn get_texture(&self, name: &str) -> Option<TextureHandle> {
        self.texture_names.get(name).copied()
    }

    /// # Panics
    ///
    /// Panics if `handle` came from another library.
    pub fn texture(&self, handle: TextureHandle) -> &TextureData {
        &self.textures[handle.0 as usize]
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ── Framebuffers ─────────────────────────────────────────────────

    /// The framebuffer called `name`, created without attachments on first
    /// use.
    pub fn get_fbo(&mut self, name: &str) -> FramebufferBuilder<'_> {
        if !self.framebuffers.contains_key(name) {
            log::debug!("library: framebuffer `{name}`");
            self.framebuffers.insert(
                name.to_string(),
                Framebuffer {
                    name: name.to_string(),
                    size: UVec2::ZERO,
                    colors: Vec::new(),
                    depth: None,
                    follows_window: false,
                },
            );
        }
        FramebufferBuilder {
            library: self,
            name: name.to_string(),
        }
    }

    pub fn framebuffer(&self, name: &str) -> Option<&Framebuffer> {
        self.framebuffers.get(name)
    }

    pub fn framebuffers(&self) -> impl Iterator<Item = &Framebuffer> {
        self.framebuffers.values()
    }

    /// Re-creates the attachments of every window-following framebuffer at
    /// `size`.
    pub fn resize_window_framebuffers(&mut self, size: UVec2) {
        let names: Vec<String> = self
            .framebuffers
            .values()
            .filter(|fb| fb.follows_window && fb.size != size)
            .map(|fb| fb.name.clone())
            .collect();
        for name in names {
            self.resize_framebuffer(&name, size);
        }
    }

    fn resize_framebuffer(&mut self, name: &str, size: UVec2) {
        let Some(fb) = self.framebuffers.get_mut(name) else {
            return;
        };
        fb.size = size;
        let attachments: Vec<TextureHandle> = fb.colors.iter().copied().chain(fb.depth).collect();
        for tex in attachments {
            let data = &mut self.textures[tex.0 as usize];
            data.size = size;
            data.revision += 1;
        }
        log::debug!("library: framebuffer `{name}` resized to {}×{}", size.x, size.y);
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

/// Attachment setup for a framebuffer returned by [`Library::get_fbo`].
pub struct FramebufferBuilder<'a> {
    library: &'a mut Library,
    name: String,
}

impl FramebufferBuilder<'_> {
    /// Adds (or resizes) a color attachment named `"{fbo}.color"`.
    pub fn with_color(self, size: UVec2) -> Self {
        self.with_color_attachment("color", size, TextureFormat::Rgba8)
    }

    /// Adds (or resizes) a color attachment named `"{fbo}.{attachment}"`.
    /// New attachments go after the existing ones.
    pub fn with_color_attachment(self, attachment: &str, size: UVec2, format: TextureFormat) -> Self {
        self.attach(attachment, size, format, TextureWrap::ClampToEdge)
    }

    /// Adds (or resizes) a depth attachment named `"{fbo}.depth"`.
    pub fn with_depth(self, size: UVec2) -> Self {
        self.attach("depth", size, TextureFormat::Depth32, TextureWrap::ClampToEdge)
    }

    /// Depth attachment that samples as white outside `[0, 1]`.
    pub fn with_shadow_depth(self, size: UVec2) -> Self {
        self.attach("depth", size, TextureFormat::Depth32, TextureWrap::ClampToBorder(Vec4::ONE))
    }

    pub fn follow_window(self) -> Self {
        if let Some(fb) = self.library.framebuffers.get_mut(&self.name) {
            fb.follows_window = true;
        }
        self
    }

    pub fn handle(&self) -> &Framebuffer {
        &self.library.framebuffers[&self.name]
    }

    fn attach(self, attachment: &str, size: UVec2, format: TextureFormat, wrap: TextureWrap) -> Self {
        let tex_name = format!("{}.{attachment}", self.name);
        let tex = self
            .library
            .insert_texture(&tex_name, TextureData::render_target(size, format).with_wrap(wrap));
        if let Some(fb) = self.library.framebuffers.get_mut(&self.name) {
            fb.size = size;
            if format.is_depth() {
                fb.depth = Some(tex);
            } else if !fb.colors.contains(&tex) {
                fb.colors.push(tex);
            }
        }
        self
    }
}

/// White grid lines on a transparent background, `cells` cells per side.
pub fn grid_texture(size: u32, cells: u32) -> TextureData {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on_line = x % cell == 0 || y % cell == 0;
            let alpha = if on_line { 255 } else { 0 };
            pixels.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }
    TextureData::rgba8(size, size, pixels)
}

/// A procedural sky: each face shades from a pale horizon up to a deep
/// zenith blue and down to a dark ground, by the direction through the
/// texel.
pub fn sky_cube_map(size: u32) -> TextureData {
    let zenith = Vec4::new(0.15, 0.35, 0.75, 1.0);
    let horizon = Vec4::new(0.75, 0.85, 0.95, 1.0);
    let ground = Vec4::new(0.25, 0.22, 0.2, 1.0);
    let faces = std::array::from_fn(|face| {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let u = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
                let v = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
                let dir = cube_face_direction(face, u, v);
                let color = if dir.y >= 0.0 {
                    horizon.lerp(zenith, dir.y)
                } else {
                    horizon.lerp(ground, -dir.y)
                };
                pixels.extend(color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8));
            }
        }
        pixels
    });
    TextureData::cube_map(size, faces)
}

/// Unit direction through `(u, v)` in `[-1, 1]²` on cube face `face`, with
/// the GL cube-map face orientation (`v` grows downward).
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let lib = Library::new();
        for name in ["cube", "quad", "sphere"] {
            assert!(lib.get_mesh(name).is_some(), "missing mesh {name}");
        }
        let grid = lib.get_texture("grid").unwrap();
        assert_eq!(lib.texture(grid).size, UVec2::new(64, 64));
        let sky = lib.get_texture("sky").unwrap();
        assert!(lib.texture(sky).is_cube_map());
        assert!(lib.get_mesh("teapot").is_none());
    }

    #[test]
    fn replacing_mesh_keeps_handle() {
        let mut lib = Library::empty();
        let a = lib.insert_mesh("m", mesh::cube());
        let b = lib.insert_mesh("m", mesh::quad());
        assert_eq!(a, b);
        assert_eq!(lib.mesh(a).vertices.len(), 4);
        assert_eq!(lib.mesh_count(), 1);
    }

    #[test]
    fn replacing_texture_bumps_revision() {
        let mut lib = Library::empty();
        let t = lib.insert_texture("t", grid_texture(8, 2));
        lib.insert_texture("t", grid_texture(8, 4));
        assert_eq!(lib.texture(t).revision, 1);
    }

    #[test]
    fn fbo_is_created_on_first_use() {
        let mut lib = Library::empty();
        assert!(lib.framebuffer("depthMap").is_none());
        lib.get_fbo("depthMap").with_shadow_depth(UVec2::splat(2048));
        let fb = lib.framebuffer("depthMap").unwrap();
        assert_eq!(fb.size, UVec2::splat(2048));
        assert!(fb.colors.is_empty());
        let depth = lib.texture(fb.depth.unwrap());
        assert_eq!(depth.format, TextureFormat::Depth32);
        assert_eq!(depth.wrap, TextureWrap::ClampToBorder(Vec4::ONE));
        assert!(depth.is_render_target());
    }

    #[test]
    fn window_framebuffers_follow_resize() {
        let mut lib = Library::empty();
        lib.get_fbo("default")
            .with_color(UVec2::new(800, 600))
            .with_depth(UVec2::new(800, 600))
            .follow_window();
        lib.get_fbo("fixed").with_color(UVec2::splat(256));

        lib.resize_window_framebuffers(UVec2::new(1024, 768));
        let fb = lib.framebuffer("default").unwrap();
        assert_eq!(fb.size, UVec2::new(1024, 768));
        let color = lib.texture(fb.color().unwrap());
        assert_eq!(color.size, UVec2::new(1024, 768));
        assert_eq!(color.revision, 1);
        assert_eq!(lib.framebuffer("fixed").unwrap().size, UVec2::splat(256));
    }

    #[test]
    fn color_attachments_keep_their_order() {
        let mut lib = Library::empty();
        let size = UVec2::new(320, 240);
        lib.get_fbo("gbuffer")
            .with_color_attachment("position", size, TextureFormat::Rgba16Float)
            .with_color_attachment("normal", size, TextureFormat::Rgba16Float)
            .with_color_attachment("diffuse", size, TextureFormat::Rgba8)
            .with_depth(size)
            .follow_window();
        // Re-attaching resizes in place instead of adding a fifth target.
        lib.get_fbo("gbuffer").with_color_attachment("normal", size, TextureFormat::Rgba16Float);

        let fb = lib.framebuffer("gbuffer").unwrap().clone();
        assert_eq!(fb.colors.len(), 3);
        assert_eq!(fb.color(), lib.get_texture("gbuffer.position"));
        assert_eq!(fb.color_at(2), lib.get_texture("gbuffer.diffuse"));
        assert_eq!(lib.texture(fb.color_at(1).unwrap()).format, TextureFormat::Rgba16Float);

        lib.resize_window_framebuffers(UVec2::new(640, 480));
        for tex in fb.colors.iter().chain(&fb.depth) {
            assert_eq!(lib.texture(*tex).size, UVec2::new(640, 480));
        }
    }

    #[test]
    fn sky_faces_brighten_toward_the_horizon() {
        let sky = sky_cube_map(8);
        assert!(sky.is_cube_map());
        assert_eq!(sky.pixels.len(), 6 * 8 * 8 * 4);
        let top = sky.face_average(FACE_POS_Y).unwrap();
        let bottom = sky.face_average(FACE_NEG_Y).unwrap();
        let side = sky.face_average(0).unwrap();
        assert!(top.z > top.x, "zenith is blue: {top}");
        assert!(side.x > top.x && side.x > bottom.x);
        assert!(sky.face(6).is_none());
    }

    #[test]
    fn face_directions_point_out_of_their_face() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in axes.into_iter().enumerate() {
            assert!((cube_face_direction(face, 0.0, 0.0) - axis).length() < 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "cube face 3")]
    fn cube_map_checks_face_length() {
        let face = || vec![0u8; 4 * 4 * 4];
        TextureData::cube_map(4, [face(), face(), face(), vec![0; 3], face(), face()]);
    }

    #[test]
    fn grid_has_transparent_cells() {
        let tex = grid_texture(16, 4);
        assert_eq!(tex.pixels.len(), 16 * 16 * 4);
        assert_eq!(tex.pixels[3], 255);
        let inside = (16 + 1) * 4 + 3;
        assert_eq!(tex.pixels[inside], 0);
    }

    #[test]
    #[should_panic(expected = "needs 16 bytes")]
    fn rgba8_checks_length() {
        TextureData::rgba8(2, 2, vec![0; 3]);
    }
}
