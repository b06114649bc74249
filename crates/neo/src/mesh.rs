//! # Mesh Data and Built-In Primitives
//!
//! CPU-side geometry. A [`MeshData`] is what the [`Library`](crate::library::Library)
//! stores and what the GPU backend uploads the first time a mesh is drawn.
//!
//! ## Primitives
//!
//! | Name     | Shape                         | Vertices | Indices |
//! |----------|-------------------------------|----------|---------|
//! | `cube`   | unit cube, side 1             | 24       | 36      |
//! | `quad`   | unit square in XY, facing +Z  | 4        | 6       |
//! | `sphere` | UV sphere, radius 1           | 561      | 3072    |
//!
//! All triangles wind counter-clockwise seen from the front face, and the
//! cube keeps four vertices per face so each face gets its own normal.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex layout shared by every mesh: position, normal and texture
/// coordinate, tightly packed for upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| Vec3::from_array(v.position))
    }

    /// Axis-aligned `(min, max)` of the vertex positions.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut positions = self.positions();
        let Some(first) = positions.next() else {
            return (Vec3::ZERO, Vec3::ZERO);
        };
        positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p)))
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Unit cube centered at the origin.
pub fn cube() -> MeshData {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    // (normal, tangent_u, tangent_v) for each face
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, u_dir, v_dir) in faces {
        let base = vertices.len() as u32;
        let center = normal * 0.5;
        for (corner, uv) in corners.iter().zip(uvs) {
            let pos = center + u_dir * corner[0] * 0.5 + v_dir * corner[1] * 0.5;
            vertices.push(MeshVertex::new(pos, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new(vertices, indices)
}

/// Unit square in the XY plane, facing +Z.
pub fn quad() -> MeshData {
    let h = 0.5;
    let vertices = vec![
        MeshVertex::new(Vec3::new(-h, -h, 0.0), Vec3::Z, [0.0, 0.0]),
        MeshVertex::new(Vec3::new(h, -h, 0.0), Vec3::Z, [1.0, 0.0]),
        MeshVertex::new(Vec3::new(h, h, 0.0), Vec3::Z, [1.0, 1.0]),
        MeshVertex::new(Vec3::new(-h, h, 0.0), Vec3::Z, [0.0, 1.0]),
    ];
    MeshData::new(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// UV sphere of radius 1. `segments` divide the longitude, `rings` the
/// latitude.
pub fn sphere(segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            vertices.push(MeshVertex::new(n, n, [u, v]));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;
            indices.extend_from_slice(&[current, current + 1, next]);
            indices.extend_from_slice(&[current + 1, next + 1, next]);
        }
    }

    MeshData::new(vertices, indices)
}

/// Line-list mesh from segment endpoints.
pub fn lines(segments: impl IntoIterator<Item = (Vec3, Vec3)>) -> MeshData {
    let mut vertices = Vec::new();
    for (a, b) in segments {
        vertices.push(MeshVertex::new(a, Vec3::ZERO, [0.0, 0.0]));
        vertices.push(MeshVertex::new(b, Vec3::ZERO, [0.0, 0.0]));
    }
    let indices = (0..vertices.len() as u32).collect();
    MeshData {
        vertices,
        indices,
        topology: Topology::Lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices_in_range(mesh: &MeshData) {
        for &idx in &mesh.indices {
            assert!((idx as usize) < mesh.vertices.len(), "index {idx} out of range");
        }
    }

    #[test]
    fn cube_counts_and_bounds() {
        let mesh = cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
        indices_in_range(&mesh);
        assert_eq!(mesh.bounds(), (Vec3::splat(-0.5), Vec3::splat(0.5)));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let mesh = cube();
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize].position));
            let face = (b - a).cross(c - a).normalize();
            let normal = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            assert!(face.abs_diff_eq(normal, 1e-5), "face {face} vs normal {normal}");
        }
    }

    #[test]
    fn quad_faces_plus_z() {
        let mesh = quad();
        assert_eq!(mesh.vertices.len(), 4);
        indices_in_range(&mesh);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn sphere_counts_and_unit_radius() {
        let mesh = sphere(32, 16);
        assert_eq!(mesh.vertices.len(), 17 * 33);
        assert_eq!(mesh.indices.len(), 16 * 32 * 6);
        indices_in_range(&mesh);
        for p in mesh.positions() {
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_faces_wind_outward() {
        let mesh = sphere(8, 6);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize].position));
            let face = (b - a).cross(c - a);
            // Pole triangles collapse to zero area.
            if face.length_squared() < 1e-8 {
                continue;
            }
            assert!(face.dot(a + b + c) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    fn line_mesh_is_line_topology() {
        let mesh = lines([(Vec3::ZERO, Vec3::X), (Vec3::Y, Vec3::Z)]);
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        let v = MeshVertex::new(Vec3::X, Vec3::Y, [0.5, 0.5]);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 32);
    }
}
