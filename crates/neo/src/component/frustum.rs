use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// The six clip planes of a camera, in world space.
///
/// Planes are stored as `(normal, d)` with the normal pointing into the
/// frustum and normalised, so `dot(normal, p) + d` is the signed distance of
/// `p` from the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumComponent {
    /// Left, right, bottom, top, near, far.
    pub planes: [Vec4; 6],
}

impl FrustumComponent {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;

    /// Extracts the planes from a combined `proj · view` matrix
    /// (Gribb–Hartmann, OpenGL depth range).
    pub fn update(&mut self, proj_view: Mat4) {
        let r0 = proj_view.row(0);
        let r1 = proj_view.row(1);
        let r2 = proj_view.row(2);
        let r3 = proj_view.row(3);
        let raw = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2];
        for (plane, p) in self.planes.iter_mut().zip(raw) {
            let len = p.xyz().length();
            *plane = if len > 0.0 { p / len } else { p };
        }
    }

    pub fn distance(&self, plane: usize, point: Vec3) -> f32 {
        let p = self.planes[plane];
        p.xyz().dot(point) + p.w
    }

    /// Sphere test. A sphere is outside when it lies entirely behind any one
    /// plane.
    pub fn is_in_frustum(&self, center: Vec3, radius: f32) -> bool {
        (0..6).all(|i| self.distance(i, center) >= -radius)
    }
}

impl Default for FrustumComponent {
    fn default() -> Self {
        let mut f = Self {
            planes: [Vec4::ZERO; 6],
        };
        f.update(Mat4::IDENTITY);
        f
    }
}

/// World-space corners of a camera's view volume.
///
/// ```text
/// index   plane  x      y
///   0     near   left   bottom
///   1     near   left   top
///   2     near   right  bottom
///   3     near   right  top
///   4..8  far    (same order)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumBoundsComponent {
    pub corners: [Vec3; 8],
}

impl FrustumBoundsComponent {
    /// Corner pairs forming the twelve edges of the volume.
    pub const EDGES: [(usize, usize); 12] = [
        // near rectangle
        (0, 1),
        (1, 3),
        (3, 2),
        (2, 0),
        // far rectangle
        (4, 5),
        (5, 7),
        (7, 6),
        (6, 4),
        // connecting edges
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    /// NDC corners in the order of [`corners`](Self::corners), with the near
    /// plane at `near_z`.
    pub fn ndc_corners(near_z: f32) -> [Vec3; 8] {
        let mut out = [Vec3::ZERO; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let x = if i & 2 == 0 { -1.0 } else { 1.0 };
            let y = if i & 1 == 0 { -1.0 } else { 1.0 };
            let z = if i & 4 == 0 { near_z } else { 1.0 };
            *corner = Vec3::new(x, y, z);
        }
        out
    }

    /// Unprojects the NDC cube through `inverse(proj · view)`.
    pub fn update(&mut self, inv_proj_view: Mat4) {
        for (corner, ndc) in self.corners.iter_mut().zip(Self::ndc_corners(-1.0)) {
            *corner = inv_proj_view.project_point3(ndc);
        }
    }

    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    pub fn near_corners(&self) -> &[Vec3] {
        &self.corners[..4]
    }

    pub fn far_corners(&self) -> &[Vec3] {
        &self.corners[4..]
    }
}

impl Default for FrustumBoundsComponent {
    fn default() -> Self {
        Self {
            corners: Self::ndc_corners(-1.0),
        }
    }
}
