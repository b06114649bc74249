use glam::Vec3;

/// A polyline drawn by the line shader. Nodes are consumed in pairs, each
/// pair one segment, so a strip of `n` points needs its inner points twice.
///
/// Nodes are in object space unless `world_space` is set, in which case the
/// object's spatial is ignored when drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct LineComponent {
    pub nodes: Vec<Vec3>,
    pub color: Vec3,
    pub world_space: bool,
}

impl LineComponent {
    pub fn new(color: Vec3) -> Self {
        Self {
            nodes: Vec::new(),
            color,
            world_space: false,
        }
    }

    /// A line whose nodes are already in world space.
    pub fn world(color: Vec3) -> Self {
        Self {
            world_space: true,
            ..Self::new(color)
        }
    }

    pub fn with_segment(mut self, a: Vec3, b: Vec3) -> Self {
        self.add_segment(a, b);
        self
    }

    pub fn add_node(&mut self, node: Vec3) {
        self.nodes.push(node);
    }

    pub fn add_segment(&mut self, a: Vec3, b: Vec3) {
        self.nodes.push(a);
        self.nodes.push(b);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Complete segments; a trailing unpaired node is ignored.
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.nodes.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

impl Default for LineComponent {
    fn default() -> Self {
        Self::new(Vec3::ONE)
    }
}
