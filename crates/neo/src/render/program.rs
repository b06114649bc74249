//! # Shader Programs and Uniform Reflection
//!
//! A [`ShaderProgram`] is the interface of a GPU program: its stage sources
//! and the uniform and attribute names it declares, each with a location.
//! The interface is either listed explicitly or reflected from GLSL text:
//!
//! ```text
//! uniform mat4 P, V, M;                      → uniforms P, V, M
//! uniform sampler2D diffuseMap;              → uniform diffuseMap
//! layout(location = 0) in vec3 vertPos;      → attribute vertPos
//! ```
//!
//! Source is cut into statements at every `;` and newline. A statement
//! starting with `uniform` declares the comma-separated names after its type
//! (array suffixes are dropped); a statement starting with `layout` declares
//! its last token as an attribute. Locations follow declaration order.
//!
//! Loading a name the program does not declare is not fatal: it logs a
//! warning the first time and the value is dropped.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::NeoError;
use crate::library::TextureHandle;

use super::api::{CommandBuffer, RenderCommand, UniformValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
    Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderStage {
    pub kind: StageKind,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct ShaderProgram {
    name: String,
    stages: Vec<ShaderStage>,
    uniforms: HashMap<String, u32>,
    attributes: HashMap<String, u32>,
    warned: HashSet<String>,
    next_texture_unit: u32,
}

impl ShaderProgram {
    /// A program with no stages and no declared interface.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
            warned: HashSet::new(),
            next_texture_unit: 0,
        }
    }

    /// Declares uniforms by name, in order.
    pub fn with_uniforms(mut self, names: &[&str]) -> Self {
        for name in names {
            self.declare_uniform(name);
        }
        self
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        for name in names {
            self.declare_attribute(name);
        }
        self
    }

    /// Adds a stage and reflects its interface.
    pub fn with_stage(mut self, kind: StageKind, source: impl Into<String>) -> Self {
        let source = source.into();
        let (uniforms, attributes) = reflect(&source);
        for u in &uniforms {
            self.declare_uniform(u);
        }
        for a in &attributes {
            self.declare_attribute(a);
        }
        self.stages.push(ShaderStage { kind, source });
        self
    }

    /// Adds a stage read from `path`.
    pub fn with_stage_file(self, kind: StageKind, path: impl AsRef<Path>) -> Result<Self, NeoError> {
        let source = read_source(path.as_ref().to_path_buf())?;
        Ok(self.with_stage(kind, source))
    }

    /// Reads `dir/vert` and `dir/frag` and reflects both.
    pub fn from_files(name: &str, dir: impl AsRef<Path>, vert: &str, frag: &str) -> Result<Self, NeoError> {
        let dir = dir.as_ref();
        let vert_src = read_source(dir.join(vert))?;
        let frag_src = read_source(dir.join(frag))?;
        log::info!("loaded program `{name}` from {}", dir.display());
        Ok(Self::new(name)
            .with_stage(StageKind::Vertex, vert_src)
            .with_stage(StageKind::Fragment, frag_src))
    }

    fn declare_uniform(&mut self, name: &str) {
        let next = self.uniforms.len() as u32;
        self.uniforms.entry(name.to_string()).or_insert(next);
    }

    fn declare_attribute(&mut self, name: &str) {
        let next = self.attributes.len() as u32;
        self.attributes.entry(name.to_string()).or_insert(next);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    pub fn uniform_location(&self, name: &str) -> Option<u32> {
        self.uniforms.get(name).copied()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Uniform names sorted by location.
    pub fn uniform_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, u32)> = self.uniforms.iter().map(|(n, &l)| (n.as_str(), l)).collect();
        names.sort_by_key(|&(_, l)| l);
        names.into_iter().map(|(n, _)| n).collect()
    }

    /// Makes this program current and resets its texture units.
    pub fn bind(&mut self, cmd: &mut CommandBuffer) {
        self.next_texture_unit = 0;
        cmd.push(RenderCommand::UseProgram(self.name.clone()));
    }

    /// Starts texture units over at 0, for per-object textures.
    pub fn reset_texture_units(&mut self) {
        self.next_texture_unit = 0;
    }

    /// Records `name = value`. Returns `false` (warning once per name) if the
    /// program does not declare `name`.
    pub fn load_uniform(
        &mut self,
        cmd: &mut CommandBuffer,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> bool {
        let Some(location) = self.uniform_location(name) else {
            if self.warned.insert(name.to_string()) {
                log::warn!("program `{}` has no uniform `{name}`", self.name);
            }
            return false;
        };
        cmd.push(RenderCommand::SetUniform {
            location,
            name: name.to_string(),
            value: value.into(),
        });
        true
    }

    /// Binds `texture` to the next free unit and points sampler `name` at it.
    pub fn load_texture(&mut self, cmd: &mut CommandBuffer, name: &str, texture: TextureHandle) -> bool {
        if !self.has_uniform(name) {
            return self.load_uniform(cmd, name, 0);
        }
        let unit = self.next_texture_unit;
        self.next_texture_unit += 1;
        cmd.push(RenderCommand::BindTexture { unit, texture });
        self.load_uniform(cmd, name, unit as i32)
    }
}

fn read_source(path: PathBuf) -> Result<String, NeoError> {
    std::fs::read_to_string(&path).map_err(|source| NeoError::Io { path, source })
}

/// Uniform and attribute names declared by `source`, in order.
pub fn reflect(source: &str) -> (Vec<String>, Vec<String>) {
    let mut uniforms = Vec::new();
    let mut attributes = Vec::new();

    for statement in source.split([';', '\n']).map(str::trim) {
        if let Some(rest) = statement.strip_prefix("uniform") {
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            // Skip the type, keep the declarators.
            let rest = rest.trim_start();
            let Some((_ty, names)) = rest.split_once(char::is_whitespace) else {
                continue;
            };
            for name in names.split(',') {
                let name = name.trim();
                let name = name.split('[').next().unwrap_or(name).trim();
                let name = name.split('=').next().unwrap_or(name).trim();
                if !name.is_empty() {
                    uniforms.push(name.to_string());
                }
            }
        } else if statement.starts_with("layout") {
            if let Some(last) = statement.split_whitespace().last() {
                let last = last.split('[').next().unwrap_or(last);
                attributes.push(last.to_string());
            }
        }
    }

    (uniforms, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = "#version 330 core
layout(location = 0) in vec3 vertPos;
layout(location = 1) in vec3 vertNor;
uniform mat4 P, V, M;
uniform mat3 N;
void main() { gl_Position = P * V * M * vec4(vertPos, 1); }
";

    const FRAG: &str = "#version 330 core
uniform vec3 lightPos; uniform vec3 lightCol;
uniform sampler2D diffuseMap;
uniform float weights[4];
out vec4 color;
";

    #[test]
    fn reflects_uniforms_and_attributes() {
        let (uniforms, attributes) = reflect(VERT);
        assert_eq!(uniforms, vec!["P", "V", "M", "N"]);
        assert_eq!(attributes, vec!["vertPos", "vertNor"]);
    }

    #[test]
    fn semicolons_split_statements_on_one_line() {
        let (uniforms, _) = reflect(FRAG);
        assert_eq!(uniforms, vec!["lightPos", "lightCol", "diffuseMap", "weights"]);
    }

    #[test]
    fn words_starting_with_uniform_are_not_declarations() {
        let (uniforms, _) = reflect("uniformity = 1;\nuniform float x;");
        assert_eq!(uniforms, vec!["x"]);
    }

    #[test]
    fn locations_follow_declaration_order_across_stages() {
        let program = ShaderProgram::new("phong")
            .with_stage(StageKind::Vertex, VERT)
            .with_stage(StageKind::Fragment, FRAG);
        assert_eq!(program.uniform_location("P"), Some(0));
        assert_eq!(program.uniform_location("N"), Some(3));
        assert_eq!(program.uniform_location("lightPos"), Some(4));
        assert_eq!(program.attribute_location("vertNor"), Some(1));
        assert_eq!(program.stages().len(), 2);
        assert_eq!(&program.uniform_names()[..3], &["P", "V", "M"]);
    }

    #[test]
    fn unknown_uniforms_are_dropped() {
        let mut program = ShaderProgram::new("p").with_uniforms(&["M"]);
        let mut cmd = CommandBuffer::new();
        assert!(program.load_uniform(&mut cmd, "M", glam::Mat4::IDENTITY));
        assert!(!program.load_uniform(&mut cmd, "missing", 1.0f32));
        assert!(!program.load_uniform(&mut cmd, "missing", 1.0f32));
        assert_eq!(cmd.len(), 1);
        assert_eq!(program.warned.len(), 1);
    }

    #[test]
    fn textures_take_successive_units() {
        let mut program = ShaderProgram::new("p").with_uniforms(&["a", "b"]);
        let mut cmd = CommandBuffer::new();
        program.bind(&mut cmd);
        program.load_texture(&mut cmd, "a", TextureHandle(5));
        program.load_texture(&mut cmd, "b", TextureHandle(6));
        assert_eq!(cmd.last_uniform("b"), Some(UniformValue::Int(1)));
        assert!(cmd.commands().contains(&RenderCommand::BindTexture {
            unit: 0,
            texture: TextureHandle(5)
        }));

        program.bind(&mut cmd);
        program.load_texture(&mut cmd, "b", TextureHandle(6));
        assert_eq!(cmd.last_uniform("b"), Some(UniformValue::Int(0)));
    }

    #[test]
    fn from_files_reports_missing_path() {
        let err = ShaderProgram::from_files("p", "/definitely/not/here", "a.vert", "a.frag").unwrap_err();
        assert!(matches!(err, NeoError::Io { .. }));
        assert!(err.to_string().contains("a.vert"));
    }

    #[test]
    fn from_files_reads_and_reflects() {
        let dir = std::env::temp_dir().join(format!("neo-program-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("t.vert"), VERT).unwrap();
        std::fs::write(dir.join("t.frag"), FRAG).unwrap();

        let program = ShaderProgram::from_files("t", &dir, "t.vert", "t.frag").unwrap();
        assert!(program.has_uniform("diffuseMap"));
        assert!(program.attribute_location("vertPos").is_some());
        std::fs::remove_dir_all(&dir).ok();
    }
}
