//! [`GeometryBuffer`]: parallel per-vertex arrays drawn as one batch.

use std::str::FromStr;

use anyhow::{bail, Error};
use glam::{Mat4, Vec2, Vec3, Vec4};
use scenegl_core::{BoundingBox, Hints, PrimitiveState};
use scenegl_device::{DrawMode, GlDevice, PolygonMode, VertexArrays};
use tracing::trace;

use crate::primitive::{Primitive, RenderContext};

/// How consecutive vertices form faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    TriangleStrip,
    Quads,
    TriangleList,
    TriangleFan,
}

impl From<GeometryKind> for DrawMode {
    fn from(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::TriangleStrip => DrawMode::TriangleStrip,
            GeometryKind::Quads => DrawMode::Quads,
            GeometryKind::TriangleList => DrawMode::Triangles,
            GeometryKind::TriangleFan => DrawMode::TriangleFan,
        }
    }
}

/// One of the four parallel arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexComponent {
    Position,
    Normal,
    Color,
    TexCoord,
}

impl FromStr for VertexComponent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "position" | "p" => VertexComponent::Position,
            "normal" | "n" => VertexComponent::Normal,
            "color" | "c" => VertexComponent::Color,
            "texcoord" | "t" => VertexComponent::TexCoord,
            other => bail!("unknown vertex component {other:?}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
    pub texcoord: Vec2,
}

const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

const NORMAL_COLOR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    kind: GeometryKind,
    state: PrimitiveState,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Vec<Vec3>,
    texcoords: Vec<Vec3>,
    finalized: bool,
}

impl GeometryBuffer {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            state: PrimitiveState::default(),
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            texcoords: Vec::new(),
            finalized: false,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Vertices in the position array.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Append one complete vertex. The buffer must be finalized again before
    /// it renders.
    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.positions.push(vertex.position);
        self.normals.push(vertex.normal);
        self.colors.push(vertex.color);
        self.texcoords.push(vertex.texcoord.extend(0.0));
        self.finalized = false;
    }

    /// Append to a single array. Leaves the buffer unrenderable until the
    /// arrays line up and [`finalize`](Self::finalize) is called.
    pub fn push(&mut self, component: VertexComponent, value: Vec3) {
        self.array_mut(component).push(value);
        self.finalized = false;
    }

    /// Mark the buffer renderable. Returns `false`, leaving it unrenderable,
    /// when the four arrays differ in length.
    pub fn finalize(&mut self) -> bool {
        let n = self.positions.len();
        self.finalized =
            self.normals.len() == n && self.colors.len() == n && self.texcoords.len() == n;
        if !self.finalized {
            trace!(
                positions = n,
                normals = self.normals.len(),
                colors = self.colors.len(),
                texcoords = self.texcoords.len(),
                "geometry arrays differ in length"
            );
        }
        self.finalized
    }

    /// Value of `component` at `index`, zero when out of range.
    pub fn get(&self, component: VertexComponent, index: usize) -> Vec3 {
        self.array(component)
            .get(index)
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    /// Overwrite `component` at `index`. Out-of-range writes are ignored.
    pub fn set(&mut self, component: VertexComponent, index: usize, value: Vec3) {
        if let Some(slot) = self.array_mut(component).get_mut(index) {
            *slot = value;
        }
    }

    pub fn array(&self, component: VertexComponent) -> &[Vec3] {
        match component {
            VertexComponent::Position => &self.positions,
            VertexComponent::Normal => &self.normals,
            VertexComponent::Color => &self.colors,
            VertexComponent::TexCoord => &self.texcoords,
        }
    }

    fn array_mut(&mut self, component: VertexComponent) -> &mut Vec<Vec3> {
        match component {
            VertexComponent::Position => &mut self.positions,
            VertexComponent::Normal => &mut self.normals,
            VertexComponent::Color => &mut self.colors,
            VertexComponent::TexCoord => &mut self.texcoords,
        }
    }

    fn draw_lines(&self, gl: &mut dyn GlDevice, lines: &[Vec3], color: Vec4) {
        gl.draw_arrays(
            DrawMode::Lines,
            &VertexArrays {
                positions: lines,
                normals: None,
                colors: None,
                texcoords: None,
                color,
                lit: false,
            },
        );
    }

    fn bound_lines(&self) -> Vec<Vec3> {
        let Some(corners) = self.bounding_box(&Mat4::IDENTITY).corners() else {
            return Vec::new();
        };
        BOX_EDGES
            .iter()
            .flat_map(|&(a, b)| [corners[a], corners[b]])
            .collect()
    }

    fn normal_lines(&self) -> Vec<Vec3> {
        self.positions
            .iter()
            .zip(&self.normals)
            .flat_map(|(p, n)| [*p, *p + *n])
            .collect()
    }
}

impl Primitive for GeometryBuffer {
    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        if !self.finalized {
            return;
        }
        let hints = self.state.hints;
        let gl = &mut *ctx.gl;

        gl.set_line_smooth(hints.contains(Hints::ANTIALIAS));
        if hints.contains(Hints::SOLID) {
            gl.polygon_mode(PolygonMode::Fill);
        }
        if hints.contains(Hints::POINTS) {
            gl.polygon_mode(PolygonMode::Point);
        }

        if hints.contains(Hints::BOUND) {
            self.draw_lines(gl, &self.bound_lines(), self.state.wire_color);
        }
        if hints.contains(Hints::NORMAL) {
            self.draw_lines(gl, &self.normal_lines(), NORMAL_COLOR);
        }
        if hints.contains(Hints::WIRE) {
            gl.polygon_mode(PolygonMode::Line);
        }

        let textured = ctx
            .textures
            .apply_current(ctx.gl, &self.state.textures, &self.state.texture_states);

        ctx.gl.draw_arrays(
            self.kind.into(),
            &VertexArrays {
                positions: &self.positions,
                normals: Some(&self.normals),
                colors: hints
                    .contains(Hints::VERTEX_COLORS)
                    .then_some(self.colors.as_slice()),
                texcoords: textured.then_some(self.texcoords.as_slice()),
                color: self.state.color,
                lit: !hints.intersects(Hints::UNLIT | Hints::WIRE),
            },
        );

        ctx.gl.polygon_mode(PolygonMode::Fill);
    }

    fn bounding_box(&self, space: &Mat4) -> BoundingBox {
        self.positions
            .iter()
            .map(|p| space.transform_point3(*p))
            .collect()
    }

    fn apply_transform(&mut self, scale_rotate_only: bool) {
        let transform = self.state.transform;
        if scale_rotate_only {
            for p in &mut self.positions {
                *p = transform.transform_vector3(*p);
            }
            for n in &mut self.normals {
                *n = transform.transform_vector3(*n).normalize_or_zero();
            }
        } else {
            for p in &mut self.positions {
                *p = transform.transform_point3(*p);
            }
        }
        self.state.transform = Mat4::IDENTITY;
        self.finalize();
    }

    fn clone_primitive(&self, _gl: &mut dyn GlDevice) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }

    fn state(&self) -> &PrimitiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PrimitiveState {
        &mut self.state
    }
}
