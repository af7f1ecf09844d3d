//! Render-ready meshes and their extraction from importer meshes.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use lumen_core::Aabb;
use tracing::debug;

use crate::source::MeshSource;

/// Vertex layout shared with the renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub color: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            uv: [0.0; 2],
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// One float vertex attribute inside [`Vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub offset: usize,
}

impl Vertex {
    pub const STRIDE: usize = size_of::<Vertex>();

    /// Position, normal, UV, tangent and bitangent, in shader location order.
    pub const ATTRIBUTES: [VertexAttribute; 5] = [
        VertexAttribute {
            location: 0,
            components: 3,
            offset: offset_of!(Vertex, position),
        },
        VertexAttribute {
            location: 1,
            components: 3,
            offset: offset_of!(Vertex, normal),
        },
        VertexAttribute {
            location: 2,
            components: 2,
            offset: offset_of!(Vertex, uv),
        },
        VertexAttribute {
            location: 3,
            components: 3,
            offset: offset_of!(Vertex, tangent),
        },
        VertexAttribute {
            location: 4,
            components: 3,
            offset: offset_of!(Vertex, bitangent),
        },
    ];
}

/// A drawable mesh produced by a model load.
#[derive(Debug, Clone)]
pub struct MeshRecord {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Triangle list, three indices per face.
    pub indices: Vec<u32>,
    /// Index into the owning model's materials.
    pub material: Option<usize>,
    /// Bounds of the untransformed vertex positions.
    pub bounds: Aabb,
    /// Accumulated node transform, `parent_world * local`.
    pub transform: Mat4,
}

impl MeshRecord {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Convert one importer mesh into a [`MeshRecord`] carrying `transform`.
///
/// Only channels the source reports are copied; absent ones keep the
/// [`Vertex`] defaults. Bounds use the raw positions.
pub fn extract_mesh(mesh: &dyn MeshSource, transform: Mat4) -> MeshRecord {
    let count = mesh.vertex_count();
    let positions = mesh.positions();
    let normals = mesh.normals();
    let tex_coords = mesh.tex_coords();
    let tangent_space = mesh.tangents_and_bitangents();
    let colors = mesh.colors();

    let mut vertices = Vec::with_capacity(count);
    let mut bounds = Aabb::EMPTY;

    for (i, &position) in positions.iter().enumerate() {
        let mut vertex = Vertex {
            position,
            ..Default::default()
        };

        if let Some(normal) = normals.and_then(|n| n.get(i)) {
            vertex.normal = *normal;
        }
        if let Some(uv) = tex_coords.and_then(|t| t.get(i)) {
            vertex.uv = *uv;
        }
        if let Some((tangents, bitangents)) = tangent_space {
            if let (Some(t), Some(b)) = (tangents.get(i), bitangents.get(i)) {
                vertex.tangent = *t;
                vertex.bitangent = *b;
            }
        }
        if let Some(color) = colors.and_then(|c| c.get(i)) {
            vertex.color = *color;
        }

        bounds.grow(Vec3::from_array(position));
        vertices.push(vertex);
    }

    let indices: Vec<u32> = mesh.faces().iter().flatten().copied().collect();

    debug!(
        "Extracted mesh '{}': {} vertices, {} indices",
        mesh.name(),
        vertices.len(),
        indices.len()
    );

    MeshRecord {
        name: mesh.name().to_string(),
        vertices,
        indices,
        material: mesh.material_index(),
        bounds,
        transform,
    }
}
