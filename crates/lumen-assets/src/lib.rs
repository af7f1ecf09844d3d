//! Lumen Assets - Model import pipeline
//!
//! Turns scene files into render-ready meshes, PBR materials and texture
//! records. External textures are shared between models through a
//! [`TextureCache`]; embedded textures stay with the model that loaded them.

mod cache;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod gltf_loader;
mod importer;
mod material;
mod mesh;
mod model;
mod postprocess;
mod source;
mod texture;
mod texture_resolver;
mod walker;

pub use cache::TextureCache;
pub use config::{ImportConfig, PostProcess};
pub use error::AssetError;
pub use gltf_loader::GltfImporter;
pub use importer::SceneImporter;
pub use material::{
    resolve_material, MaterialRecord, TextureSlot, TextureSlots, METALLIC_ROUGHNESS_MARKER,
    MIN_ROUGHNESS,
};
pub use mesh::{extract_mesh, MeshRecord, Vertex, VertexAttribute};
pub use model::{LoadState, Model};
pub use postprocess::{
    bitangents_from_tangents, calc_tangent_space, fan_to_triangles, flip_uvs,
    generate_smooth_normals, join_identical_vertices, strip_to_triangles,
};
pub use source::{
    EmbeddedTexture, MaterialKey, MaterialSource, MeshSource, PropertyValue, RawMaterial, RawMesh,
    RawNode, RawScene, TextureKind, EMBEDDED_TEXTURE_MARKER,
};
pub use texture::{DecodedImage, ImageExtent, TextureRecord, TextureSource};
pub use texture_resolver::{normalize_path, TextureResolver};
pub use walker::walk_scene;
