//! Raw scene data handed over by a scene importer.
//!
//! The extractor and resolvers only look at meshes and materials through the
//! read-only [`MeshSource`] and [`MaterialSource`] traits, so any importer
//! backend that can fill a [`RawScene`] (or implement the traits over its own
//! types) plugs into the pipeline unchanged.

use std::collections::HashMap;

use glam::Mat4;

/// Prefix marking a texture reference as an index into the scene's
/// embedded textures, e.g. `*0`.
pub const EMBEDDED_TEXTURE_MARKER: char = '*';

/// Semantic role of a texture within a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    BaseColor,
    Normal,
    Height,
    Metalness,
    Roughness,
    MetallicRoughness,
    AmbientOcclusion,
    Lightmap,
    Emissive,
    Specular,
    Unknown,
}

impl TextureKind {
    /// Short lowercase label, also used for identity hashing.
    pub fn label(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::BaseColor => "base_color",
            TextureKind::Normal => "normal",
            TextureKind::Height => "height",
            TextureKind::Metalness => "metallic",
            TextureKind::Roughness => "roughness",
            TextureKind::MetallicRoughness => "metallic_roughness",
            TextureKind::AmbientOcclusion => "ao",
            TextureKind::Lightmap => "lightmap",
            TextureKind::Emissive => "emissive",
            TextureKind::Specular => "specular",
            TextureKind::Unknown => "unknown",
        }
    }
}

/// Keys of the material property bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKey {
    Name,
    DiffuseColor,
    MetallicFactor,
    Reflectivity,
    RoughnessFactor,
    Shininess,
    EmissiveColor,
    SpecularColor,
    AmbientColor,
    EmissiveIntensity,
    Opacity,
    TwoSided,
}

/// A value in the material property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Float(f32),
    Int(i32),
    Bool(bool),
    Color([f32; 4]),
}

/// Read-only view of one mesh as delivered by the importer.
pub trait MeshSource {
    fn name(&self) -> &str;

    /// Vertex positions. Their count is the vertex count.
    fn positions(&self) -> &[[f32; 3]];

    fn normals(&self) -> Option<&[[f32; 3]]>;

    /// First UV channel.
    fn tex_coords(&self) -> Option<&[[f32; 2]]>;

    fn tangents_and_bitangents(&self) -> Option<(&[[f32; 3]], &[[f32; 3]])>;

    /// First vertex color channel.
    fn colors(&self) -> Option<&[[f32; 4]]>;

    /// Faces as lists of vertex indices, normally triangles.
    fn faces(&self) -> &[Vec<u32>];

    fn material_index(&self) -> Option<usize>;

    fn vertex_count(&self) -> usize {
        self.positions().len()
    }

    fn has_normals(&self) -> bool {
        self.normals().is_some()
    }

    fn has_tex_coords(&self) -> bool {
        self.tex_coords().is_some()
    }

    fn has_tangents_and_bitangents(&self) -> bool {
        self.tangents_and_bitangents().is_some()
    }

    fn has_colors(&self) -> bool {
        self.colors().is_some()
    }
}

/// Read-only view of one material as delivered by the importer.
pub trait MaterialSource {
    fn property(&self, key: MaterialKey) -> Option<&PropertyValue>;

    /// Path of the first texture registered under `kind`.
    fn texture(&self, kind: TextureKind) -> Option<&str>;

    fn text(&self, key: MaterialKey) -> Option<&str> {
        match self.property(key)? {
            PropertyValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn scalar(&self, key: MaterialKey) -> Option<f32> {
        match *self.property(key)? {
            PropertyValue::Float(value) => Some(value),
            PropertyValue::Int(value) => Some(value as f32),
            _ => None,
        }
    }

    fn color(&self, key: MaterialKey) -> Option<[f32; 4]> {
        match *self.property(key)? {
            PropertyValue::Color(rgba) => Some(rgba),
            _ => None,
        }
    }

    fn flag(&self, key: MaterialKey) -> Option<bool> {
        match *self.property(key)? {
            PropertyValue::Bool(value) => Some(value),
            PropertyValue::Int(value) => Some(value != 0),
            _ => None,
        }
    }
}

/// A node of the scene graph. Children and meshes are indices into the
/// owning [`RawScene`].
#[derive(Debug, Clone)]
pub struct RawNode {
    pub name: String,
    pub transform: Mat4,
    pub meshes: Vec<usize>,
    pub children: Vec<usize>,
}

impl RawNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = usize>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Mesh data as delivered by the importer.
#[derive(Debug, Clone, Default)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub faces: Vec<Vec<u32>>,
    pub material_index: Option<usize>,
}

impl MeshSource for RawMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    fn tex_coords(&self) -> Option<&[[f32; 2]]> {
        self.tex_coords.as_deref()
    }

    fn tangents_and_bitangents(&self) -> Option<(&[[f32; 3]], &[[f32; 3]])> {
        Some((self.tangents.as_deref()?, self.bitangents.as_deref()?))
    }

    fn colors(&self) -> Option<&[[f32; 4]]> {
        self.colors.as_deref()
    }

    fn faces(&self) -> &[Vec<u32>] {
        &self.faces
    }

    fn material_index(&self) -> Option<usize> {
        self.material_index
    }
}

/// Material data as delivered by the importer: a property bag plus the
/// texture paths registered per role.
#[derive(Debug, Clone, Default)]
pub struct RawMaterial {
    pub properties: HashMap<MaterialKey, PropertyValue>,
    pub textures: Vec<(TextureKind, String)>,
}

impl RawMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MaterialKey, value: PropertyValue) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn with_texture(mut self, kind: TextureKind, path: impl Into<String>) -> Self {
        self.textures.push((kind, path.into()));
        self
    }
}

impl MaterialSource for RawMaterial {
    fn property(&self, key: MaterialKey) -> Option<&PropertyValue> {
        self.properties.get(&key)
    }

    fn texture(&self, kind: TextureKind) -> Option<&str> {
        self.textures
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, path)| path.as_str())
    }
}

/// Image data packed inside the scene file.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedTexture {
    /// An encoded image file (PNG, JPEG, ...) stored as-is.
    Compressed { data: Vec<u8>, format_hint: String },
    /// Raw RGBA8 texels, row-major.
    Uncompressed { width: u32, height: u32, texels: Vec<u8> },
}

/// Everything a scene importer returns.
#[derive(Debug, Clone, Default)]
pub struct RawScene {
    pub nodes: Vec<RawNode>,
    pub root: Option<usize>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
    /// Set by importers that could not read the whole file.
    pub incomplete: bool,
}

impl RawScene {
    /// The root node, if the scene has one and it is in range.
    pub fn root_node(&self) -> Option<&RawNode> {
        self.nodes.get(self.root?)
    }
}
