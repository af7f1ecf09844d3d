use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use lumen_core::Aabb;
use tracing::{info, warn};

use crate::cache::TextureCache;
use crate::config::{ImportConfig, PostProcess};
use crate::error::AssetError;
use crate::gltf_loader::GltfImporter;
use crate::importer::SceneImporter;
use crate::material::{resolve_material, MaterialRecord};
use crate::mesh::{extract_mesh, MeshRecord, Vertex};
use crate::source::RawScene;
use crate::texture::TextureRecord;
use crate::texture_resolver::TextureResolver;
use crate::walker::walk_scene;

/// Lifecycle of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed,
}

/// A scene file loaded into render-ready meshes, materials and textures.
///
/// List indices are stable for the lifetime of a load: materials refer to
/// textures and meshes refer to materials by index. External textures are
/// shared with every other model loaded against the same [`TextureCache`].
pub struct Model {
    path: PathBuf,
    meshes: Vec<MeshRecord>,
    materials: Vec<MaterialRecord>,
    textures: Vec<Arc<TextureRecord>>,
    bounds: Aabb,
    last_error: String,
    state: LoadState,
    cache: Arc<TextureCache>,
    importer: Box<dyn SceneImporter>,
    config: ImportConfig,
}

impl Model {
    /// Create an empty model that imports glTF files.
    pub fn new(cache: Arc<TextureCache>) -> Self {
        Self::with_importer(cache, GltfImporter::new())
    }

    /// Create an empty model backed by a custom scene importer.
    pub fn with_importer(cache: Arc<TextureCache>, importer: impl SceneImporter + 'static) -> Self {
        Self {
            path: PathBuf::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            bounds: Aabb::EMPTY,
            last_error: String::new(),
            state: LoadState::Empty,
            cache,
            importer: Box::new(importer),
            config: ImportConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the scene at `path`, replacing anything loaded before.
    ///
    /// `flags` overrides the configured post-processing. On failure the model
    /// is left empty in [`LoadState::Failed`] and [`Model::last_error`] holds
    /// the diagnostic. Texture problems are logged and leave the affected
    /// slot empty without failing the load.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        flags: Option<PostProcess>,
    ) -> Result<(), AssetError> {
        let path = path.as_ref();
        self.reset();
        self.path = path.to_path_buf();
        self.state = LoadState::Loading;

        let flags = flags.unwrap_or(self.config.post_process);
        let result = self
            .importer
            .import(path, &flags)
            .and_then(|scene| validate(path, scene));

        let (scene, root) = match result {
            Ok(imported) => imported,
            Err(e) => {
                warn!("Failed to load model {}: {}", path.display(), e);
                self.last_error = e.to_string();
                self.state = LoadState::Failed;
                return Err(e);
            }
        };

        self.bounds = Aabb::EMPTY;

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut resolver = TextureResolver::new(
            &directory,
            &self.cache,
            &scene.embedded_textures,
            &mut self.textures,
        )
        .require_files(self.config.require_texture_files);
        self.materials = scene
            .materials
            .iter()
            .map(|material| resolve_material(material, &mut resolver))
            .collect();

        let material_count = self.materials.len();
        let meshes = &mut self.meshes;
        let bounds = &mut self.bounds;
        let node_count = walk_scene(&scene, root, Mat4::IDENTITY, |index, world| {
            let mut record = extract_mesh(&scene.meshes[index], world);
            if let Some(material) = record.material.filter(|&m| m >= material_count) {
                warn!(
                    "Mesh '{}' references missing material {}",
                    record.name, material
                );
                record.material = None;
            }
            bounds.merge(&record.bounds);
            meshes.push(record);
        });

        self.state = LoadState::Loaded;
        info!(
            "Loaded model {}: {} nodes, {} meshes, {} materials, {} textures",
            path.display(),
            node_count,
            self.meshes.len(),
            self.materials.len(),
            self.textures.len()
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.path = PathBuf::new();
        self.meshes.clear();
        self.materials.clear();
        self.textures.clear();
        self.bounds = Aabb::EMPTY;
        self.last_error.clear();
        self.state = LoadState::Empty;
    }

    pub fn mesh(&self, index: usize) -> Option<&MeshRecord> {
        self.meshes.get(index)
    }

    /// First mesh with the given name.
    pub fn mesh_by_name(&self, name: &str) -> Option<&MeshRecord> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    pub fn material(&self, index: usize) -> Option<&MaterialRecord> {
        self.materials.get(index)
    }

    pub fn texture(&self, index: usize) -> Option<&Arc<TextureRecord>> {
        self.textures.get(index)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn meshes(&self) -> &[MeshRecord] {
        &self.meshes
    }

    pub fn materials(&self) -> &[MaterialRecord] {
        &self.materials
    }

    pub fn textures(&self) -> &[Arc<TextureRecord>] {
        &self.textures
    }

    /// Bounds of every mesh's untransformed vertex positions.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn min_bounds(&self) -> Vec3 {
        self.bounds.min
    }

    pub fn max_bounds(&self) -> Vec3 {
        self.bounds.max
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    pub fn radius(&self) -> f32 {
        self.bounds.radius()
    }

    /// Bounds of every mesh after applying its world transform.
    pub fn world_bounds(&self) -> Aabb {
        self.meshes.iter().fold(Aabb::EMPTY, |mut bounds, mesh| {
            bounds.merge(&mesh.bounds.transformed(&mesh.transform));
            bounds
        })
    }

    /// Diagnostic of the last failed load; empty after a successful one.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory external texture references are resolved against.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn cache(&self) -> &Arc<TextureCache> {
        &self.cache
    }

    /// All meshes merged into one vertex and one index buffer.
    ///
    /// Each mesh's indices are offset by the number of vertices preceding it.
    /// Transforms are not applied. Returns `None` when a rebased index does
    /// not fit in `u32`.
    pub fn combined_geometry(&self) -> Option<(Vec<Vertex>, Vec<u32>)> {
        let vertex_count = self.meshes.iter().map(|m| m.vertices.len()).sum();
        let index_count = self.meshes.iter().map(|m| m.indices.len()).sum();
        let mut vertices = Vec::with_capacity(vertex_count);
        let mut indices = Vec::with_capacity(index_count);

        for mesh in &self.meshes {
            let base = u32::try_from(vertices.len()).ok()?;
            vertices.extend_from_slice(&mesh.vertices);
            for &index in &mesh.indices {
                indices.push(base.checked_add(index)?);
            }
        }

        Some((vertices, indices))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("meshes", &self.meshes.len())
            .field("materials", &self.materials.len())
            .field("textures", &self.textures.len())
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

/// Reject scenes the pipeline cannot walk.
fn validate(path: &Path, scene: RawScene) -> Result<(RawScene, usize), AssetError> {
    let failed = |message: &str| AssetError::ImportFailed(path.to_path_buf(), message.to_string());

    if scene.incomplete {
        return Err(failed("scene is incomplete"));
    }
    match scene.root {
        Some(root) if root < scene.nodes.len() => Ok((scene, root)),
        _ => Err(failed("scene has no root node")),
    }
}
