//! Import configuration
//!
//! Usually kept next to the assets as `import.toml`:
//!
//! ```toml
//! require_texture_files = true
//!
//! [post_process]
//! flip_uvs = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AssetError;

/// Post-processing steps requested from the scene importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcess {
    /// Split strips, fans and polygons into triangles.
    pub triangulate: bool,
    /// Generate smooth per-vertex normals for meshes without normals.
    pub gen_smooth_normals: bool,
    /// Flip the V texture coordinate.
    pub flip_uvs: bool,
    /// Compute tangents and bitangents.
    pub calc_tangent_space: bool,
    /// Merge vertices with identical attributes.
    pub join_identical_vertices: bool,
    pub optimize_meshes: bool,
    pub optimize_graph: bool,
    pub fix_infacing_normals: bool,
    pub gen_bounding_boxes: bool,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            triangulate: true,
            gen_smooth_normals: true,
            flip_uvs: true,
            calc_tangent_space: true,
            join_identical_vertices: true,
            optimize_meshes: true,
            optimize_graph: true,
            fix_infacing_normals: true,
            gen_bounding_boxes: true,
        }
    }
}

impl PostProcess {
    /// No post-processing at all: the importer hands back the file's data
    /// as stored.
    pub fn none() -> Self {
        Self {
            triangulate: false,
            gen_smooth_normals: false,
            flip_uvs: false,
            calc_tangent_space: false,
            join_identical_vertices: false,
            optimize_meshes: false,
            optimize_graph: false,
            fix_infacing_normals: false,
            gen_bounding_boxes: false,
        }
    }
}

/// Settings for `Model` loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Flags used when `Model::load` is called without explicit flags.
    pub post_process: PostProcess,
    /// Treat external textures whose file does not exist as missing.
    pub require_texture_files: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            post_process: PostProcess::default(),
            require_texture_files: true,
        }
    }
}

impl ImportConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, AssetError> {
        toml::from_str(content).map_err(|e| AssetError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let content =
            fs::read_to_string(path).map_err(|e| AssetError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, or return defaults if it is absent or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No import config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded import config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}
