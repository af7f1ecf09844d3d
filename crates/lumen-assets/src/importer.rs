use std::path::Path;

use crate::config::PostProcess;
use crate::error::AssetError;
use crate::source::RawScene;

/// Reads a scene file into the raw form the import pipeline consumes.
///
/// Implementations parse the file, apply whichever of the requested
/// post-processing steps they support, and report failures as
/// [`AssetError::ImportFailed`] carrying a readable diagnostic.
pub trait SceneImporter: Send + Sync {
    fn import(&self, path: &Path, flags: &PostProcess) -> Result<RawScene, AssetError>;
}
