use std::path::PathBuf;

/// Errors that can occur during model import.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import scene '{0}': {1}")]
    ImportFailed(PathBuf, String),

    #[error("texture not found: {0}")]
    MissingAsset(PathBuf),

    #[error("invalid embedded texture reference '{0}': {1}")]
    EmbeddedTexture(String, String),

    #[error("failed to decode image '{0}': {1}")]
    ImageDecodeFailed(String, String),

    #[error("I/O error reading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid import configuration: {0}")]
    Config(String),
}
