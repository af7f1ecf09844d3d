use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::AssetError;
use crate::source::TextureKind;

/// Where a texture's data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// An image file on disk. Pixels are decoded on demand.
    External(PathBuf),
    /// An image packed inside the scene file, by index.
    Embedded(usize),
}

impl TextureSource {
    /// Path for external textures, `*N` for embedded ones.
    pub fn identity(&self) -> String {
        match self {
            TextureSource::External(path) => path.to_string_lossy().into_owned(),
            TextureSource::Embedded(index) => format!("*{}", index),
        }
    }
}

/// Dimensions of uncompressed texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageExtent {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

/// A texture referenced by a model.
///
/// External records carry no data until a caller decodes them. Embedded
/// records carry either an encoded file (no extent) or raw RGBA8 texels
/// (with extent).
#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub source: TextureSource,
    pub kind: TextureKind,
    pub data: Vec<u8>,
    pub extent: Option<ImageExtent>,
    /// Encoding of compressed embedded data, e.g. `png`.
    pub format_hint: Option<String>,
    hash: u64,
}

impl TextureRecord {
    /// A not-yet-decoded texture file.
    pub fn external(path: impl Into<PathBuf>, kind: TextureKind) -> Self {
        Self::with_source(TextureSource::External(path.into()), kind)
    }

    /// An encoded image embedded in the scene.
    pub fn embedded_compressed(
        index: usize,
        kind: TextureKind,
        data: Vec<u8>,
        format_hint: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_source(TextureSource::Embedded(index), kind);
        record.data = data;
        record.format_hint = Some(format_hint.into());
        record
    }

    /// Raw RGBA8 texels embedded in the scene.
    pub fn embedded_rgba(
        index: usize,
        kind: TextureKind,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Self {
        let mut record = Self::with_source(TextureSource::Embedded(index), kind);
        record.data = data;
        record.extent = Some(ImageExtent {
            width,
            height,
            channels: 4,
        });
        record
    }

    fn with_source(source: TextureSource, kind: TextureKind) -> Self {
        let mut hasher = DefaultHasher::new();
        source.identity().hash(&mut hasher);
        kind.label().hash(&mut hasher);

        Self {
            source,
            kind,
            data: Vec::new(),
            extent: None,
            format_hint: None,
            hash: hasher.finish(),
        }
    }

    /// Identity hash derived from source path and kind.
    ///
    /// Stable within one process only: the hasher's algorithm may change
    /// between Rust releases, so do not persist it.
    pub fn identity_hash(&self) -> u64 {
        self.hash
    }

    /// The file path, for external textures.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            TextureSource::External(path) => Some(path),
            TextureSource::Embedded(_) => None,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.source, TextureSource::Embedded(_))
    }

    /// Decode the texture into RGBA8 pixels.
    ///
    /// Reads the file for external textures and decodes the stored bytes for
    /// compressed embedded ones. Raw embedded texels are returned as stored.
    pub fn decode(&self) -> Result<DecodedImage, AssetError> {
        if let Some(extent) = self.extent {
            return Ok(DecodedImage {
                width: extent.width,
                height: extent.height,
                pixels: self.data.clone(),
            });
        }

        let image = match &self.source {
            TextureSource::External(path) => image::open(path),
            TextureSource::Embedded(_) => image::load_from_memory(&self.data),
        }
        .map_err(|e| AssetError::ImageDecodeFailed(self.source.identity(), e.to_string()))?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

/// RGBA8 pixels produced by [`TextureRecord::decode`].
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}
