//! Turns material texture references into entries of a model's texture list.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::cache::TextureCache;
use crate::error::AssetError;
use crate::source::{EmbeddedTexture, TextureKind, EMBEDDED_TEXTURE_MARKER};
use crate::texture::TextureRecord;

/// Resolves texture references for one model load.
///
/// External files go through the shared [`TextureCache`]; embedded textures
/// are decoded into records owned by this model only.
pub struct TextureResolver<'a> {
    directory: &'a Path,
    cache: &'a TextureCache,
    embedded: &'a [EmbeddedTexture],
    require_files: bool,
    textures: &'a mut Vec<Arc<TextureRecord>>,
    embedded_slots: HashMap<usize, usize>,
}

impl<'a> TextureResolver<'a> {
    pub fn new(
        directory: &'a Path,
        cache: &'a TextureCache,
        embedded: &'a [EmbeddedTexture],
        textures: &'a mut Vec<Arc<TextureRecord>>,
    ) -> Self {
        Self {
            directory,
            cache,
            embedded,
            require_files: true,
            textures,
            embedded_slots: HashMap::new(),
        }
    }

    /// Whether external references must point at an existing file.
    pub fn require_files(mut self, require: bool) -> Self {
        self.require_files = require;
        self
    }

    /// Resolve `reference` and return its index in the model's texture list.
    pub fn resolve(&mut self, reference: &str, kind: TextureKind) -> Result<usize, AssetError> {
        match reference.strip_prefix(EMBEDDED_TEXTURE_MARKER) {
            Some(index) => self.resolve_embedded(reference, index, kind),
            None => self.resolve_external(reference, kind),
        }
    }

    fn resolve_embedded(
        &mut self,
        reference: &str,
        index: &str,
        kind: TextureKind,
    ) -> Result<usize, AssetError> {
        let index: usize = index.trim().parse().map_err(|_| {
            AssetError::EmbeddedTexture(reference.to_string(), "not an index".into())
        })?;

        if let Some(&slot) = self.embedded_slots.get(&index) {
            return Ok(slot);
        }

        let embedded = self.embedded.get(index).ok_or_else(|| {
            AssetError::EmbeddedTexture(
                reference.to_string(),
                format!("scene has {} embedded textures", self.embedded.len()),
            )
        })?;

        let record = match embedded {
            EmbeddedTexture::Compressed { data, format_hint } => {
                TextureRecord::embedded_compressed(index, kind, data.clone(), format_hint.as_str())
            }
            EmbeddedTexture::Uncompressed {
                width,
                height,
                texels,
            } => {
                let size = (*width as usize)
                    .checked_mul(*height as usize)
                    .and_then(|pixels| pixels.checked_mul(4))
                    .ok_or_else(|| {
                        AssetError::EmbeddedTexture(
                            reference.to_string(),
                            format!("dimensions {}x{} overflow", width, height),
                        )
                    })?;
                let data = texels.get(..size).ok_or_else(|| {
                    AssetError::EmbeddedTexture(
                        reference.to_string(),
                        format!("expected {} bytes of RGBA data, found {}", size, texels.len()),
                    )
                })?;
                TextureRecord::embedded_rgba(index, kind, *width, *height, data.to_vec())
            }
        };

        debug!("Decoded embedded texture {} ({})", reference, kind.label());
        let slot = self.push(Arc::new(record));
        self.embedded_slots.insert(index, slot);
        Ok(slot)
    }

    fn resolve_external(&mut self, reference: &str, kind: TextureKind) -> Result<usize, AssetError> {
        let path = normalize_path(self.directory, reference);
        let require_files = self.require_files;

        let record = self.cache.get_or_try_insert(&path, || {
            if require_files && !path.is_file() {
                return Err(AssetError::MissingAsset(path.clone()));
            }
            Ok(TextureRecord::external(&path, kind))
        })?;

        if let Some(slot) = self.textures.iter().position(|t| Arc::ptr_eq(t, &record)) {
            return Ok(slot);
        }
        Ok(self.push(record))
    }

    fn push(&mut self, record: Arc<TextureRecord>) -> usize {
        self.textures.push(record);
        self.textures.len() - 1
    }
}

/// Join `reference` onto `directory` and fold `.` and `..` lexically.
///
/// Backslash separators in the reference are treated as `/`. The result is
/// the texture cache key.
pub fn normalize_path(directory: &Path, reference: &str) -> PathBuf {
    let reference = reference.replace('\\', "/");
    let joined = directory.join(reference);

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"not really an image").unwrap();
    }

    #[test]
    fn normalize_folds_dots_and_backslashes() {
        let dir = Path::new("/assets/models");
        assert_eq!(
            normalize_path(dir, "textures\\wood.png"),
            PathBuf::from("/assets/models/textures/wood.png")
        );
        assert_eq!(
            normalize_path(dir, "./../shared/./metal.png"),
            PathBuf::from("/assets/shared/metal.png")
        );
        assert_eq!(
            normalize_path(dir, "/absolute/tex.png"),
            PathBuf::from("/absolute/tex.png")
        );
    }

    #[test]
    fn uncompressed_embedded_copies_rgba() {
        let texels: Vec<u8> = (0..16).collect();
        let embedded = vec![EmbeddedTexture::Uncompressed {
            width: 2,
            height: 2,
            texels: texels.clone(),
        }];
        let cache = TextureCache::new();
        let mut textures = Vec::new();

        let index = TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures)
            .resolve("*0", TextureKind::Diffuse)
            .unwrap();

        assert_eq!(index, 0);
        let record = &textures[0];
        let extent = record.extent.unwrap();
        assert_eq!((extent.width, extent.height, extent.channels), (2, 2, 4));
        assert_eq!(record.data, texels);
        assert!(cache.is_empty());
    }

    #[test]
    fn compressed_embedded_keeps_bytes_without_extent() {
        let embedded = vec![EmbeddedTexture::Compressed {
            data: vec![0x89, b'P', b'N', b'G'],
            format_hint: "png".into(),
        }];
        let cache = TextureCache::new();
        let mut textures = Vec::new();

        TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures)
            .resolve("*0", TextureKind::Normal)
            .unwrap();

        assert_eq!(textures[0].data, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(textures[0].extent, None);
        assert_eq!(textures[0].format_hint.as_deref(), Some("png"));
    }

    #[test]
    fn embedded_index_resolves_once_per_model() {
        let embedded = vec![EmbeddedTexture::Compressed {
            data: vec![1, 2, 3],
            format_hint: "jpg".into(),
        }];
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver =
            TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures);

        assert_eq!(resolver.resolve("*0", TextureKind::Diffuse).unwrap(), 0);
        assert_eq!(resolver.resolve("*0", TextureKind::Emissive).unwrap(), 0);
        drop(resolver);
        assert_eq!(textures.len(), 1);
    }

    #[test]
    fn bad_embedded_references_fail() {
        let embedded = vec![EmbeddedTexture::Uncompressed {
            width: 4,
            height: 4,
            texels: vec![0; 8],
        }];
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver =
            TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures);

        for reference in ["*x", "*7", "*0"] {
            match resolver.resolve(reference, TextureKind::Diffuse) {
                Err(AssetError::EmbeddedTexture(r, _)) => assert_eq!(r, reference),
                other => panic!("expected EmbeddedTexture error, got: {:?}", other),
            }
        }
        drop(resolver);
        assert!(textures.is_empty());
    }

    #[test]
    fn oversized_embedded_dimensions_fail() {
        let embedded = vec![EmbeddedTexture::Uncompressed {
            width: u32::MAX,
            height: u32::MAX,
            texels: vec![0; 16],
        }];
        let cache = TextureCache::new();
        let mut textures = Vec::new();

        let result = TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures)
            .resolve("*0", TextureKind::Diffuse);

        assert!(matches!(result, Err(AssetError::EmbeddedTexture(..))));
        assert!(textures.is_empty());
    }

    #[test]
    fn missing_external_file_is_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextureCache::new();
        let mut textures = Vec::new();

        let result = TextureResolver::new(dir.path(), &cache, &[], &mut textures)
            .resolve("nope.png", TextureKind::Diffuse);

        match result {
            Err(AssetError::MissingAsset(path)) => assert_eq!(path, dir.path().join("nope.png")),
            other => panic!("expected MissingAsset, got: {:?}", other),
        }
        assert!(cache.is_empty());
        assert!(textures.is_empty());
    }

    #[test]
    fn unchecked_external_file_is_accepted() {
        let cache = TextureCache::new();
        let mut textures = Vec::new();

        let index = TextureResolver::new(Path::new("/nonexistent"), &cache, &[], &mut textures)
            .require_files(false)
            .resolve("wood.png", TextureKind::Diffuse)
            .unwrap();

        assert_eq!(index, 0);
        assert!(cache.contains(Path::new("/nonexistent/wood.png")));
    }

    #[test]
    fn external_reference_is_deduplicated_within_model() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "textures/wood.png");
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver = TextureResolver::new(dir.path(), &cache, &[], &mut textures);

        let a = resolver.resolve("textures/wood.png", TextureKind::Diffuse).unwrap();
        let b = resolver.resolve("textures\\wood.png", TextureKind::Diffuse).unwrap();
        let c = resolver.resolve("./textures/../textures/wood.png", TextureKind::Normal).unwrap();

        assert_eq!((a, b, c), (0, 0, 0));
        drop(resolver);
        assert_eq!(textures.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_record_is_shared_across_models() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "wood.png");
        let cache = TextureCache::new();

        let mut first = Vec::new();
        TextureResolver::new(dir.path(), &cache, &[], &mut first)
            .resolve("wood.png", TextureKind::Diffuse)
            .unwrap();

        let mut second = vec![Arc::new(TextureRecord::embedded_rgba(
            0,
            TextureKind::Diffuse,
            1,
            1,
            vec![0; 4],
        ))];
        let index = TextureResolver::new(dir.path(), &cache, &[], &mut second)
            .resolve("wood.png", TextureKind::Diffuse)
            .unwrap();

        assert_eq!(index, 1);
        assert!(Arc::ptr_eq(&first[0], &second[1]));
        assert_eq!(cache.len(), 1);
    }
}
