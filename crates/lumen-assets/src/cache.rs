use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::texture::TextureRecord;

/// Path-keyed store of external texture records, shared by every model
/// loaded against it.
///
/// Holds at most one record per path until [`TextureCache::clear`] is called.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: Mutex<HashMap<PathBuf, Arc<TextureRecord>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for `path`, creating it with `create` on a miss.
    ///
    /// The lock is held across lookup, creation and insertion, so concurrent
    /// loads of the same path observe a single record. Nothing is inserted if
    /// `create` fails.
    pub fn get_or_try_insert<E>(
        &self,
        path: &Path,
        create: impl FnOnce() -> Result<TextureRecord, E>,
    ) -> Result<Arc<TextureRecord>, E> {
        let mut entries = self.entries.lock();

        if let Some(record) = entries.get(path) {
            return Ok(Arc::clone(record));
        }

        let record = Arc::new(create()?);
        debug!("Cached texture {}", path.display());
        entries.insert(path.to_path_buf(), Arc::clone(&record));
        Ok(record)
    }

    /// Get the cached record for `path`.
    pub fn get(&self, path: &Path) -> Option<Arc<TextureRecord>> {
        self.entries.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every cached record. Models keep the records they already hold.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        debug!("Clearing {} cached textures", entries.len());
        entries.clear();
    }
}
