//! File workspace with an LRU cache of parsed documents

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use assetlsp_values::{DiscoveredFile, FileHandle, SourceFile, Workspace};
use lru::LruCache;

use crate::document::AssetDocument;
use crate::error::Result;

/// Cache capacity used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Loads asset documents on demand and keeps the most recent ones parsed.
///
/// Handles share the cached document, so evicting an entry never invalidates
/// a handle that is still alive.
pub struct FileWorkspace {
    documents: Mutex<LruCache<PathBuf, Arc<AssetDocument>>>,
}

impl FileWorkspace {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            documents: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parsed document at `path`, from the cache when possible.
    pub fn open(&self, path: &Path) -> Result<Arc<AssetDocument>> {
        if let Some(document) = self.lock().get(path) {
            tracing::trace!(path = %path.display(), "Document cache hit");
            return Ok(document.clone());
        }

        tracing::debug!(path = %path.display(), "Document cache miss, loading");
        let document = Arc::new(AssetDocument::load(path)?);
        self.lock().put(path.to_path_buf(), document.clone());
        Ok(document)
    }

    /// Drop the cached copy of `path`, e.g. after the file changed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().pop(path).is_some()
    }

    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<PathBuf, Arc<AssetDocument>>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FileWorkspace {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// A loaded document, released when dropped.
pub struct DocumentHandle(Arc<AssetDocument>);

impl DocumentHandle {
    pub fn document(&self) -> &AssetDocument {
        &self.0
    }
}

impl FileHandle for DocumentHandle {
    fn file(&self) -> &dyn SourceFile {
        &*self.0
    }
}

impl Workspace for FileWorkspace {
    fn load_file_temporarily<'w>(&'w self, file: &DiscoveredFile) -> Option<Box<dyn FileHandle + 'w>> {
        match self.open(&file.path) {
            Ok(document) => Some(Box::new(DocumentHandle(document)) as Box<dyn FileHandle + 'w>),
            Err(err) => {
                tracing::warn!(
                    path = %file.path.display(),
                    error = %err,
                    "Failed to load cross-referenced file"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetlsp_values::{AssetCategory, Breadcrumbs, PropertyContext};
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "assetlsp-workspace-{}-{}",
            name,
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn discovered(path: PathBuf) -> DiscoveredFile {
        DiscoveredFile {
            path,
            asset_name: Arc::from("Crate"),
            type_name: None,
            guid: None,
            id: 0,
            category: AssetCategory::None,
        }
    }

    #[test]
    fn test_cache_hits_and_invalidation() {
        let dir = temp_dir("cache");
        let path = dir.join("Crate.dat");
        fs::write(&path, "Type SupplyAsset\nAmount 12\n").unwrap();

        let workspace = FileWorkspace::new(2);
        let first = workspace.open(&path).unwrap();
        fs::write(&path, "Type SupplyAsset\nAmount 99\n").unwrap();
        let second = workspace.open(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(workspace.cached(), 1);

        assert!(workspace.invalidate(&path));
        let reloaded = workspace.open(&path).unwrap();
        let amount = reloaded
            .try_get_property("Amount", &Breadcrumbs::root(), PropertyContext::Property)
            .and_then(|n| n.value.clone());
        assert_eq!(amount, Some(assetlsp_values::NodeValue::text("99")));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_eviction_keeps_live_handles() {
        let dir = temp_dir("evict");
        let paths: Vec<_> = (0..3)
            .map(|i| {
                let path = dir.join(format!("Asset{}.dat", i));
                fs::write(&path, format!("Type Asset\nIndex {}\n", i)).unwrap();
                path
            })
            .collect();

        let workspace = FileWorkspace::new(2);
        let handle = workspace
            .load_file_temporarily(&discovered(paths[0].clone()))
            .unwrap();
        workspace.open(&paths[1]).unwrap();
        workspace.open(&paths[2]).unwrap();
        assert_eq!(workspace.cached(), 2);
        assert_eq!(handle.file().type_name(), Some("Asset"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_no_handle() {
        let workspace = FileWorkspace::default();
        let missing = discovered(PathBuf::from("/nonexistent/assetlsp/Crate.dat"));
        assert!(workspace.load_file_temporarily(&missing).is_none());
    }
}
