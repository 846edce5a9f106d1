//! Directory discovery index
//!
//! Walks a directory tree once, reads the header of every asset document and
//! indexes it by GUID and by `(category, id)`. Lookups never touch the disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetlsp_values::{AssetCategory, DiscoveredFile, DiscoveryEnvironment, SourceFile};
use uuid::Uuid;

use crate::document::{AssetDocument, ASSET_EXTENSION, LOCALIZATION_FILE};
use crate::error::Result;
use crate::schema::SchemaDatabase;

#[derive(Debug, Default)]
pub struct DiscoveryIndex {
    files: Vec<DiscoveredFile>,
    by_guid: HashMap<Uuid, usize>,
    by_id: HashMap<(AssetCategory, u16), usize>,
}

impl DiscoveryIndex {
    /// Index every asset document under `root`.
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn scan(root: &Path, schema: &SchemaDatabase) -> Result<Self> {
        let mut index = Self::default();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_asset_file(&path) {
                    match AssetDocument::load(&path) {
                        Ok(document) => index.insert(discovered(path, &document, schema)),
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable asset file")
                        }
                    }
                }
            }
        }
        tracing::debug!(
            root = %root.display(),
            files = index.files.len(),
            guids = index.by_guid.len(),
            ids = index.by_id.len(),
            "Built discovery index"
        );
        Ok(index)
    }

    /// Add a file. The first file claiming a GUID or id keeps it.
    pub fn insert(&mut self, file: DiscoveredFile) {
        let slot = self.files.len();
        if let Some(guid) = file.guid {
            if let Some(existing) = self.by_guid.get(&guid) {
                tracing::warn!(
                    %guid,
                    path = %file.path.display(),
                    existing = %self.files[*existing].path.display(),
                    "Duplicate asset GUID"
                );
            } else {
                self.by_guid.insert(guid, slot);
            }
        }
        if file.id != 0 {
            self.by_id.entry((file.category, file.id)).or_insert(slot);
        }
        self.files.push(file);
    }

    pub fn files(&self) -> &[DiscoveredFile] {
        &self.files
    }

    /// Indexed file at `path`, if any.
    pub fn find_by_path(&self, path: &Path) -> Option<&DiscoveredFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl DiscoveryEnvironment for DiscoveryIndex {
    fn find_file_by_guid(&self, guid: Uuid) -> Option<DiscoveredFile> {
        let found = self.by_guid.get(&guid).map(|i| self.files[*i].clone());
        tracing::trace!(%guid, found = found.is_some(), "Discovery lookup by GUID");
        found
    }

    fn find_file_by_id(&self, id: u16, category: AssetCategory) -> Option<DiscoveredFile> {
        let found = self
            .by_id
            .get(&(category, id))
            .map(|i| self.files[*i].clone());
        tracing::trace!(id, %category, found = found.is_some(), "Discovery lookup by id");
        found
    }
}

fn is_asset_file(path: &Path) -> bool {
    let is_dat = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ASSET_EXTENSION));
    let is_localization = path
        .file_name()
        .is_some_and(|n| n.eq_ignore_ascii_case(LOCALIZATION_FILE));
    is_dat && !is_localization
}

/// Index entry for a loaded document.
pub fn discovered(path: PathBuf, document: &AssetDocument, schema: &SchemaDatabase) -> DiscoveredFile {
    let type_name = document.type_name().map(Arc::<str>::from);
    let category = type_name
        .as_deref()
        .map_or(AssetCategory::None, |t| schema.category_of(t));
    DiscoveredFile {
        asset_name: document.asset_name().map_or_else(|| Arc::from(""), Arc::from),
        type_name,
        guid: document.guid(),
        id: document.id(),
        category,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, guid: Option<u128>, id: u16, category: AssetCategory) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(format!("{}.dat", name)),
            asset_name: Arc::from(name),
            type_name: None,
            guid: guid.map(Uuid::from_u128),
            id,
            category,
        }
    }

    #[test]
    fn test_lookup_by_guid_and_id() {
        let mut index = DiscoveryIndex::default();
        index.insert(file("Rifle", Some(1), 42, AssetCategory::Item));
        index.insert(file("Truck", Some(2), 42, AssetCategory::Vehicle));

        assert_eq!(
            index.find_file_by_guid(Uuid::from_u128(2)).map(|f| f.asset_name),
            Some(Arc::from("Truck"))
        );
        assert_eq!(
            index
                .find_file_by_id(42, AssetCategory::Item)
                .map(|f| f.asset_name),
            Some(Arc::from("Rifle"))
        );
        assert!(index.find_file_by_id(42, AssetCategory::Animal).is_none());
        assert!(index.find_file_by_guid(Uuid::from_u128(3)).is_none());
    }

    #[test]
    fn test_first_claim_wins() {
        let mut index = DiscoveryIndex::default();
        index.insert(file("First", Some(1), 7, AssetCategory::Item));
        index.insert(file("Second", Some(1), 7, AssetCategory::Item));
        index.insert(file("NoId", None, 0, AssetCategory::Item));

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.find_file_by_guid(Uuid::from_u128(1)).map(|f| f.asset_name),
            Some(Arc::from("First"))
        );
        assert_eq!(
            index.find_file_by_id(7, AssetCategory::Item).map(|f| f.asset_name),
            Some(Arc::from("First"))
        );
        assert!(index.find_file_by_id(0, AssetCategory::Item).is_none());
    }

    #[test]
    fn test_asset_file_filter() {
        assert!(is_asset_file(Path::new("Items/Rifle/Rifle.dat")));
        assert!(is_asset_file(Path::new("Items/Rifle/Asset.DAT")));
        assert!(!is_asset_file(Path::new("Items/Rifle/English.dat")));
        assert!(!is_asset_file(Path::new("Items/Rifle/Icon.png")));
    }
}
