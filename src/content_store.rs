use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    item_id::ItemId,
};

/// An item file found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub id: ItemId,
    /// Lowercase file extension.
    pub extension: String,
    pub path: PathBuf,
}

/// A flat directory of immutable `<id>.<ext>` files.
///
/// The directory is the source of truth for which ids exist.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: ItemId, extension: &str) -> PathBuf {
        self.root.join(id.file_name(extension))
    }

    /// Durably write a new item.
    ///
    /// Bytes go to a hidden temp file in the store directory, are synced,
    /// then renamed into place without clobbering. An id that already has a
    /// file (under any extension) is an inconsistency, never an overwrite.
    pub fn write(
        &self,
        id: ItemId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredItem> {
        if let Some(existing) = self.find(id)? {
            return Err(Error::Inconsistent(format!(
                "item {id} already exists at {}",
                existing.path.display()
            )));
        }

        let target = self.path_for(id, extension);
        let mut tmp = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                Error::Inconsistent(format!(
                    "refusing to overwrite {}",
                    target.display()
                ))
            } else {
                Error::Io(e.error)
            }
        })?;

        // Make the rename itself durable.
        #[cfg(unix)]
        std::fs::File::open(&self.root)?.sync_all()?;

        Ok(StoredItem {
            id,
            extension: extension.to_string(),
            path: target,
        })
    }

    /// Read an item's bytes and extension.
    pub fn read(&self, id: ItemId) -> Result<(Vec<u8>, String)> {
        let item = self.find(id)?.ok_or_else(|| Error::NotFound {
            kind: "item",
            name: id.to_string(),
        })?;
        let bytes = std::fs::read(&item.path)?;
        Ok((bytes, item.extension))
    }

    /// Locate the file for `id`, whatever its extension.
    pub fn find(&self, id: ItemId) -> Result<Option<StoredItem>> {
        let prefix = format!("{}.", id.get());
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if !name.starts_with(&prefix) || !entry.file_type()?.is_file() {
                continue;
            }
            if let Some((found, extension)) = ItemId::parse_file_name(&name)
                && found == id
            {
                return Ok(Some(StoredItem {
                    id,
                    extension,
                    path: entry.path(),
                }));
            }
        }
        Ok(None)
    }

    /// List every item in the store, sorted by id.
    ///
    /// Skips hidden files (including in-flight writes), directories, and
    /// names that are not `<id>.<ext>`.
    pub fn list_all(&self) -> Result<Vec<StoredItem>> {
        let mut results = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }

            match ItemId::parse_file_name(&name) {
                Some((id, extension)) => results.push(StoredItem {
                    id,
                    extension,
                    path: entry.path(),
                }),
                None => {
                    tracing::warn!(file = %name, "ignoring stray file in item store");
                }
            }
        }

        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    /// Highest id present, or `None` for an empty store.
    pub fn max_id(&self) -> Result<Option<ItemId>> {
        Ok(self.list_all()?.last().map(|item| item.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ItemId {
        ItemId::new(n).unwrap()
    }

    fn test_store() -> (tempfile::TempDir, ContentStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(&tmp.path().join("items")).unwrap();
        (tmp, store)
    }

    #[test]
    fn write_then_read() {
        let (_tmp, store) = test_store();
        store.write(id(1), "mp3", b"sound").unwrap();

        let (bytes, ext) = store.read(id(1)).unwrap();
        assert_eq!(bytes, b"sound");
        assert_eq!(ext, "mp3");
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_tmp, store) = test_store();
        assert!(store.read(id(4)).unwrap_err().is_not_found());
    }

    #[test]
    fn refuses_to_overwrite_existing_id() {
        let (_tmp, store) = test_store();
        store.write(id(1), "png", b"first").unwrap();

        let err = store.write(id(1), "mp3", b"second").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(store.read(id(1)).unwrap().0, b"first");
    }

    #[test]
    fn find_does_not_confuse_prefixes() {
        let (_tmp, store) = test_store();
        store.write(id(12), "png", b"twelve").unwrap();

        assert!(store.find(id(1)).unwrap().is_none());
        assert_eq!(store.find(id(12)).unwrap().unwrap().extension, "png");
    }

    #[test]
    fn list_all_sorted_by_numeric_id() {
        let (_tmp, store) = test_store();
        for n in [10, 2, 1] {
            store.write(id(n), "wav", b"x").unwrap();
        }

        let ids: Vec<u64> =
            store.list_all().unwrap().iter().map(|i| i.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 10]);
        assert_eq!(store.max_id().unwrap(), Some(id(10)));
    }

    #[test]
    fn list_all_skips_hidden_and_stray_files() {
        let (_tmp, store) = test_store();
        store.write(id(3), "jpg", b"x").unwrap();
        std::fs::write(store.root().join(".incoming-abc"), "partial").unwrap();
        std::fs::write(store.root().join("readme.txt"), "hi").unwrap();
        std::fs::create_dir(store.root().join("7.png")).unwrap();

        let items = store.list_all().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id(3));
    }

    #[test]
    fn uppercase_extension_is_normalized() {
        let (_tmp, store) = test_store();
        std::fs::write(store.root().join("5.PNG"), "x").unwrap();

        let items = store.list_all().unwrap();
        assert_eq!(items[0].extension, "png");
    }

    #[test]
    fn empty_store() {
        let (_tmp, store) = test_store();
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.max_id().unwrap(), None);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_tmp, store) = test_store();
        store.write(id(1), "mp4", b"video").unwrap();

        let names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1.mp4".to_string()]);
    }
}
