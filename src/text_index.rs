use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entries");

/// Extracted text for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub id: u64,
    pub text: String,
    pub extension: String,
}

/// Stored value; the id is the table key.
#[derive(Serialize, Deserialize)]
struct StoredEntry<'a> {
    text: std::borrow::Cow<'a, str>,
    extension: std::borrow::Cow<'a, str>,
}

impl IndexEntry {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&StoredEntry {
            text: self.text.as_str().into(),
            extension: self.extension.as_str().into(),
        })?)
    }

    fn decode(id: u64, bytes: &[u8]) -> Result<Self> {
        let stored: StoredEntry<'_> = serde_json::from_slice(bytes)?;
        Ok(Self {
            id,
            text: stored.text.into_owned(),
            extension: stored.extension.into_owned(),
        })
    }
}

/// Persistent id -> extracted text index.
///
/// Entries are written once per item; each upsert is its own transaction.
pub struct TextIndex {
    db: Database,
}

impl TextIndex {
    /// Open or create the index at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use quotevault::TextIndex;
    ///
    /// let index = TextIndex::open(&tmp.path().join("index.redb")).unwrap();
    /// assert!(index.is_empty().unwrap());
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(ENTRIES)?;
        txn.commit()?;

        Ok(Self { db })
    }

    pub fn get(&self, id: u64) -> Result<Option<IndexEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(IndexEntry::decode(id, guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        Ok(table.get(id)?.is_some())
    }

    /// Insert or replace the entry for `entry.id`.
    pub fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let bytes = entry.encode()?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES)?;
            table.insert(entry.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Every entry, in ascending id order.
    pub fn all(&self) -> Result<Vec<IndexEntry>> {
        self.find(|_| true)
    }

    /// Entries matching `predicate`, in ascending id order.
    pub fn find<P>(&self, predicate: P) -> Result<Vec<IndexEntry>>
    where
        P: Fn(&IndexEntry) -> bool,
    {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let mut result = Vec::new();
        for row in table.iter()? {
            let (k, v) = row?;
            let entry = IndexEntry::decode(k.value(), v.value())?;
            if predicate(&entry) {
                result.push(entry);
            }
        }
        Ok(result)
    }

    pub fn len(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for TextIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextIndex").finish_non_exhaustive()
    }
}
