//! The archive: sequential ids over a content store, with an OCR text
//! index and fuzzy search on top.
//!
//! Ingests are serialized by the allocator lock, which is held across
//! "pick next id, write file, advance, invalidate cache". Lookups and
//! searches only take the cache's read path and may run concurrently.

use std::sync::{Arc, Mutex};

use rand::seq::IndexedRandom;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    allocator::IdAllocator,
    config::ArchiveConfig,
    content_store::{ContentStore, StoredItem},
    data_dir::DataDir,
    error::{Error, Result, ValidationError},
    extraction::{Extraction, Extractor},
    id_cache::IdCache,
    item_id::ItemId,
    media::{self, MediaKind},
    ocr::OcrEngine,
    preprocess::Preprocessor,
    search::{self, SearchHit, SearchParams},
    similarity::{self, Scorer},
    text_index::TextIndex,
};

/// An item with its bytes and any indexed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub extension: String,
    pub bytes: Vec<u8>,
    /// `None` when the item was never indexed (non-image, or OCR failed).
    pub text: Option<String>,
}

/// Outcome of a lookup that falls back to a random item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub item: Item,
    /// The id the caller asked for, if any.
    pub requested: Option<u64>,
    /// True when `requested` was given but could not be served.
    pub fell_back: bool,
}

/// Summary of a reconciliation pass between the store and the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub items: usize,
    pub eligible: usize,
    pub already_indexed: usize,
    pub backfilled: usize,
    pub failed: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveStatus {
    pub items: usize,
    pub indexed: u64,
    pub current_max: u64,
    pub cache_valid: bool,
}

pub struct Archive {
    store: ContentStore,
    index: TextIndex,
    extractor: Extractor,
    scorer: Box<dyn Scorer>,
    allocator: Mutex<IdAllocator>,
    cache: IdCache,
    config: ArchiveConfig,
}

impl Archive {
    /// Open the archive in `data_dir` and reconcile it.
    pub fn open(
        data_dir: &DataDir,
        config: ArchiveConfig,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<(Self, RecoveryReport)> {
        let store = ContentStore::open(&data_dir.items_dir()?)?;
        let index = TextIndex::open(&data_dir.index_db())?;
        Self::from_parts(store, index, config, ocr)
    }

    /// Assemble an archive from an already opened store and index, seed
    /// the allocator, and run [`Archive::recover`] once.
    pub fn from_parts(
        store: ContentStore,
        index: TextIndex,
        config: ArchiveConfig,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<(Self, RecoveryReport)> {
        let allocator = IdAllocator::seeded(store.max_id()?);
        tracing::debug!(current_max = allocator.current_max(), "seeded allocator");

        let archive = Self {
            extractor: Extractor::new(Preprocessor::from_config(&config), ocr),
            scorer: similarity::scorer_for(config.scorer),
            allocator: Mutex::new(allocator),
            cache: IdCache::new(),
            store,
            index,
            config,
        };
        let report = archive.recover()?;
        Ok((archive, report))
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn current_max(&self) -> Result<u64> {
        Ok(self.lock_allocator()?.current_max())
    }

    /// Rebuild the id cache from the store and backfill missing index
    /// entries. Run at startup; safe to run again at any time.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();
        self.cache.rebuild(|| {
            let (ids, r) = self.scan_and_backfill()?;
            report = r;
            Ok(ids)
        })?;
        tracing::info!(
            items = report.items,
            backfilled = report.backfilled,
            failed = report.failed.len(),
            "archive recovered"
        );
        Ok(report)
    }

    /// Sorted ids of every item, from cache when valid.
    ///
    /// A stale cache is rebuilt from the store, backfilling the index for
    /// any item that has no entry yet.
    pub fn valid_ids(&self) -> Result<Arc<[u64]>> {
        self.cache
            .get_or_rebuild(|| self.scan_and_backfill().map(|(ids, _)| ids))
    }

    pub fn get_by_id(&self, id: u64) -> Result<Item> {
        let not_found = || Error::NotFound {
            kind: "item",
            name: format!("#{id}"),
        };
        let id = ItemId::new(id).ok_or_else(not_found)?;
        if !self.lock_allocator()?.has_issued(id) {
            return Err(not_found());
        }
        self.load(id)
    }

    pub fn get_random(&self) -> Result<Item> {
        let ids = self.valid_ids()?;
        let id = ids
            .choose(&mut rand::rng())
            .copied()
            .and_then(ItemId::new)
            .ok_or(Error::EmptyArchive)?;
        self.load(id)
    }

    /// Serve `requested` if it exists, otherwise a random item.
    pub fn lookup_or_random(&self, requested: Option<u64>) -> Result<Lookup> {
        if let Some(id) = requested {
            match self.get_by_id(id) {
                Ok(item) => {
                    return Ok(Lookup {
                        item,
                        requested,
                        fell_back: false,
                    });
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(id, "requested item missing, picking random");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Lookup {
            item: self.get_random()?,
            requested,
            fell_back: requested.is_some(),
        })
    }

    pub fn search(&self, params: &SearchParams) -> Result<Vec<SearchHit>> {
        search::execute_search(params, &self.index, self.scorer.as_ref())
    }

    /// Validate and store a new item, returning its id.
    ///
    /// Extraction failures are logged and do not fail the ingest; the
    /// item is retried on the next recovery.
    pub fn ingest(&self, bytes: &[u8], extension: &str) -> Result<ItemId> {
        let (extension, kind) = media::classify(extension)?;
        if bytes.len() > self.config.max_item_bytes {
            return Err(ValidationError::TooLarge {
                size: bytes.len(),
                max: self.config.max_item_bytes,
            }
            .into());
        }
        if kind == MediaKind::Image {
            media::check_image_dimensions(bytes)?;
        }

        let stored = {
            let mut allocator = self.lock_allocator()?;
            let id = allocator.next()?;
            let stored = self.store.write(id, &extension, bytes)?;
            allocator.advance(id)?;
            self.cache.invalidate()?;
            stored
        };
        tracing::info!(id = %stored.id, extension = %stored.extension, "ingested item");

        self.index_one(&stored);
        Ok(stored.id)
    }

    pub fn status(&self) -> Result<ArchiveStatus> {
        Ok(ArchiveStatus {
            items: self.valid_ids()?.len(),
            indexed: self.index.len()?,
            current_max: self.current_max()?,
            cache_valid: self.cache.is_valid(),
        })
    }

    fn load(&self, id: ItemId) -> Result<Item> {
        let (bytes, extension) = self.store.read(id)?;
        let text = self.index.get(id.get())?.map(|entry| entry.text);
        Ok(Item {
            id,
            extension,
            bytes,
            text,
        })
    }

    /// Extract text for one item, isolating failures to that item.
    fn index_one(&self, item: &StoredItem) -> Option<Extraction> {
        match self
            .extractor
            .extract(&self.index, item.id, &item.extension, &item.path)
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "text extraction failed");
                None
            }
        }
    }

    fn scan_and_backfill(&self) -> Result<(Vec<u64>, RecoveryReport)> {
        let items = self.store.list_all()?;
        let eligible: Vec<&StoredItem> = items
            .iter()
            .filter(|item| media::is_ocr_eligible(&item.extension))
            .collect();

        let outcomes: Vec<(u64, Option<Extraction>)> = eligible
            .par_iter()
            .map(|item| (item.id.get(), self.index_one(item)))
            .collect();

        let mut report = RecoveryReport {
            items: items.len(),
            eligible: eligible.len(),
            ..RecoveryReport::default()
        };
        for (id, outcome) in outcomes {
            match outcome {
                Some(Extraction::Indexed(_)) => report.backfilled += 1,
                Some(Extraction::AlreadyIndexed) => report.already_indexed += 1,
                Some(Extraction::Skipped) => {}
                None => report.failed.push(id),
            }
        }
        if report.backfilled > 0 {
            tracing::debug!(backfilled = report.backfilled, "backfilled text index");
        }

        let ids = items.iter().map(|item| item.id.get()).collect();
        Ok((ids, report))
    }

    fn lock_allocator(&self) -> Result<std::sync::MutexGuard<'_, IdAllocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::Inconsistent("allocator lock poisoned".into()))
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
