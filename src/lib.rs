//! quotevault - an append-only archive of screenshots and clips with OCR
//! text search.
//!
//! Items get sequential ids and are stored as `<id>.<ext>` files. Images
//! are normalized and run through an OCR engine
//! ([Tesseract](https://github.com/tesseract-ocr/tesseract) by default); the
//! recognized text is kept in a [redb](https://www.redb.org) index and
//! searched with a token-sort fuzzy ratio.
//!
//! # Quick start
//!
//! ```no_run
//! use quotevault::{Archive, ArchiveConfig, DataDir, TesseractOcr};
//! use quotevault::search::SearchParams;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let config = ArchiveConfig::from_env().unwrap();
//! let ocr = TesseractOcr::from_config(&config);
//! let (archive, _report) =
//!     Archive::open(&data_dir, config, Box::new(ocr)).unwrap();
//!
//! let id = archive.ingest(&std::fs::read("shot.png").unwrap(), "png").unwrap();
//! println!("stored as {id}");
//!
//! for hit in archive.search(&SearchParams::new("hello")).unwrap() {
//!     println!("{} #{} ({:.3})", hit.rank, hit.entry.id, hit.score);
//! }
//! ```

pub mod allocator;
pub mod archive;
pub mod config;
pub mod content_store;
pub mod data_dir;
pub mod error;
pub mod extraction;
pub mod id_cache;
pub mod item_id;
pub mod media;
pub mod ocr;
pub mod preprocess;
pub mod search;
pub mod similarity;
pub mod text_index;

pub use archive::{Archive, Item, Lookup, RecoveryReport};
pub use config::{ArchiveConfig, ScorerKind};
pub use content_store::ContentStore;
pub use data_dir::DataDir;
pub use error::{Error, Result, ValidationError};
pub use item_id::ItemId;
pub use ocr::{OcrEngine, TesseractOcr};
pub use text_index::TextIndex;
