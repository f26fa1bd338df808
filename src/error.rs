use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("index entry encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("the archive has no items yet")]
    EmptyArchive,

    #[error("invalid item: {0}")]
    Validation(#[from] ValidationError),

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error("text extraction failed for item #{id}: {reason}")]
    Extraction { id: u64, reason: String },

    #[error("archive state is inconsistent: {0}")]
    Inconsistent(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Whether the process should stop rather than keep serving requests.
    ///
    /// Only allocator or store inconsistencies qualify, since continuing
    /// could hand the same id out twice.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Inconsistent(_))
    }

    /// Whether the error means "nothing there" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::EmptyArchive)
    }
}

/// Reasons an ingest request is rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported file type: .{0}")]
    UnsupportedExtension(String),

    #[error("file has no extension")]
    MissingExtension,

    #[error("item is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("image could not be read: {0}")]
    InvalidImage(String),
}
