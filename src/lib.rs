//! # knowledge-vault — Snapshot Export & Restore for a Knowledge Graph
//!
//! Serializes a graph of Terms, Texts and Persons (plus the relations between
//! them) into one self-describing XML document, and rebuilds an equivalent
//! graph from it in a store whose id policy may differ from the source.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `Store` is the contract between the snapshot engine and storage
//! 2. **Streaming**: import holds one record at a time, export one collection
//! 3. **Two-phase restore**: nodes and relations stream in; endpoints are rebound after
//! 4. **Cancellation is an outcome**: `RunOutcome::Canceled`, never an error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knowledge_vault::{CancelToken, ImportOptions, MemoryStore, NoProgress};
//! use knowledge_vault::{export_snapshot, restore_snapshot};
//!
//! # async fn example(clock: chrono::NaiveDateTime) -> knowledge_vault::Result<()> {
//! let source = MemoryStore::new();
//! let mut doc = Vec::new();
//! export_snapshot(&source, &mut doc, clock, &CancelToken::new()).await?;
//!
//! // Destination mints its own ids; relation endpoints are fixed up.
//! let dest = MemoryStore::minting_from(1000);
//! let outcome = restore_snapshot(
//!     &dest,
//!     doc.as_slice(),
//!     &ImportOptions::default(),
//!     &mut NoProgress,
//!     &CancelToken::new(),
//! ).await?;
//! println!("{} records, {} remapped", outcome.value().records, outcome.value().pending_remaps().len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Document Layout
//!
//! | Block | Record | Fields |
//! |-------|--------|--------|
//! | `Terms` | `Term` | id, title, text, created, modified |
//! | `Texts` | `Text` | id, title, author, year, publisher, … |
//! | `Persons` | `Person` | id, firstname, lastname, born, died, … |
//! | `Relations` | `Relation` | id, item1type, item1id, item2type, item2id |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod codec;
pub mod schema;
pub mod export;
pub mod import;
pub mod archive;
pub mod progress;
pub mod storage;
pub mod tx;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeDraft, NodeKind, UniqueId, Relation, RelationId,
    FieldValue, ValueKind, PropertyMap, Collection, Field, Record,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{Store, StoreCapabilities, MemoryStore, MemoryConfig, IdPolicy};

// ============================================================================
// Re-exports: Transactions
// ============================================================================

pub use tx::{Transaction, TxMode, TxId};

// ============================================================================
// Re-exports: Snapshot engine
// ============================================================================

pub use export::export_snapshot;
pub use import::{
    import_snapshot, restore_snapshot, rebind_edges,
    ImportOptions, ImportReport, ImportOutcome, InsertPolicy,
    IdentifierRebinder, RemapEntry,
};
pub use archive::{export_to_path, import_from_path, SnapshotFormat};
pub use progress::{CancelToken, ProgressSink, NoProgress, RunOutcome};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed snapshot at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Cannot decode field {field}: {message}")]
    Decode { field: String, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An import stopped after storing part of the document.
    #[error("Import stopped after {} records: {source}", .report.records)]
    Interrupted {
        source: Box<Error>,
        report: Box<ImportReport>,
    },
}

impl Error {
    /// The error that stopped the run, looking through `Interrupted`.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Interrupted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// What an interrupted import had already stored, remaps included.
    pub fn partial_report(&self) -> Option<&ImportReport> {
        match self {
            Error::Interrupted { report, .. } => Some(&**report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
