//! # Store Trait
//!
//! The contract between the snapshot engine and whatever holds the graph.
//! The engine never reaches past this trait: export only queries, import only
//! creates, inserts, and (for the rebind pass) rewrites relation endpoints.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for tests and embedding |

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::{IdPolicy, MemoryConfig, MemoryStore};

// ============================================================================
// Store capabilities
// ============================================================================

/// What a store can do — used to pick the import insert policy.
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    /// The store honors caller-supplied node and relation ids.
    /// When false it always mints its own, and imports must run Cautious.
    pub accepts_caller_ids: bool,
}

// ============================================================================
// Store Trait
// ============================================================================

/// The storage contract consumed by export and import.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// The transaction type for this store.
    type Tx: Transaction;

    // ========================================================================
    // Transactions
    // ========================================================================

    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Hand out an empty, unsaved node of the given kind.
    fn create_node(&self, kind: NodeKind) -> NodeDraft {
        NodeDraft::new(kind)
    }

    /// Persist a draft and return the id the store assigned.
    ///
    /// `id_hint` is the id the caller would like. Stores that accept caller
    /// ids must use it (or fail); stores that mint their own ignore it.
    async fn insert_node(
        &self,
        tx: &mut Self::Tx,
        draft: NodeDraft,
        id_hint: Option<i64>,
    ) -> Result<i64>;

    /// Get a node by id. Returns None if not found.
    async fn get_node(&self, tx: &Self::Tx, id: UniqueId) -> Result<Option<Node>>;

    async fn node_exists(&self, tx: &Self::Tx, id: UniqueId) -> Result<bool> {
        Ok(self.get_node(tx, id).await?.is_some())
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Create a relation between two nodes.
    ///
    /// Endpoints are stored as given; during a Cautious import they may name
    /// ids that are fixed up later by the rebind pass.
    async fn insert_relation(
        &self,
        tx: &mut Self::Tx,
        id_hint: Option<i64>,
        item1: UniqueId,
        item2: UniqueId,
    ) -> Result<RelationId>;

    async fn get_relation(&self, tx: &Self::Tx, id: RelationId) -> Result<Option<Relation>>;

    /// Overwrite both endpoints of an existing relation.
    async fn set_relation_endpoints(
        &self,
        tx: &mut Self::Tx,
        id: RelationId,
        item1: UniqueId,
        item2: UniqueId,
    ) -> Result<()>;

    /// All relations, ordered by id.
    async fn relations(&self, tx: &Self::Tx) -> Result<Vec<Relation>>;

    // ========================================================================
    // Scan
    // ========================================================================

    /// All records of one collection, in schema field order.
    async fn query(&self, tx: &Self::Tx, collection: Collection) -> Result<Vec<Record>>;

    async fn node_count(&self, tx: &Self::Tx) -> Result<u64>;

    async fn relation_count(&self, tx: &Self::Tx) -> Result<u64>;

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }
}
