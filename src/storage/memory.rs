//! In-memory store.
//!
//! This is the reference implementation of `Store`.
//! It uses ordered maps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No real transactions**: `commit_tx()` and `rollback_tx()` are no-ops.
//!   Writes are applied immediately. Rollback does NOT undo mutations.
//! - **Single-writer only**: per-collection locks mean multi-step mutations
//!   are NOT atomic across collections.
//! - **No endpoint checks on relations**: relation endpoints are stored as
//!   given, so a Cautious import can write recorded ids and rebind them later.
//!
//! `IdPolicy` decides whether caller-supplied ids are honored. Tests use
//! `IdPolicy::MintOwn` to model destinations that always assign their own keys.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;

use crate::model::*;
use crate::schema;
use crate::tx::{Transaction, TxMode, TxId};
use crate::{Error, Result};
use super::{Store, StoreCapabilities};

// ============================================================================
// Configuration
// ============================================================================

/// How the store assigns primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Use the caller's id hint when given; mint only when there is none.
    #[default]
    AcceptCallerIds,
    /// Ignore hints and always mint.
    MintOwn,
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub id_policy: IdPolicy,
    /// First id minted for each node kind and for relations.
    pub first_id: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::AcceptCallerIds,
            first_id: 1,
        }
    }
}

impl MemoryConfig {
    pub fn with_id_policy(mut self, id_policy: IdPolicy) -> Self {
        self.id_policy = id_policy;
        self
    }

    pub fn with_first_id(mut self, first_id: i64) -> Self {
        self.first_id = first_id;
        self
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory knowledge graph storage.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    config: MemoryConfig,
    nodes: RwLock<BTreeMap<UniqueId, Node>>,
    relations: RwLock<BTreeMap<RelationId, Relation>>,
    /// One counter per node kind, indexed by `kind_slot`.
    next_node_ids: [AtomicI64; 3],
    next_rel_id: AtomicI64,
    next_tx_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// A store that ignores id hints and mints from `first_id` upward.
    pub fn minting_from(first_id: i64) -> Self {
        Self::with_config(
            MemoryConfig::default()
                .with_id_policy(IdPolicy::MintOwn)
                .with_first_id(first_id),
        )
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        let first = config.first_id;
        Self {
            inner: Arc::new(MemoryInner {
                config,
                nodes: RwLock::new(BTreeMap::new()),
                relations: RwLock::new(BTreeMap::new()),
                next_node_ids: [AtomicI64::new(first), AtomicI64::new(first), AtomicI64::new(first)],
                next_rel_id: AtomicI64::new(first),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_slot(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Term => 0,
        NodeKind::Text => 1,
        NodeKind::Person => 2,
    }
}

/// Pick the id for a new row: the hint when the policy allows it, otherwise
/// the next free value of `counter`.
fn assign_id(
    policy: IdPolicy,
    hint: Option<i64>,
    counter: &AtomicI64,
    taken: impl Fn(i64) -> bool,
    what: &str,
) -> Result<i64> {
    if let (IdPolicy::AcceptCallerIds, Some(hint)) = (policy, hint) {
        if taken(hint) {
            return Err(Error::ConstraintViolation(format!("{what} id {hint} already exists")));
        }
        counter.fetch_max(hint.saturating_add(1), Ordering::Relaxed);
        return Ok(hint);
    }
    loop {
        let id = counter.fetch_add(1, Ordering::Relaxed);
        if !taken(id) {
            return Ok(id);
        }
    }
}

fn node_record(node: &Node) -> Record {
    let collection = Collection::for_node_kind(node.kind());
    let mut record = Record::new(collection);
    record.push(Field::new(schema::ID, "ID", FieldValue::Number(node.id.id)));

    for spec in schema::fields(collection).iter().filter(|f| f.name != schema::ID) {
        if let Some(value) = node.properties.get(spec.name) {
            record.push(Field::new(spec.name, spec.column, value.clone()));
        }
    }
    record
}

/// Only schema fields may be stored; `id` belongs to the store.
fn check_properties(draft: &NodeDraft) -> Result<()> {
    let collection = Collection::for_node_kind(draft.kind);
    match draft
        .properties
        .keys()
        .find(|k| k.as_str() == schema::ID || schema::field(collection, k).is_none())
    {
        Some(key) => Err(Error::ConstraintViolation(format!(
            "{} has no field '{key}'",
            collection.block_tag()
        ))),
        None => Ok(()),
    }
}

fn relation_record(rel: &Relation) -> Record {
    let mut record = Record::new(Collection::Relations);
    record.push(Field::new(schema::ID, "ID", FieldValue::Number(rel.id.0)));
    record.push(Field::new(schema::ITEM1_TYPE, "ITEM1TYPE", FieldValue::Integer(rel.item1.kind.code())));
    record.push(Field::new(schema::ITEM1_ID, "ITEM1ID", FieldValue::Number(rel.item1.id)));
    record.push(Field::new(schema::ITEM2_TYPE, "ITEM2TYPE", FieldValue::Integer(rel.item2.kind.code())));
    record.push(Field::new(schema::ITEM2_ID, "ITEM2ID", FieldValue::Number(rel.item2.id)));
    record
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction. A mode and an id, nothing more.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// Store impl
// ============================================================================

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx { id, mode })
    }

    /// No-op: memory store applies writes immediately, not on commit.
    async fn commit_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    /// WARNING: No-op. Mutations applied during this transaction are NOT reverted.
    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    // ========================================================================
    // Nodes
    // ========================================================================

    async fn insert_node(
        &self,
        tx: &mut MemoryTx,
        draft: NodeDraft,
        id_hint: Option<i64>,
    ) -> Result<i64> {
        tx.require_writable()?;
        check_properties(&draft)?;
        let kind = draft.kind;
        let mut nodes = self.inner.nodes.write();
        let id = assign_id(
            self.inner.config.id_policy,
            id_hint,
            &self.inner.next_node_ids[kind_slot(kind)],
            |id| nodes.contains_key(&UniqueId::new(kind, id)),
            kind.name(),
        )?;
        let node = draft.into_node(id);
        nodes.insert(node.id, node);
        Ok(id)
    }

    async fn get_node(&self, _tx: &MemoryTx, id: UniqueId) -> Result<Option<Node>> {
        Ok(self.inner.nodes.read().get(&id).cloned())
    }

    // ========================================================================
    // Relations
    // ========================================================================

    async fn insert_relation(
        &self,
        tx: &mut MemoryTx,
        id_hint: Option<i64>,
        item1: UniqueId,
        item2: UniqueId,
    ) -> Result<RelationId> {
        tx.require_writable()?;
        let mut rels = self.inner.relations.write();
        let id = RelationId(assign_id(
            self.inner.config.id_policy,
            id_hint,
            &self.inner.next_rel_id,
            |id| rels.contains_key(&RelationId(id)),
            "Relation",
        )?);
        rels.insert(id, Relation::new(id, item1, item2));
        Ok(id)
    }

    async fn get_relation(&self, _tx: &MemoryTx, id: RelationId) -> Result<Option<Relation>> {
        Ok(self.inner.relations.read().get(&id).copied())
    }

    async fn set_relation_endpoints(
        &self,
        tx: &mut MemoryTx,
        id: RelationId,
        item1: UniqueId,
        item2: UniqueId,
    ) -> Result<()> {
        tx.require_writable()?;
        let mut rels = self.inner.relations.write();
        let rel = rels.get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Relation {id}")))?;
        rel.item1 = item1;
        rel.item2 = item2;
        Ok(())
    }

    async fn relations(&self, _tx: &MemoryTx) -> Result<Vec<Relation>> {
        Ok(self.inner.relations.read().values().copied().collect())
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn query(&self, _tx: &MemoryTx, collection: Collection) -> Result<Vec<Record>> {
        match collection.node_kind() {
            Some(kind) => Ok(self.inner.nodes.read()
                .values()
                .filter(|n| n.kind() == kind)
                .map(node_record)
                .collect()),
            None => Ok(self.inner.relations.read().values().map(relation_record).collect()),
        }
    }

    async fn node_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.nodes.read().len() as u64)
    }

    async fn relation_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.relations.read().len() as u64)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            accepts_caller_ids: self.inner.config.id_policy == IdPolicy::AcceptCallerIds,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
