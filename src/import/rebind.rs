//! Identifier rebinding — the second import phase.
//!
//! Under the Cautious policy, relations are written in the same streaming pass
//! as nodes, with the endpoint ids recorded in the snapshot. A node whose id
//! changed leaves those endpoints stale. The `IdentifierRebinder` collects the
//! corrections; `rebind_edges` applies them to the relations of this run.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{NodeKind, RelationId, UniqueId};
use crate::storage::Store;
use crate::tx::TxMode;
use crate::{Error, Result};

/// One node whose destination id differs from its recorded id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemapEntry {
    pub kind: NodeKind,
    pub old_id: i64,
    pub new_id: i64,
}

impl RemapEntry {
    pub fn old(&self) -> UniqueId {
        UniqueId::new(self.kind, self.old_id)
    }

    pub fn new_uid(&self) -> UniqueId {
        UniqueId::new(self.kind, self.new_id)
    }
}

/// Remap table of one import run, plus the relations that run created.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRebinder {
    remaps: Vec<RemapEntry>,
    index: HashMap<UniqueId, i64>,
    relations: Vec<RelationId>,
}

impl IdentifierRebinder {
    pub fn record_remap(&mut self, entry: RemapEntry) {
        self.index.insert(entry.old(), entry.new_id);
        self.remaps.push(entry);
    }

    pub fn record_relation(&mut self, id: RelationId) {
        self.relations.push(id);
    }

    /// Corrections accumulated so far, in insertion order.
    pub fn pending_remaps(&self) -> &[RemapEntry] {
        &self.remaps
    }

    /// Relations created by this run; the only ones the rebind pass touches.
    pub fn inserted_relations(&self) -> &[RelationId] {
        &self.relations
    }

    /// Map a recorded id to its destination id. Single step: a new id is
    /// never looked up again.
    pub fn resolve(&self, id: UniqueId) -> UniqueId {
        match self.index.get(&id) {
            Some(&new_id) => UniqueId::new(id.kind, new_id),
            None => id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remaps.is_empty()
    }

    pub fn into_remaps(self) -> Vec<RemapEntry> {
        self.remaps
    }
}

/// Rewrite the endpoints of every relation created in the run.
///
/// Returns how many relations changed. Relations that predate the run are
/// left alone, even when an endpoint happens to equal some old id.
pub async fn rebind_edges<S: Store>(store: &S, rebinder: &IdentifierRebinder) -> Result<usize> {
    if rebinder.is_empty() {
        return Ok(0);
    }

    let mut rewritten = 0;
    for &id in rebinder.inserted_relations() {
        let mut tx = store.begin_tx(TxMode::ReadWrite).await?;
        match rebind_one(store, &mut tx, rebinder, id).await {
            Ok(changed) => {
                store.commit_tx(tx).await?;
                rewritten += usize::from(changed);
            }
            Err(e) => {
                store.rollback_tx(tx).await?;
                return Err(e);
            }
        }
    }

    info!(
        remaps = rebinder.pending_remaps().len(),
        relations = rebinder.inserted_relations().len(),
        rewritten,
        "relation endpoints rebound"
    );
    Ok(rewritten)
}

async fn rebind_one<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    rebinder: &IdentifierRebinder,
    id: RelationId,
) -> Result<bool> {
    let rel = store
        .get_relation(tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Relation {id}")))?;

    let item1 = rebinder.resolve(rel.item1);
    let item2 = rebinder.resolve(rel.item2);
    if (item1, item2) == rel.endpoints() {
        return Ok(false);
    }
    store.set_relation_endpoints(tx, id, item1, item2).await?;
    Ok(true)
}
