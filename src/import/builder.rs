//! Record builder — turns parsed records into store mutations.
//!
//! Two insert policies, fixed for a whole run:
//!
//! | Policy | Node insert | Relation insert | Remaps |
//! |--------|-------------|-----------------|--------|
//! | `Direct` | recorded id as hint, must be honored | recorded id | never |
//! | `Cautious` | store mints the id | store mints the id, endpoints as recorded | when a node's id changed |
//!
//! Every record runs in its own read-write transaction; a record is durable
//! once that transaction commits. Nothing earlier in the run is undone when a
//! later record fails.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::*;
use crate::schema;
use crate::storage::{Store, StoreCapabilities};
use crate::tx::TxMode;
use crate::{Error, Result};
use super::rebind::{IdentifierRebinder, RemapEntry};

/// How recorded ids are carried into the destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPolicy {
    /// The destination accepts caller-supplied primary keys.
    Direct,
    /// The destination mints its own keys; changed node ids are remapped.
    Cautious,
}

impl InsertPolicy {
    pub fn for_capabilities(caps: &StoreCapabilities) -> Self {
        if caps.accepts_caller_ids {
            InsertPolicy::Direct
        } else {
            InsertPolicy::Cautious
        }
    }
}

/// Result of inserting one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Node {
        recorded: Option<i64>,
        assigned: UniqueId,
    },
    Relation(RelationId),
}

pub struct RecordBuilder<'s, S: Store> {
    store: &'s S,
    policy: InsertPolicy,
    rebinder: IdentifierRebinder,
}

impl<'s, S: Store> RecordBuilder<'s, S> {
    pub fn new(store: &'s S, policy: InsertPolicy) -> Self {
        Self {
            store,
            policy,
            rebinder: IdentifierRebinder::default(),
        }
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    pub fn rebinder(&self) -> &IdentifierRebinder {
        &self.rebinder
    }

    pub fn into_rebinder(self) -> IdentifierRebinder {
        self.rebinder
    }

    /// Insert one record in its own transaction.
    pub async fn insert(&mut self, record: Record) -> Result<Inserted> {
        let collection = record.collection;
        let recorded = record.recorded_id();
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;

        let inserted = match self.apply(&mut tx, record).await {
            Ok(inserted) => inserted,
            Err(e) => {
                warn!(collection = collection.block_tag(), ?recorded, error = %e, "record insert failed");
                self.store.rollback_tx(tx).await?;
                return Err(e);
            }
        };
        self.store.commit_tx(tx).await?;
        self.note(inserted);
        Ok(inserted)
    }

    async fn apply(&self, tx: &mut S::Tx, record: Record) -> Result<Inserted> {
        match record.collection.node_kind() {
            Some(kind) => self.insert_node(tx, kind, record).await,
            None => self.insert_relation(tx, record).await,
        }
    }

    async fn insert_node(&self, tx: &mut S::Tx, kind: NodeKind, record: Record) -> Result<Inserted> {
        let recorded = record.recorded_id();
        let hint = self.hint(recorded)?;

        let mut draft = self.store.create_node(kind);
        for field in record.fields {
            if field.name != schema::ID {
                draft.set(field.name, field.value);
            }
        }

        let assigned = self.store.insert_node(tx, draft, hint).await?;
        if hint.is_some_and(|h| h != assigned) {
            return Err(Error::ConstraintViolation(format!(
                "{kind} {} was stored as {assigned}; the store does not honor caller ids",
                hint.unwrap_or_default(),
            )));
        }
        Ok(Inserted::Node {
            recorded,
            assigned: UniqueId::new(kind, assigned),
        })
    }

    async fn insert_relation(&self, tx: &mut S::Tx, record: Record) -> Result<Inserted> {
        let hint = self.hint(record.recorded_id())?;
        let item1 = endpoint(&record, schema::ITEM1_TYPE, schema::ITEM1_ID)?;
        let item2 = endpoint(&record, schema::ITEM2_TYPE, schema::ITEM2_ID)?;

        let id = self.store.insert_relation(tx, hint, item1, item2).await?;
        if hint.is_some_and(|h| h != id.0) {
            return Err(Error::ConstraintViolation(format!(
                "relation {} was stored as {id}; the store does not honor caller ids",
                hint.unwrap_or_default(),
            )));
        }
        Ok(Inserted::Relation(id))
    }

    /// The id hint passed to the store: the recorded id under Direct, none under Cautious.
    fn hint(&self, recorded: Option<i64>) -> Result<Option<i64>> {
        match self.policy {
            InsertPolicy::Direct => recorded.map(Some).ok_or_else(|| Error::Decode {
                field: schema::ID.into(),
                message: "record has no id; a direct insert needs one".into(),
            }),
            InsertPolicy::Cautious => Ok(None),
        }
    }

    fn note(&mut self, inserted: Inserted) {
        match inserted {
            Inserted::Node { recorded: Some(old_id), assigned } if old_id != assigned.id => {
                let entry = RemapEntry {
                    kind: assigned.kind,
                    old_id,
                    new_id: assigned.id,
                };
                debug!(kind = %entry.kind, old = entry.old_id, new = entry.new_id, "node id remapped");
                self.rebinder.record_remap(entry);
            }
            Inserted::Node { .. } => {}
            Inserted::Relation(id) => self.rebinder.record_relation(id),
        }
    }
}

/// Read one relation endpoint from its kind-code and id fields.
fn endpoint(record: &Record, kind_field: &str, id_field: &str) -> Result<UniqueId> {
    let code = record
        .get(kind_field)
        .and_then(FieldValue::as_i32)
        .ok_or_else(|| missing(kind_field))?;
    let kind = NodeKind::from_code(code).ok_or_else(|| Error::Decode {
        field: kind_field.into(),
        message: format!("unknown node kind code {code}"),
    })?;
    let id = record
        .get(id_field)
        .and_then(FieldValue::as_i64)
        .ok_or_else(|| missing(id_field))?;
    Ok(UniqueId::new(kind, id))
}

fn missing(field: &str) -> Error {
    Error::Decode {
        field: field.into(),
        message: "relation record lacks this field".into(),
    }
}
