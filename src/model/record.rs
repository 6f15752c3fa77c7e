//! Records: the flat, ordered field lists that travel through a snapshot.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{FieldValue, NodeKind};

/// The four homogeneous collections of a snapshot, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Terms,
    Texts,
    Persons,
    Relations,
}

impl Collection {
    /// Document order. Node collections come before relations.
    pub const ALL: [Collection; 4] = [
        Collection::Terms,
        Collection::Texts,
        Collection::Persons,
        Collection::Relations,
    ];

    /// Name of the collection's boundary element.
    pub fn block_tag(self) -> &'static str {
        match self {
            Collection::Terms => "Terms",
            Collection::Texts => "Texts",
            Collection::Persons => "Persons",
            Collection::Relations => "Relations",
        }
    }

    /// Name of each record element inside the block.
    pub fn record_tag(self) -> &'static str {
        match self {
            Collection::Terms => "Term",
            Collection::Texts => "Text",
            Collection::Persons => "Person",
            Collection::Relations => "Relation",
        }
    }

    pub fn from_block_tag(tag: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.block_tag().as_bytes() == tag)
    }

    /// The node kind stored in this collection; `None` for relations.
    pub fn node_kind(self) -> Option<NodeKind> {
        match self {
            Collection::Terms => Some(NodeKind::Term),
            Collection::Texts => Some(NodeKind::Text),
            Collection::Persons => Some(NodeKind::Person),
            Collection::Relations => None,
        }
    }

    pub fn for_node_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Term => Collection::Terms,
            NodeKind::Text => Collection::Texts,
            NodeKind::Person => Collection::Persons,
        }
    }
}

/// One field of a record: logical name, native column name, value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, column: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            value,
        }
    }
}

/// A record of one collection. Field order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub collection: Collection,
    pub fields: SmallVec<[Field; 8]>,
}

impl Record {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            fields: SmallVec::new(),
        }
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// The record's own id field, widened to i64.
    pub fn recorded_id(&self) -> Option<i64> {
        self.get("id").and_then(FieldValue::as_i64)
    }
}
