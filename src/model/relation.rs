//! Relation (edge) between two nodes.

use serde::{Deserialize, Serialize};
use super::UniqueId;

/// Store-local relation identifier. Never referenced by other relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub i64);

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed pair of node identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub item1: UniqueId,
    pub item2: UniqueId,
}

impl Relation {
    pub fn new(id: RelationId, item1: UniqueId, item2: UniqueId) -> Self {
        Self { id, item1, item2 }
    }

    /// Endpoint pair, ignoring the store-local relation id.
    pub fn endpoints(&self) -> (UniqueId, UniqueId) {
        (self.item1, self.item2)
    }
}
