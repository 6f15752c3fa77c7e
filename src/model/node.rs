//! Node in the knowledge graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use super::{FieldValue, PropertyMap};

/// The three node kinds of the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Term,
    Text,
    Person,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [NodeKind::Term, NodeKind::Text, NodeKind::Person];

    /// Integer code used by relation records to name an endpoint's kind.
    ///
    /// Code 0 is the reserved "none" kind and never maps to a node.
    pub fn code(self) -> i32 {
        match self {
            NodeKind::Term => 1,
            NodeKind::Text => 2,
            NodeKind::Person => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(NodeKind::Term),
            2 => Some(NodeKind::Text),
            3 => Some(NodeKind::Person),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Term => "Term",
            NodeKind::Text => "Text",
            NodeKind::Person => "Person",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composite node identifier: ids are only unique within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueId {
    pub kind: NodeKind,
    pub id: i64,
}

impl UniqueId {
    pub fn new(kind: NodeKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.id)
    }
}

/// A node as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: UniqueId,
    pub properties: PropertyMap,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.id.kind
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.properties.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(FieldValue::as_str)
    }
}

/// Unsaved node handed out by `Store::create_node` and consumed by `Store::insert_node`.
///
/// The id is not known until the store assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub kind: NodeKind,
    pub properties: PropertyMap,
}

impl NodeDraft {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            properties: PropertyMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attach the id the store assigned.
    pub fn into_node(self, id: i64) -> Node {
        Node {
            id: UniqueId::new(self.kind, id),
            properties: self.properties,
        }
    }
}
