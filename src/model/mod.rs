//! # Knowledge Graph Model
//!
//! Plain DTOs shared by the store, the snapshot writer and the importer.
//!
//! Design rule: NO XML types, NO zip types here.
//! This module is pure data — no I/O, no state, no async.

pub mod node;
pub mod relation;
pub mod value;
pub mod property_map;
pub mod record;

pub use node::{Node, NodeDraft, NodeKind, UniqueId};
pub use relation::{Relation, RelationId};
pub use value::{FieldValue, ValueKind};
pub use property_map::PropertyMap;
pub use record::{Collection, Field, Record};
