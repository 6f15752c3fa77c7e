//! PropertyMap — the attribute set of a node.

use std::collections::HashMap;
use super::FieldValue;

/// A map of logical field names to values. Unset fields are absent, never zero.
pub type PropertyMap = HashMap<String, FieldValue>;
