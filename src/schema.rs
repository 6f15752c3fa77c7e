//! Fixed field layout of the four collections.
//!
//! Every field has a logical name (the field element's tag), the native column
//! it came from, its value kind, and an optional display pattern.
//!
//! | Collection | Fields |
//! |------------|--------|
//! | Terms      | id, title, text, created, modified |
//! | Texts      | id, title, text, author, coauthor, year, publisher, place, journal, volume, pages, isbn, created, modified |
//! | Persons    | id, title, text, firstname, lastname, born, died, created, modified |
//! | Relations  | id, item1type, item1id, item2type, item2id |

use crate::model::{Collection, ValueKind};

/// Pattern that suppresses a numeric field whose value is zero.
pub const SUPPRESS_ZERO: &str = " ";

pub const ID: &str = "id";
pub const ITEM1_TYPE: &str = "item1type";
pub const ITEM1_ID: &str = "item1id";
pub const ITEM2_TYPE: &str = "item2type";
pub const ITEM2_ID: &str = "item2id";

/// Relation endpoint-kind fields. Older snapshots tagged them `Number`;
/// they always decode as `Integer`.
pub const ENDPOINT_KIND_FIELDS: [&str; 2] = [ITEM1_TYPE, ITEM2_TYPE];

/// Static description of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: ValueKind,
    pub pattern: Option<&'static str>,
}

const fn spec(name: &'static str, column: &'static str, kind: ValueKind) -> FieldSpec {
    FieldSpec { name, column, kind, pattern: None }
}

const fn optional(name: &'static str, column: &'static str, kind: ValueKind) -> FieldSpec {
    FieldSpec { name, column, kind, pattern: Some(SUPPRESS_ZERO) }
}

const TERM_FIELDS: &[FieldSpec] = &[
    spec(ID, "ID", ValueKind::Number),
    spec("title", "TITLE", ValueKind::Text),
    spec("text", "TEXT", ValueKind::Text),
    spec("created", "CREATED", ValueKind::Timestamp),
    spec("modified", "MODIFIED", ValueKind::Timestamp),
];

const TEXT_FIELDS: &[FieldSpec] = &[
    spec(ID, "ID", ValueKind::Number),
    spec("title", "TITLE", ValueKind::Text),
    spec("text", "TEXT", ValueKind::Text),
    spec("author", "AUTHOR", ValueKind::Text),
    spec("coauthor", "COAUTHOR", ValueKind::Text),
    optional("year", "PUBYEAR", ValueKind::Integer),
    spec("publisher", "PUBLISHER", ValueKind::Text),
    spec("place", "PUBPLACE", ValueKind::Text),
    spec("journal", "JOURNAL", ValueKind::Text),
    optional("volume", "VOLUME", ValueKind::Integer),
    spec("pages", "PAGES", ValueKind::Text),
    spec("isbn", "ISBN", ValueKind::Text),
    spec("created", "CREATED", ValueKind::Timestamp),
    spec("modified", "MODIFIED", ValueKind::Timestamp),
];

const PERSON_FIELDS: &[FieldSpec] = &[
    spec(ID, "ID", ValueKind::Number),
    spec("title", "TITLE", ValueKind::Text),
    spec("text", "TEXT", ValueKind::Text),
    spec("firstname", "FIRSTNAME", ValueKind::Text),
    spec("lastname", "LASTNAME", ValueKind::Text),
    optional("born", "BORN", ValueKind::Integer),
    optional("died", "DIED", ValueKind::Integer),
    spec("created", "CREATED", ValueKind::Timestamp),
    spec("modified", "MODIFIED", ValueKind::Timestamp),
];

const RELATION_FIELDS: &[FieldSpec] = &[
    spec(ID, "ID", ValueKind::Number),
    spec(ITEM1_TYPE, "ITEM1TYPE", ValueKind::Integer),
    spec(ITEM1_ID, "ITEM1ID", ValueKind::Number),
    spec(ITEM2_TYPE, "ITEM2TYPE", ValueKind::Integer),
    spec(ITEM2_ID, "ITEM2ID", ValueKind::Number),
];

/// All fields of a collection, in document order.
pub fn fields(collection: Collection) -> &'static [FieldSpec] {
    match collection {
        Collection::Terms => TERM_FIELDS,
        Collection::Texts => TEXT_FIELDS,
        Collection::Persons => PERSON_FIELDS,
        Collection::Relations => RELATION_FIELDS,
    }
}

pub fn field(collection: Collection, name: &str) -> Option<&'static FieldSpec> {
    fields(collection).iter().find(|f| f.name == name)
}

pub fn is_endpoint_kind_field(name: &str) -> bool {
    ENDPOINT_KIND_FIELDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_collection_starts_with_id() {
        for c in Collection::ALL {
            assert_eq!(fields(c)[0].name, ID);
        }
    }

    #[test]
    fn test_only_endpoint_kinds_are_reserved() {
        assert!(is_endpoint_kind_field("item1type"));
        assert!(is_endpoint_kind_field("item2type"));
        assert!(!is_endpoint_kind_field("item1id"));
        assert!(!is_endpoint_kind_field("type"));
    }

    #[test]
    fn test_lookup_pattern() {
        assert_eq!(field(Collection::Persons, "born").and_then(|f| f.pattern), Some(SUPPRESS_ZERO));
        assert_eq!(field(Collection::Terms, "title").and_then(|f| f.pattern), None);
        assert!(field(Collection::Terms, "born").is_none());
    }
}
