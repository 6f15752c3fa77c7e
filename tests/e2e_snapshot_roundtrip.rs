//! Snapshot round trip: graph A → export → document → import → graph B.
//!
//! With a destination that accepts caller ids (Direct policy), graph B must be
//! indistinguishable from graph A, so exporting B with the same clock must
//! reproduce the first document byte for byte.

use chrono::NaiveDateTime;
use pretty_assertions::assert_eq;

use knowledge_vault::storage::Store;
use knowledge_vault::{
    export_snapshot, import_snapshot, CancelToken, FieldValue, ImportOptions, InsertPolicy,
    MemoryStore, NoProgress, NodeDraft, NodeKind, TxMode, UniqueId,
};

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
}

/// Helper: a small graph with every collection and every value kind.
async fn seed_graph(store: &MemoryStore) {
    let mut tx = store.begin_tx(TxMode::ReadWrite).await.unwrap();

    let term = NodeDraft::new(NodeKind::Term)
        .with_property("title", "Salt & Pepper")
        .with_property("text", "Seasoning, see <b>Kitchen</b> & <i>Table</i>")
        .with_property("created", ts("2024-03-01 12:30:00.250"))
        .with_property("modified", ts("2024-03-02 08:00:00"));
    store.insert_node(&mut tx, term, Some(5)).await.unwrap();

    let other = NodeDraft::new(NodeKind::Term).with_property("title", "Kitchen");
    store.insert_node(&mut tx, other, Some(6)).await.unwrap();

    let text = NodeDraft::new(NodeKind::Text)
        .with_property("title", "Kommunikation mit Zettelkästen")
        .with_property("author", "Luhmann")
        .with_property("year", 1981)
        .with_property("volume", 0);
    store.insert_node(&mut tx, text, Some(12)).await.unwrap();

    let person = NodeDraft::new(NodeKind::Person)
        .with_property("firstname", "Niklas")
        .with_property("lastname", "Luhmann")
        .with_property("born", 1927)
        .with_property("died", 1998);
    store.insert_node(&mut tx, person, Some(3)).await.unwrap();

    let term5 = UniqueId::new(NodeKind::Term, 5);
    store.insert_relation(&mut tx, Some(1), term5, UniqueId::new(NodeKind::Term, 6)).await.unwrap();
    store.insert_relation(&mut tx, Some(2), UniqueId::new(NodeKind::Person, 3), UniqueId::new(NodeKind::Text, 12)).await.unwrap();

    store.commit_tx(tx).await.unwrap();
}

async fn export_to_string(store: &MemoryStore) -> String {
    let mut out = Vec::new();
    let outcome = export_snapshot(store, &mut out, ts("2024-05-01 09:15:00"), &CancelToken::new())
        .await
        .unwrap();
    assert!(!outcome.is_canceled());
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_export_document_shape() {
    let store = MemoryStore::new();
    seed_graph(&store).await;
    let doc = export_to_string(&store).await;

    assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(doc.contains(r#"<KnowledgeGraph exported="2024-05-01 09:15:00">"#));
    let order: Vec<usize> = ["<Terms>", "<Texts>", "<Persons>", "<Relations>"]
        .iter()
        .map(|tag| doc.find(tag).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    assert!(doc.trim_end().ends_with("</KnowledgeGraph>"));

    assert!(doc.contains(r#"<created column="CREATED" type="Timestamp">2024-03-01 12:30:00.250</created>"#));
    assert!(doc.contains(r#"<item1type column="ITEM1TYPE" type="Integer">3</item1type>"#));
}

#[tokio::test]
async fn test_export_escapes_ampersand_keeps_markup() {
    let store = MemoryStore::new();
    seed_graph(&store).await;
    let doc = export_to_string(&store).await;

    assert!(doc.contains(r#"<title column="TITLE" type="Text">Salt &amp; Pepper</title>"#));
    assert!(doc.contains("Seasoning, see <b>Kitchen</b> &amp; <i>Table</i>"));
}

#[tokio::test]
async fn test_export_suppresses_zero_volume() {
    let store = MemoryStore::new();
    seed_graph(&store).await;
    let doc = export_to_string(&store).await;

    assert!(doc.contains(r#"<year column="PUBYEAR" type="Integer">1981</year>"#));
    assert!(!doc.contains("<volume"));
}

#[tokio::test]
async fn test_direct_round_trip() {
    let source = MemoryStore::new();
    seed_graph(&source).await;
    let first = export_to_string(&source).await;

    let dest = MemoryStore::new();
    let outcome = import_snapshot(
        &dest,
        first.as_bytes(),
        &ImportOptions::default(),
        &mut NoProgress,
        &CancelToken::new(),
    )
    .await
    .unwrap();

    let report = outcome.into_value();
    assert_eq!(report.policy, InsertPolicy::Direct);
    assert_eq!(report.records, 6);
    assert!(report.pending_remaps().is_empty());

    let second = export_to_string(&dest).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_round_trip_preserves_values() {
    let source = MemoryStore::new();
    seed_graph(&source).await;
    let doc = export_to_string(&source).await;

    let dest = MemoryStore::new();
    import_snapshot(&dest, doc.as_bytes(), &ImportOptions::default(), &mut NoProgress, &CancelToken::new())
        .await
        .unwrap();

    let tx = dest.begin_tx(TxMode::ReadOnly).await.unwrap();
    let term = dest.get_node(&tx, UniqueId::new(NodeKind::Term, 5)).await.unwrap().unwrap();
    assert_eq!(term.title(), Some("Salt & Pepper"));
    assert_eq!(
        term.get("text"),
        Some(&FieldValue::Text("Seasoning, see <b>Kitchen</b> & <i>Table</i>".into()))
    );
    assert_eq!(term.get("created"), Some(&FieldValue::Timestamp(ts("2024-03-01 12:30:00.250"))));

    // zero was suppressed on export and so never comes back
    let text = dest.get_node(&tx, UniqueId::new(NodeKind::Text, 12)).await.unwrap().unwrap();
    assert_eq!(text.get("year"), Some(&FieldValue::Integer(1981)));
    assert_eq!(text.get("volume"), None);

    let rels = dest.relations(&tx).await.unwrap();
    assert_eq!(rels.len(), 2);
    assert_eq!(rels[1].item1, UniqueId::new(NodeKind::Person, 3));
    assert_eq!(rels[1].item2, UniqueId::new(NodeKind::Text, 12));
}

#[tokio::test]
async fn test_control_characters_become_backslash() {
    let source = MemoryStore::new();
    let mut tx = source.begin_tx(TxMode::ReadWrite).await.unwrap();
    let draft = NodeDraft::new(NodeKind::Term).with_property("title", "page\u{0C}break\u{0B}tab");
    source.insert_node(&mut tx, draft, Some(1)).await.unwrap();
    source.commit_tx(tx).await.unwrap();

    let doc = export_to_string(&source).await;
    assert!(doc.contains(r"page\break\tab"));

    let dest = MemoryStore::new();
    import_snapshot(&dest, doc.as_bytes(), &ImportOptions::default(), &mut NoProgress, &CancelToken::new())
        .await
        .unwrap();
    let tx = dest.begin_tx(TxMode::ReadOnly).await.unwrap();
    let node = dest.get_node(&tx, UniqueId::new(NodeKind::Term, 1)).await.unwrap().unwrap();
    assert_eq!(node.title(), Some(r"page\break\tab"));
}

#[tokio::test]
async fn test_legacy_number_kind_tag_decodes_as_integer() {
    let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<KnowledgeGraph exported="2019-11-30 17:00:00">
 <Terms>
  <Term><id column="ID" type="Number">1</id></Term>
  <Term><id column="ID" type="Number">2</id></Term>
 </Terms>
 <Texts></Texts>
 <Persons></Persons>
 <Relations>
  <Relation>
   <id column="ID" type="Number">4</id>
   <item1type column="ITEM1TYPE" type="Number">1</item1type>
   <item1id column="ITEM1ID" type="Number">1</item1id>
   <item2type column="ITEM2TYPE" type="Number">1</item2type>
   <item2id column="ITEM2ID" type="Number">2</item2id>
  </Relation>
 </Relations>
</KnowledgeGraph>
"#;

    let dest = MemoryStore::new();
    let outcome = import_snapshot(&dest, doc.as_bytes(), &ImportOptions::default(), &mut NoProgress, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.value().records, 3);

    let tx = dest.begin_tx(TxMode::ReadOnly).await.unwrap();
    let rels = dest.relations(&tx).await.unwrap();
    assert_eq!(rels[0].endpoints(), (UniqueId::new(NodeKind::Term, 1), UniqueId::new(NodeKind::Term, 2)));

    // re-exported with the current tag
    let again = export_to_string(&dest).await;
    assert!(again.contains(r#"<item1type column="ITEM1TYPE" type="Integer">1</item1type>"#));
}

#[tokio::test]
async fn test_dangling_relation_fails_export() {
    let store = MemoryStore::new();
    let mut tx = store.begin_tx(TxMode::ReadWrite).await.unwrap();
    store.insert_node(&mut tx, NodeDraft::new(NodeKind::Term), Some(1)).await.unwrap();
    store
        .insert_relation(&mut tx, Some(1), UniqueId::new(NodeKind::Term, 1), UniqueId::new(NodeKind::Text, 99))
        .await
        .unwrap();
    store.commit_tx(tx).await.unwrap();

    let mut out = Vec::new();
    let err = export_snapshot(&store, &mut out, ts("2024-05-01 09:15:00"), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, knowledge_vault::Error::ConstraintViolation(_)));
}
