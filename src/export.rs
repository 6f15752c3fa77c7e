//! Snapshot export — serialize the whole graph as one XML document.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <KnowledgeGraph exported="2024-03-01 12:30:00">
//!  <Terms>
//!   <Term>
//!    <id column="ID" type="Number">5</id>
//!    <title column="TITLE" type="Text">A</title>
//!   </Term>
//!  </Terms>
//!  <Texts>…</Texts>
//!  <Persons>…</Persons>
//!  <Relations>…</Relations>
//! </KnowledgeGraph>
//! ```
//!
//! A canceled export stops before its closing root tag. Such a file is
//! incomplete and the parser refuses it at end of input.

use std::io::Write;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::codec;
use crate::model::*;
use crate::progress::{CancelToken, RunOutcome};
use crate::schema;
use crate::storage::Store;
use crate::tx::TxMode;
use crate::{Error, Result};

/// Root element name of every snapshot.
pub const ROOT_TAG: &str = "KnowledgeGraph";
/// Root attribute carrying the export clock.
pub const EXPORTED_ATTR: &str = "exported";
pub const COLUMN_ATTR: &str = "column";
pub const TYPE_ATTR: &str = "type";

/// Export every collection of `store` into `writer`.
///
/// Returns the number of records written, wrapped in `Canceled` when `cancel`
/// fired before the end.
pub async fn export_snapshot<S: Store>(
    store: &S,
    writer: &mut dyn Write,
    clock: NaiveDateTime,
    cancel: &CancelToken,
) -> Result<RunOutcome<u64>> {
    let tx = store.begin_tx(TxMode::ReadOnly).await?;
    let outcome = write_collections(store, &tx, writer, clock, cancel).await;
    store.commit_tx(tx).await?;

    let outcome = outcome?;
    writer.flush()?;
    match &outcome {
        RunOutcome::Completed(n) => info!(records = n, "snapshot export finished"),
        RunOutcome::Canceled(n) => warn!(records = n, "snapshot export canceled; output is incomplete"),
    }
    Ok(outcome)
}

async fn write_collections<S: Store>(
    store: &S,
    tx: &S::Tx,
    writer: &mut dyn Write,
    clock: NaiveDateTime,
    cancel: &CancelToken,
) -> Result<RunOutcome<u64>> {
    let mut written = 0u64;

    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(writer, r#"<{ROOT_TAG} {EXPORTED_ATTR}="{clock}">"#)?;

    for collection in Collection::ALL {
        if cancel.is_canceled() {
            return Ok(RunOutcome::Canceled(written));
        }

        let records = store.query(tx, collection).await?;
        debug!(collection = collection.block_tag(), records = records.len(), "exporting collection");

        writeln!(writer, " <{}>", collection.block_tag())?;
        for record in &records {
            if cancel.is_canceled() {
                return Ok(RunOutcome::Canceled(written));
            }
            if collection == Collection::Relations {
                check_endpoints(store, tx, record).await?;
            }
            write_record(writer, record)?;
            written += 1;
        }
        writeln!(writer, " </{}>", collection.block_tag())?;
    }

    writeln!(writer, "</{ROOT_TAG}>")?;
    Ok(RunOutcome::Completed(written))
}

/// Write one record element with one child element per field.
pub fn write_record(writer: &mut dyn Write, record: &Record) -> Result<()> {
    let tag = record.collection.record_tag();
    writeln!(writer, "  <{tag}>")?;
    for field in &record.fields {
        let pattern = schema::field(record.collection, &field.name).and_then(|f| f.pattern);
        let Some(text) = codec::encode(&field.value, pattern) else {
            continue;
        };
        writeln!(
            writer,
            r#"   <{name} {COLUMN_ATTR}="{column}" {TYPE_ATTR}="{kind}">{text}</{name}>"#,
            name = field.name,
            column = field.column,
            kind = field.value.kind(),
        )?;
    }
    writeln!(writer, "  </{tag}>")?;
    Ok(())
}

/// Both endpoints of a relation must resolve in the source store.
async fn check_endpoints<S: Store>(store: &S, tx: &S::Tx, record: &Record) -> Result<()> {
    for (kind_field, id_field) in [
        (schema::ITEM1_TYPE, schema::ITEM1_ID),
        (schema::ITEM2_TYPE, schema::ITEM2_ID),
    ] {
        let endpoint = record
            .get(kind_field)
            .and_then(FieldValue::as_i32)
            .and_then(NodeKind::from_code)
            .zip(record.get(id_field).and_then(FieldValue::as_i64))
            .map(|(kind, id)| UniqueId::new(kind, id));

        let resolved = match endpoint {
            Some(id) => store.node_exists(tx, id).await?,
            None => false,
        };
        if !resolved {
            return Err(Error::ConstraintViolation(format!(
                "relation {} has a dangling {} endpoint",
                record.recorded_id().unwrap_or_default(),
                kind_field,
            )));
        }
    }
    Ok(())
}
