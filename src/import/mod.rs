//! Snapshot import.
//!
//! ```text
//! reader → SnapshotParser → RecordBuilder → ImportReport { rebinder }
//!                                                 │
//!                                  rebind_edges ←─┘
//! ```
//!
//! `import_snapshot` is the streaming phase. It leaves relation endpoints as
//! recorded. `rebind_edges` is the correction phase. `restore_snapshot` runs
//! both.

pub mod builder;
pub mod parser;
pub mod rebind;

pub use builder::{InsertPolicy, Inserted, RecordBuilder};
pub use parser::{ParseStep, SnapshotParser};
pub use rebind::{rebind_edges, IdentifierRebinder, RemapEntry};

use std::io::BufRead;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::progress::{CancelToken, ProgressSink, RunOutcome};
use crate::storage::Store;
use crate::{Error, Result};

// ============================================================================
// Options & report
// ============================================================================

/// Knobs for one import run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Overrides the policy derived from the store's capabilities.
    pub policy: Option<InsertPolicy>,
}

impl ImportOptions {
    pub fn with_policy(mut self, policy: InsertPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// What an import run stored.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Records committed to the store.
    pub records: u64,
    pub policy: InsertPolicy,
    /// Export clock read from the document root.
    pub exported_at: Option<NaiveDateTime>,
    pub rebinder: IdentifierRebinder,
}

impl ImportReport {
    pub fn pending_remaps(&self) -> &[RemapEntry] {
        self.rebinder.pending_remaps()
    }
}

pub type ImportOutcome = RunOutcome<ImportReport>;

// ============================================================================
// Entry points
// ============================================================================

/// Stream every record of `reader` into `store`.
///
/// Each record is committed on its own; `progress` hears about it right after
/// the commit. A canceled run returns `Canceled` with the records stored so
/// far. An error stops the run and leaves earlier records in place; it comes
/// back as `Error::Interrupted` carrying the partial report, whose rebinder
/// still knows every remap and relation of the run.
pub async fn import_snapshot<S: Store, R: BufRead>(
    store: &S,
    reader: R,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ImportOutcome> {
    let caps = store.capabilities();
    let policy = options
        .policy
        .unwrap_or_else(|| InsertPolicy::for_capabilities(&caps));
    if policy == InsertPolicy::Direct && !caps.accepts_caller_ids {
        return Err(Error::ConstraintViolation(
            "direct import needs a store that accepts caller ids".into(),
        ));
    }
    info!(?policy, "snapshot import started");

    let mut parser = SnapshotParser::new(reader);
    let mut builder = RecordBuilder::new(store, policy);
    let mut records = 0u64;
    let run = stream_records(&mut parser, &mut builder, &mut records, progress, cancel).await;

    let report = ImportReport {
        records,
        policy,
        exported_at: parser.exported_at(),
        rebinder: builder.into_rebinder(),
    };
    match run {
        Ok(false) => {
            info!(
                records,
                remaps = report.pending_remaps().len(),
                "snapshot import finished"
            );
            Ok(RunOutcome::Completed(report))
        }
        Ok(true) => {
            warn!(records, "snapshot import canceled");
            Ok(RunOutcome::Canceled(report))
        }
        Err(source) => {
            warn!(records, error = %source, "snapshot import stopped");
            Err(Error::Interrupted {
                source: Box::new(source),
                report: Box::new(report),
            })
        }
    }
}

/// Parse and insert until the document ends (`false`) or cancel is seen (`true`).
async fn stream_records<S: Store, R: BufRead>(
    parser: &mut SnapshotParser<R>,
    builder: &mut RecordBuilder<'_, S>,
    records: &mut u64,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<bool> {
    loop {
        match parser.next_record(cancel)? {
            ParseStep::Record(record) => {
                builder.insert(record).await?;
                *records += 1;
                progress.work_unit(*records);
            }
            ParseStep::Canceled => return Ok(true),
            ParseStep::Finished => return Ok(false),
        }
    }
}

/// Import, then rebind the endpoints of the relations this run created.
///
/// Rebinding runs on cancellation and on an interrupted run too, so no stored
/// relation is left on a recorded id.
pub async fn restore_snapshot<S: Store, R: BufRead>(
    store: &S,
    reader: R,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ImportOutcome> {
    match import_snapshot(store, reader, options, progress, cancel).await {
        Ok(outcome) => {
            rebind_edges(store, &outcome.value().rebinder).await?;
            Ok(outcome)
        }
        Err(Error::Interrupted { source, report }) => {
            if let Err(e) = rebind_edges(store, &report.rebinder).await {
                warn!(error = %e, "rebind after interrupted import failed; remaps stay in the report");
            }
            Err(Error::Interrupted { source, report })
        }
        Err(e) => Err(e),
    }
}
