//! Compressed snapshots — a zip archive holding one deflated document.
//!
//! The entry is named after the archive: `backup.zkx` holds `backup.xml`.
//! Files ending in `.xml` are plain documents and skip the container.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::export::export_snapshot;
use crate::import::{import_snapshot, ImportOptions, ImportOutcome};
use crate::progress::{CancelToken, ProgressSink, RunOutcome};
use crate::storage::Store;
use crate::Result;

/// Extension of a plain snapshot document.
pub const DOCUMENT_EXTENSION: &str = "xml";

/// How a snapshot file is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Plain,
    Compressed,
}

impl SnapshotFormat {
    /// `.xml` is plain; every other extension, or none, is compressed.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION) => SnapshotFormat::Plain,
            _ => SnapshotFormat::Compressed,
        }
    }
}

/// Name of the document entry inside the archive at `path`.
pub fn entry_name_for(path: &Path) -> String {
    path.with_extension(DOCUMENT_EXTENSION)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("snapshot.{DOCUMENT_EXTENSION}"))
}

// ============================================================================
// Streams
// ============================================================================

/// Export into a fresh archive with a single entry named `entry`.
///
/// The container is finalized even when the export is canceled; the document
/// inside is then unterminated and will not import.
pub async fn export_compressed<S: Store, W: Write + Seek>(
    store: &S,
    sink: W,
    entry: &str,
    clock: NaiveDateTime,
    cancel: &CancelToken,
) -> Result<RunOutcome<u64>> {
    let mut zip = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry, options)?;

    let outcome = export_snapshot(store, &mut zip, clock, cancel).await?;
    zip.finish()?.flush()?;
    debug!(entry, "archive finalized");
    Ok(outcome)
}

/// Import the document stored under `entry`.
///
/// An archive with a single entry is read whatever that entry is called.
pub async fn import_compressed<S: Store, R: Read + Seek>(
    store: &S,
    source: R,
    entry: &str,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ImportOutcome> {
    let mut archive = ZipArchive::new(source)?;
    let index = match archive.index_for_name(entry) {
        Some(index) => index,
        None if archive.len() == 1 => 0,
        None => return Err(ZipError::FileNotFound.into()),
    };

    let file = archive.by_index(index)?;
    debug!(entry = file.name(), size = file.size(), "reading archive entry");
    import_snapshot(store, BufReader::new(file), options, progress, cancel).await
}

// ============================================================================
// Paths
// ============================================================================

/// Export to `path`, compressed unless it ends in `.xml`.
pub async fn export_to_path<S: Store>(
    store: &S,
    path: &Path,
    clock: NaiveDateTime,
    cancel: &CancelToken,
) -> Result<RunOutcome<u64>> {
    let file = BufWriter::new(File::create(path)?);
    match SnapshotFormat::from_path(path) {
        SnapshotFormat::Plain => {
            let mut file = file;
            export_snapshot(store, &mut file, clock, cancel).await
        }
        SnapshotFormat::Compressed => {
            export_compressed(store, file, &entry_name_for(path), clock, cancel).await
        }
    }
}

/// Import from `path`, picking the layout the same way `export_to_path` does.
pub async fn import_from_path<S: Store>(
    store: &S,
    path: &Path,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ImportOutcome> {
    let file = File::open(path)?;
    match SnapshotFormat::from_path(path) {
        SnapshotFormat::Plain => {
            import_snapshot(store, BufReader::new(file), options, progress, cancel).await
        }
        SnapshotFormat::Compressed => {
            import_compressed(store, file, &entry_name_for(path), options, progress, cancel).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    use crate::Error;
    use crate::model::{NodeDraft, NodeKind};
    use crate::progress::NoProgress;
    use crate::storage::MemoryStore;
    use crate::tx::TxMode;

    fn clock() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-03-01 12:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut tx = store.begin_tx(TxMode::ReadWrite).await.unwrap();
        let draft = NodeDraft::new(NodeKind::Term).with_property("title", "Zettel");
        store.insert_node(&mut tx, draft, Some(3)).await.unwrap();
        store.commit_tx(tx).await.unwrap();
        store
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a/backup.xml")), SnapshotFormat::Plain);
        assert_eq!(SnapshotFormat::from_path(Path::new("backup.XML")), SnapshotFormat::Plain);
        assert_eq!(SnapshotFormat::from_path(Path::new("backup.zkx")), SnapshotFormat::Compressed);
        assert_eq!(SnapshotFormat::from_path(Path::new("backup")), SnapshotFormat::Compressed);
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name_for(&PathBuf::from("/tmp/backup.zkx")), "backup.xml");
        assert_eq!(entry_name_for(Path::new("backup")), "backup.xml");
    }

    #[tokio::test]
    async fn test_compressed_round_trip_in_memory() {
        let source = seeded().await;
        let mut buf = Cursor::new(Vec::new());
        let written = export_compressed(&source, &mut buf, "snap.xml", clock(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(written, RunOutcome::Completed(1));

        buf.set_position(0);
        let dest = MemoryStore::new();
        let outcome = import_compressed(
            &dest,
            buf,
            "snap.xml",
            &ImportOptions::default(),
            &mut NoProgress,
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.value().records, 1);
    }

    #[tokio::test]
    async fn test_single_entry_fallback() {
        let source = seeded().await;
        let mut buf = Cursor::new(Vec::new());
        export_compressed(&source, &mut buf, "renamed.xml", clock(), &CancelToken::new())
            .await
            .unwrap();

        buf.set_position(0);
        let dest = MemoryStore::new();
        let outcome = import_compressed(
            &dest,
            buf,
            "expected.xml",
            &ImportOptions::default(),
            &mut NoProgress,
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.value().records, 1);
    }

    /// Sink whose flush fails once the archive trailer has been written.
    struct TrailerFlushFails(Cursor<Vec<u8>>);

    impl Write for TrailerFlushFails {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            let end_of_directory = b"PK\x05\x06";
            if self.0.get_ref().windows(4).any(|w| w == end_of_directory) {
                return Err(std::io::Error::other("disk full"));
            }
            Ok(())
        }
    }

    impl Seek for TrailerFlushFails {
        fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
            self.0.seek(pos)
        }
    }

    #[tokio::test]
    async fn test_final_flush_error_surfaces() {
        let source = seeded().await;
        let mut sink = TrailerFlushFails(Cursor::new(Vec::new()));
        let err = export_compressed(&source, &mut sink, "snap.xml", clock(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_not_an_archive() {
        let dest = MemoryStore::new();
        let err = import_compressed(
            &dest,
            Cursor::new(b"<KnowledgeGraph/>".to_vec()),
            "x.xml",
            &ImportOptions::default(),
            &mut NoProgress,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }
}
