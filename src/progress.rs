//! Cooperative cancellation and progress reporting.
//!
//! Both are passed explicitly into every export/import call. Nothing here is
//! preemptive: the writer and the parser poll the token at safe points only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Polled cancellation flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Receives one work unit per durable record.
///
/// `records` is the running total for the current run.
pub trait ProgressSink {
    fn work_unit(&mut self, records: u64);
}

impl<F: FnMut(u64)> ProgressSink for F {
    fn work_unit(&mut self, records: u64) {
        self(records)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn work_unit(&mut self, _records: u64) {}
}

/// How a cooperative run ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    Canceled(T),
}

impl<T> RunOutcome<T> {
    pub fn is_canceled(&self) -> bool {
        matches!(self, RunOutcome::Canceled(_))
    }

    pub fn value(&self) -> &T {
        match self {
            RunOutcome::Completed(v) | RunOutcome::Canceled(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            RunOutcome::Completed(v) | RunOutcome::Canceled(v) => v,
        }
    }
}
