//! Store transactions.
//!
//! Export reads the whole graph inside one read-only transaction. Import opens
//! one read-write transaction per record, so a record is durable exactly when
//! its transaction commits. There is no transaction spanning a whole import.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// Transaction handle every store hands out.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;

    fn is_writable(&self) -> bool {
        self.mode() == TxMode::ReadWrite
    }

    /// Guard for every write a store performs under this transaction.
    fn require_writable(&self) -> Result<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(Error::StorageError(format!("{} is read-only", self.id())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Handle(TxMode);

    impl Transaction for Handle {
        fn mode(&self) -> TxMode {
            self.0
        }
        fn id(&self) -> TxId {
            TxId(7)
        }
    }

    #[test]
    fn test_write_guard_follows_mode() {
        assert!(Handle(TxMode::ReadWrite).require_writable().is_ok());

        let err = Handle(TxMode::ReadOnly).require_writable().unwrap_err();
        assert!(matches!(err, Error::StorageError(ref msg) if msg == "tx#7 is read-only"));
    }
}
