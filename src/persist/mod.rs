//! Durable journal seam for committed store writes.

/// SQLite-backed journal.
pub mod sqlite;

use thiserror::Error;

use crate::{core::store::StoreSnapshotV1, op::StoredOp, types::OpSeq};

/// Journal failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite rejected a statement.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A payload could not be encoded or decoded.
    #[error("payload codec error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else, such as an unsupported format version.
    #[error("{0}")]
    Message(String),
}

/// Result alias for journal operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Receives committed ops in commit order.
pub trait OpSink: Send {
    /// Appends ops; returns the highest sequence now stored.
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq>;
    /// Makes appended ops durable.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
    /// Stores a full image covering everything up to `last_seq`.
    fn write_snapshot(&mut self, _snapshot: &StoreSnapshotV1, _last_seq: OpSeq) -> PersistResult<()> {
        Ok(())
    }
    /// Drops ops covered by a snapshot; returns how many were removed.
    fn compact_through(&mut self, _seq: OpSeq) -> PersistResult<usize> {
        Ok(0)
    }
}
