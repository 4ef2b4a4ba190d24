use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::StoreConfig,
    model::{Conference, Entity},
    op::StoredOp,
    persist::{sqlite::SqliteOpSink, OpSink, PersistError},
    query::plan::QueryPlan,
    types::{ConferenceId, ConferenceKey, SessionId},
};

use super::{store::EntityStore, transaction::Transaction};

/// Failures surfaced by the datastore itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Every attempt of a transaction lost to a concurrent commit.
    #[error("transaction failed after {attempts} attempts due to contention")]
    TransactionFailed {
        /// Attempts made.
        attempts: u32,
    },
    /// The journal rejected the write; nothing was applied.
    #[error("journal write failed: {0}")]
    Journal(#[from] PersistError),
}

/// Shared, cloneable handle to the entity store.
///
/// Reads take a shared lock. Transactions run optimistically, validate at
/// commit and re-run the closure on a lost race, up to
/// [`StoreConfig::max_transaction_attempts`] times. A journaled write is
/// applied to memory only after the journal accepts it.
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<RwLock<EntityStore>>,
    journal: Option<Arc<Mutex<Box<dyn OpSink>>>>,
    config: StoreConfig,
}

impl Datastore {
    /// Empty, unjournaled store.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_store(EntityStore::new(), config)
    }

    /// Wraps an existing store.
    pub fn with_store(store: EntityStore, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
            journal: None,
            config,
        }
    }

    /// Wraps an existing store and journals every later write to `sink`.
    pub fn with_journal(store: EntityStore, sink: Box<dyn OpSink>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
            journal: Some(Arc::new(Mutex::new(sink))),
            config,
        }
    }

    /// Restores state from a SQLite journal and keeps journaling to it.
    pub fn open_journaled(sink: SqliteOpSink, config: StoreConfig) -> Result<Self, StoreError> {
        let store = sink.load_store()?;
        debug!(latest_seq = store.latest_op_seq(), "restored store from journal");
        Ok(Self::with_journal(store, Box::new(sink), config))
    }

    /// Runs `f` under the shared read lock.
    pub fn read<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Executes a conference query.
    pub fn query(&self, plan: &QueryPlan) -> Vec<Conference> {
        self.read(|store| store.query(plan))
    }

    /// Reserves a conference id under `organizer`.
    pub fn allocate_conference_id(&self, organizer: &str) -> ConferenceId {
        self.inner.write().allocate_conference_id(organizer)
    }

    /// Reserves a session id under `conference`.
    pub fn allocate_session_id(&self, conference: &ConferenceKey) -> SessionId {
        self.inner.write().allocate_session_id(conference)
    }

    /// Blind write of a single entity outside any transaction.
    pub fn put(&self, entity: impl Into<Entity>) -> Result<(), StoreError> {
        let mut store = self.inner.write();
        let stored = store.prepare_put(entity.into());
        self.append_journal(std::slice::from_ref(&stored))?;
        store.apply_ops(vec![stored]);
        Ok(())
    }

    /// Runs `f` as one atomic transaction.
    ///
    /// An `Err` from `f` aborts without writing and is returned as is. A
    /// commit that loses a race re-runs `f` from scratch, so `f` must not have
    /// side effects outside the [`Transaction`]. A journal failure applies
    /// nothing and is not retried.
    pub fn run_in_transaction<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let attempts = self.config.max_transaction_attempts.max(1);
        for attempt in 1..=attempts {
            let mut txn = Transaction::new(&self.inner);
            let out = f(&mut txn)?;
            let write_set = txn.into_write_set();

            let checked = if write_set.writes.is_empty() {
                // Read-only: the reads only need to be mutually consistent.
                self.inner.read().check_reads(&write_set.reads)
            } else {
                let mut store = self.inner.write();
                match store.prepare_commit(write_set) {
                    Ok(ops) => {
                        self.append_journal(&ops)?;
                        store.apply_ops(ops);
                        Ok(())
                    }
                    Err(conflict) => Err(conflict),
                }
            };

            match checked {
                Ok(()) => return Ok(out),
                Err(conflict) => {
                    debug!(
                        attempt,
                        key = %conflict.key,
                        read = conflict.read,
                        current = conflict.current,
                        "transaction conflict, retrying"
                    );
                    std::thread::yield_now();
                }
            }
        }

        warn!(attempts, "transaction abandoned after repeated conflicts");
        Err(StoreError::TransactionFailed { attempts }.into())
    }

    /// Writes a snapshot to the journal and optionally drops the ops it covers.
    pub fn checkpoint(&self, compact: bool) -> Result<(), StoreError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let store = self.inner.read();
        let snapshot = store.export_snapshot();
        let last_seq = store.latest_op_seq();
        let mut sink = journal.lock();
        sink.write_snapshot(&snapshot, last_seq)?;
        if compact {
            let removed = sink.compact_through(last_seq)?;
            debug!(last_seq, removed, "compacted journal");
        }
        Ok(())
    }

    // Called with the store write lock held, before the ops are applied, so
    // journal order matches commit order and a rejected write leaves no trace.
    fn append_journal(&self, ops: &[StoredOp]) -> Result<(), StoreError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let mut sink = journal.lock();
        sink.append_ops(ops)?;
        Ok(())
    }
}
