//! Best-effort audit trail.
//!
//! [`AuditSink::record`] never blocks and never fails: entries are pushed onto
//! a bounded queue and written by a background task, one `INSERT` per entry.
//! A full queue, a closed sink or a failed write is logged and the entry is
//! dropped. There is no retry, so a business write can succeed with its audit
//! entry missing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::models::{AuditEntry, AuditStatus};
use crate::pool::ConnectionManager;
use crate::record::Record;
use crate::{sql, DbError, Privilege};

/// Where drained audit entries end up.
#[async_trait]
pub trait AuditWriter: Send + Sync {
    async fn write(&self, entry: &AuditEntry) -> Result<(), DbError>;
}

/// Writes entries to the audit table using the `write` tier.
pub struct PgAuditWriter {
    manager: Arc<ConnectionManager>,
}

impl PgAuditWriter {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl AuditWriter for PgAuditWriter {
    async fn write(&self, entry: &AuditEntry) -> Result<(), DbError> {
        let pool = self.manager.acquire(Privilege::Write).await?;
        let statement = sql::insert_all(self.manager.schema(), AuditEntry::TABLE, AuditEntry::FIELDS);

        let mut args = sqlx::postgres::PgArguments::default();
        for value in entry.values() {
            value
                .add_to(&mut args)
                .map_err(|e| DbError::from_write(AuditEntry::TABLE, e))?;
        }

        sqlx::query_with(&statement, args)
            .execute(&pool)
            .await
            .map_err(|e| DbError::from_write(AuditEntry::TABLE, e))?;
        Ok(())
    }
}

/// Counters reported when the sink shuts down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuditStats {
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

pub struct AuditSink {
    tx: Mutex<Option<mpsc::Sender<AuditEntry>>>,
    handle: Mutex<Option<JoinHandle<AuditStats>>>,
    dropped: AtomicU64,
}

impl AuditSink {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Start the drain task. Must be called inside a tokio runtime.
    pub fn spawn(writer: Arc<dyn AuditWriter>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(writer, rx));
        Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Sink backed by the audit table.
    pub fn postgres(manager: Arc<ConnectionManager>) -> Self {
        Self::spawn(Arc::new(PgAuditWriter::new(manager)), Self::DEFAULT_CAPACITY)
    }

    /// Queue an entry for `action` with the given outcome.
    pub fn record(&self, action: impl Into<String>, status: AuditStatus) {
        let entry = AuditEntry::new(action, status);
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(action = %entry.action, "audit sink is shut down; entry dropped");
            return;
        };

        match tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, status = %entry.action_status, "audit queue full; entry dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, "audit writer stopped; entry dropped");
            }
        }
    }

    /// Stop accepting entries, wait for queued ones to be written, and
    /// report totals. Later calls return only the drop count.
    pub async fn shutdown(&self) -> AuditStats {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();

        let mut stats = match handle {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                error!("audit writer task failed: {e}");
                AuditStats::default()
            }),
            None => AuditStats::default(),
        };
        stats.dropped = self.dropped.load(Ordering::Relaxed);
        stats
    }
}

async fn drain(writer: Arc<dyn AuditWriter>, mut rx: mpsc::Receiver<AuditEntry>) -> AuditStats {
    let mut stats = AuditStats::default();
    while let Some(entry) = rx.recv().await {
        match writer.write(&entry).await {
            Ok(()) => {
                stats.written += 1;
                debug!(action = %entry.action, status = %entry.action_status, "audit entry written");
            }
            Err(e) => {
                stats.failed += 1;
                error!(action = %entry.action, "failed to write audit entry: {e}");
            }
        }
    }
    stats
}
