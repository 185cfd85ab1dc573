//! Postgres connection management, one pool per privilege tier.
//!
//! A [`ConnectionManager`] is built once at startup and shared (behind an
//! `Arc`) by everything that talks to the database. Each tier is opened on
//! first use with that tier's credentials and verified with a round-trip
//! ping. Initialisation is serialised per tier, so concurrent first use opens
//! exactly one pool; a failed attempt leaves the tier unopened and the next
//! caller gets its own connection error.
//!
//! Queries run on a small `sqlx` pool per tier. `sqlx` pools are safe to share
//! across tasks; the manager only guards opening and closing. Once a tier is
//! open, callers share a read lock and never queue behind each other.

use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::config::{Credentials, DatabaseConfig, PoolSettings};
use crate::{DbError, Privilege};

/// Type alias for the Postgres pool handed out per tier.
pub type DbPool = PgPool;

enum Slot {
    Unopened,
    Open(DbPool),
    Closed,
}

pub struct ConnectionManager {
    config: DatabaseConfig,
    slots: [RwLock<Slot>; 4],
}

impl ConnectionManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            slots: std::array::from_fn(|_| RwLock::new(Slot::Unopened)),
        }
    }

    /// Schema holding the logistics tables.
    pub fn schema(&self) -> &str {
        &self.config.pool.schema
    }

    /// Return the pool for `tier`, opening it on first use.
    ///
    /// # Errors
    /// - [`DbError::Connection`] if connecting or the liveness ping fails.
    /// - [`DbError::ConnectionClosed`] if the tier was closed.
    #[instrument(skip(self))]
    pub async fn acquire(&self, tier: Privilege) -> Result<DbPool, DbError> {
        if let Some(ready) = Self::settled(&*self.slots[tier.index()].read().await, tier) {
            return ready;
        }

        // Opening: re-check under the write lock, another caller may have won.
        let mut slot = self.slots[tier.index()].write().await;
        if let Some(ready) = Self::settled(&slot, tier) {
            return ready;
        }

        let credentials = self.config.credentials(tier);
        let pool = create_pool(credentials, &self.config.pool)
            .await
            .map_err(|source| {
                error!("failed to open database connection as {tier}: {source}");
                DbError::Connection { tier, source }
            })?;

        if let Err(source) = ping_pool(&pool).await {
            error!("failed to ping database as {tier}: {source}");
            pool.close().await;
            return Err(DbError::Connection { tier, source });
        }

        info!(
            "Connected to {}:{}/{} as {tier} (max_connections={})",
            credentials.host, credentials.port, credentials.database, self.config.pool.max_connections
        );
        *slot = Slot::Open(pool.clone());
        Ok(pool)
    }

    /// Outcome for a tier that is already open or closed.
    fn settled(slot: &Slot, tier: Privilege) -> Option<Result<DbPool, DbError>> {
        match slot {
            Slot::Open(pool) => Some(Ok(pool.clone())),
            Slot::Closed => Some(Err(DbError::ConnectionClosed(tier))),
            Slot::Unopened => None,
        }
    }

    /// Parse a tier name and acquire it.
    pub async fn acquire_named(&self, tier: &str) -> Result<DbPool, DbError> {
        self.acquire(tier.parse()?).await
    }

    /// Round-trip to the database on `tier`, returning the latency.
    pub async fn ping(&self, tier: Privilege) -> Result<Duration, DbError> {
        let pool = self.acquire(tier).await?;
        let start = Instant::now();
        ping_pool(&pool)
            .await
            .map_err(|source| DbError::Connection { tier, source })?;
        Ok(start.elapsed())
    }

    pub async fn is_open(&self, tier: Privilege) -> bool {
        matches!(&*self.slots[tier.index()].read().await, Slot::Open(_))
    }

    /// Close one tier. Idempotent; the tier will not reopen.
    pub async fn close_tier(&self, tier: Privilege) {
        let mut slot = self.slots[tier.index()].write().await;
        if let Slot::Open(pool) = std::mem::replace(&mut *slot, Slot::Closed) {
            pool.close().await;
            info!("Closed database connection for {tier}");
        }
    }

    /// Close every tier. Idempotent.
    pub async fn close(&self) {
        for tier in Privilege::ALL {
            self.close_tier(tier).await;
        }
    }
}

/// Create a new connection pool for one tier's credentials.
///
/// Connects eagerly, so an unreachable server is reported here.
pub async fn create_pool(
    credentials: &Credentials,
    settings: &PoolSettings,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect_with(credentials.connect_options())
        .await
}

async fn ping_pool(pool: &DbPool) -> Result<(), sqlx::Error> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    if one != 1 {
        warn!("liveness ping returned {one}");
    }
    Ok(())
}
