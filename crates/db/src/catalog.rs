//! Table name validation against the live schema catalog.
//!
//! Table identifiers are spliced into SQL text, so a caller-supplied name is
//! only ever used after it has been resolved to a base table that currently
//! exists in the schema. Anything else fails closed with
//! [`DbError::InvalidTable`].

use std::collections::BTreeSet;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::{sql, DbError};

/// Snapshot of the base tables in one schema.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: BTreeSet<String>,
}

impl TableCatalog {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the current catalog for `schema`.
    pub async fn fetch(pool: &PgPool, schema: &str) -> Result<Self, sqlx::Error> {
        let tables: Vec<String> = sqlx::query_scalar(sql::CATALOG_QUERY)
            .bind(schema)
            .fetch_all(pool)
            .await?;
        Ok(Self::new(tables))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.resolve(table).is_ok()
    }

    /// Map a caller-supplied name onto the catalog's own spelling.
    ///
    /// An exact match wins. Otherwise the name matches ignoring ASCII case,
    /// but only when exactly one entry does. The returned spelling is what
    /// the statement builders quote, and it must be a plain identifier.
    pub fn resolve(&self, table: &str) -> Result<&str, DbError> {
        let resolved = match self.tables.get(table) {
            Some(exact) => Some(exact.as_str()),
            None => {
                let mut folded = self.tables.iter().filter(|t| t.eq_ignore_ascii_case(table));
                match (folded.next(), folded.next()) {
                    (Some(only), None) => Some(only.as_str()),
                    _ => None,
                }
            }
        };
        resolved
            .filter(|t| sql::is_plain_identifier(t))
            .ok_or_else(|| DbError::InvalidTable(table.to_owned()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Validate `table` against the live catalog and return the name to splice
/// into SQL. Catalog read failures are reported as an invalid table.
pub async fn validate_table(pool: &PgPool, schema: &str, table: &str) -> Result<String, DbError> {
    let catalog = TableCatalog::fetch(pool, schema).await.map_err(|e| {
        warn!(schema, table, "schema catalog unavailable: {e}");
        DbError::InvalidTable(table.to_owned())
    })?;

    let resolved = catalog.resolve(table).map(str::to_owned);
    match &resolved {
        Ok(name) => debug!(schema, table = %name, "table validated"),
        Err(_) => warn!(schema, table, "rejected table name not present in catalog"),
    }
    resolved
}
