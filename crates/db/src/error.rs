//! Typed error type for the db crate.

use thiserror::Error;

use crate::privilege::Privilege;

/// SQLSTATE reported by PostgreSQL for `foreign_key_violation`.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum DbError {
    /// The privilege string is not one of read / write / delete / admin.
    #[error("invalid privilege level '{0}'")]
    InvalidPrivilege(String),

    /// Credential file missing, unreadable or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connect or liveness ping failed while initialising a tier.
    #[error("failed to connect as '{tier}': {source}")]
    Connection {
        tier: Privilege,
        #[source]
        source: sqlx::Error,
    },

    /// The tier was closed and will not be reopened.
    #[error("connection for '{0}' has been closed")]
    ConnectionClosed(Privilege),

    /// Table name absent from the live schema catalog (or the catalog
    /// could not be read).
    #[error("table '{0}' is not a table in the schema catalog")]
    InvalidTable(String),

    /// Identifier column not described by the record kind.
    #[error("column '{column}' is not a column of '{table}'")]
    InvalidColumn { table: String, column: String },

    #[error("query on '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("write to '{table}' failed: {source}")]
    Write {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("write to '{table}' violates foreign key constraint '{constraint}'")]
    ForeignKeyViolation { table: String, constraint: String },

    #[error("no row with id {id} in '{table}'")]
    NotFound { table: String, id: String },
}

impl DbError {
    /// Classify a failed mutation: foreign-key violations become
    /// [`DbError::ForeignKeyViolation`], everything else [`DbError::Write`].
    pub fn from_write(table: &str, source: sqlx::Error) -> Self {
        if let Some(db_err) = source.as_database_error() {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return Self::ForeignKeyViolation {
                    table: table.to_owned(),
                    constraint: db_err.constraint().unwrap_or("unknown").to_owned(),
                };
            }
        }
        Self::Write {
            table: table.to_owned(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
