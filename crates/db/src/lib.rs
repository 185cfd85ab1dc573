//! `db` crate: persistence layer for the Smidgen logistics schema.
//!
//! Provides per-tier connection pools, record descriptors and row structs,
//! the generic [`RecordMapper`], table name validation and the audit sink.
//! No business rules live here.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod pool;
pub mod privilege;
pub mod record;
pub mod sql;

pub use audit::{AuditSink, AuditStats, AuditWriter, PgAuditWriter};
pub use config::{Credentials, DatabaseConfig, PoolSettings};
pub use error::DbError;
pub use mapper::{Operation, RecordMapper};
pub use pool::{ConnectionManager, DbPool};
pub use privilege::Privilege;
pub use record::{Field, FieldType, FieldValue, Record};
