//! Static field descriptors for record kinds.
//!
//! Every table the mapper touches is described by a [`Record`] implementation:
//! an ordered list of [`Field`]s whose first entry is the primary identifier,
//! plus a `values()` method returning the record's data in the same order.
//! The mapper builds column lists and positional bind parameters from these,
//! so descriptor order is column order in every generated statement.

use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, FromRow, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Text,
    Timestamp,
    Uuid,
}

/// One column of a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Rust / JSON field name.
    pub name: &'static str,
    /// Column name in the table.
    pub column: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
}

impl Field {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            column: name,
            ty,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            column: name,
            ty,
            nullable: true,
        }
    }
}

/// A single bindable value taken from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
    NullableText(Option<String>),
    Timestamp(DateTime<Utc>),
    NullableTimestamp(Option<DateTime<Utc>>),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Int(_) => FieldType::Int,
            Self::Text(_) | Self::NullableText(_) => FieldType::Text,
            Self::Timestamp(_) | Self::NullableTimestamp(_) => FieldType::Timestamp,
            Self::Uuid(_) => FieldType::Uuid,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::NullableText(_) | Self::NullableTimestamp(_))
    }

    /// Append this value to a positional argument list.
    pub fn add_to(self, args: &mut PgArguments) -> Result<(), sqlx::Error> {
        let added = match self {
            Self::Int(v) => args.add(v),
            Self::Text(v) => args.add(v),
            Self::NullableText(v) => args.add(v),
            Self::Timestamp(v) => args.add(v),
            Self::NullableTimestamp(v) => args.add(v),
            Self::Uuid(v) => args.add(v),
        };
        added.map_err(sqlx::Error::Encode)
    }
}

/// A flat, struct-shaped entity mapped 1:1 onto a table row.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    /// Type of the primary identifier (field 0).
    type Id: Copy
        + fmt::Debug
        + fmt::Display
        + Send
        + Sync
        + Unpin
        + 'static
        + for<'q> sqlx::Encode<'q, Postgres>
        + for<'r> sqlx::Decode<'r, Postgres>
        + sqlx::Type<Postgres>;

    /// Default table name.
    const TABLE: &'static str;
    /// Upper-case entity label used in audit actions, e.g. `BUSINESS_UNIT`.
    const ENTITY: &'static str;
    /// Ordered columns; `FIELDS[0]` is the primary identifier.
    const FIELDS: &'static [Field];

    fn id(&self) -> Self::Id;

    /// Values in `FIELDS` order, identifier included.
    fn values(&self) -> Vec<FieldValue>;

    fn id_field() -> &'static Field {
        &Self::FIELDS[0]
    }

    /// Look up a described column, ignoring ASCII case.
    fn field(column: &str) -> Option<&'static Field> {
        Self::FIELDS
            .iter()
            .find(|f| f.column.eq_ignore_ascii_case(column))
    }
}

/// Assert that a record's values line up with its descriptor.
#[cfg(test)]
pub(crate) fn assert_descriptor_matches<R: Record>(record: &R) {
    let values = record.values();
    assert_eq!(values.len(), R::FIELDS.len(), "{} value count", R::ENTITY);
    for (field, value) in R::FIELDS.iter().zip(&values) {
        assert_eq!(field.ty, value.field_type(), "{}.{}", R::ENTITY, field.name);
        assert_eq!(field.nullable, value.is_nullable(), "{}.{}", R::ENTITY, field.name);
    }
    assert!(!R::id_field().nullable, "{} identifier must not be nullable", R::ENTITY);
}
