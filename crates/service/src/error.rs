//! Service-level error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required request field is empty or zero.
    #[error("required field '{0}' is zero value")]
    MissingField(&'static str),

    /// A list request matched no rows.
    #[error("no records found in '{0}'")]
    NoRecords(&'static str),

    /// Persistence error from the db crate.
    #[error(transparent)]
    Db(#[from] db::DbError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoRecords(_) => true,
            Self::Db(e) => e.is_not_found(),
            Self::MissingField(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::DbError;

    #[test]
    fn not_found_covers_empty_lists_and_missing_rows() {
        assert!(ServiceError::NoRecords("equipment").is_not_found());
        assert!(ServiceError::from(DbError::NotFound {
            table: "equipment".into(),
            id: "7".into(),
        })
        .is_not_found());
        assert!(!ServiceError::MissingField("name").is_not_found());
        assert!(!ServiceError::from(DbError::InvalidTable("x".into())).is_not_found());
    }

    #[test]
    fn database_messages_pass_through() {
        let err = ServiceError::from(DbError::InvalidTable("nope".into()));
        assert_eq!(err.to_string(), "table 'nope' is not a table in the schema catalog");
        assert_eq!(
            ServiceError::MissingField("city").to_string(),
            "required field 'city' is zero value"
        );
    }
}
