//! Generic CRUD service for one record kind.

use std::marker::PhantomData;
use std::sync::Arc;

use db::{Record, RecordMapper};
use tracing::debug;

use crate::{RequiredFields, ServiceError};

pub struct EntityService<R> {
    mapper: Arc<RecordMapper>,
    table: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> EntityService<R> {
    pub fn new(mapper: Arc<RecordMapper>) -> Self {
        Self::with_table(mapper, R::TABLE)
    }

    /// Service over a table other than the record's default one.
    pub fn with_table(mapper: Arc<RecordMapper>, table: &'static str) -> Self {
        Self {
            mapper,
            table,
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    fn id_column(&self) -> &'static str {
        R::id_field().column
    }

    /// Every record of this kind. An empty table is [`ServiceError::NoRecords`].
    pub async fn list(&self) -> Result<Vec<R>, ServiceError> {
        let rows = self.mapper.fetch_all::<R>(self.table).await?;
        non_empty(rows, self.table)
    }

    pub async fn get(&self, id: R::Id) -> Result<R, ServiceError> {
        Ok(self.mapper.fetch_by_id(self.table, self.id_column(), id).await?)
    }

    pub async fn delete(&self, id: R::Id) -> Result<(), ServiceError> {
        self.mapper.delete::<R>(self.table, self.id_column(), id).await?;
        debug!(table = self.table, %id, "deleted");
        Ok(())
    }
}

impl<R: Record + RequiredFields> EntityService<R> {
    /// Validate and insert `record`, returning its new identifier.
    pub async fn add(&self, record: &R) -> Result<R::Id, ServiceError> {
        record.check_required()?;
        let id = self.mapper.insert(self.table, record).await?;
        debug!(table = self.table, %id, "added");
        Ok(id)
    }

    pub async fn update(&self, id: R::Id, record: &R) -> Result<(), ServiceError> {
        record.check_required()?;
        self.mapper.update(self.table, self.id_column(), id, record).await?;
        Ok(())
    }
}

fn non_empty<R>(rows: Vec<R>, table: &'static str) -> Result<Vec<R>, ServiceError> {
    if rows.is_empty() {
        Err(ServiceError::NoRecords(table))
    } else {
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::{AuditEntry, BusinessUnit, Equipment};
    use db::{AuditSink, ConnectionManager, DatabaseConfig, DbError, Privilege};

    fn mapper() -> Arc<RecordMapper> {
        let tier = "{ host: 127.0.0.1, port: 1, user: nobody, password: x, database: none }";
        let config = DatabaseConfig::from_yaml(&format!(
            "admin: {tier}\nread: {tier}\nwrite: {tier}\ndelete: {tier}\n\
             pool: {{ max_connections: 1, acquire_timeout_secs: 1 }}\n"
        ))
        .unwrap();
        let manager = Arc::new(ConnectionManager::new(config));
        let audit = Arc::new(AuditSink::postgres(manager.clone()));
        Arc::new(RecordMapper::new(manager, audit))
    }

    #[test]
    fn empty_lists_become_no_records() {
        let err = non_empty(Vec::<BusinessUnit>::new(), "businessunit").unwrap_err();
        assert!(matches!(err, ServiceError::NoRecords("businessunit")));
        assert_eq!(non_empty(vec![1, 2], "x").unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn services_default_to_the_record_table() {
        let mapper = mapper();
        assert_eq!(EntityService::<Equipment>::new(mapper.clone()).table(), "equipment");
        assert_eq!(EntityService::<AuditEntry>::new(mapper.clone()).table(), "auditlog");
        assert_eq!(
            EntityService::<BusinessUnit>::with_table(mapper, "BusinessUnit").table(),
            "BusinessUnit"
        );
    }

    #[tokio::test]
    async fn validation_runs_before_the_database_is_touched() {
        let mapper = mapper();
        let service = EntityService::<BusinessUnit>::new(mapper.clone());
        let blank = BusinessUnit {
            unit_id: 0,
            name: "HQ".into(),
            point_of_contact: String::new(),
            address_line_one: "1 Main St".into(),
            address_line_two: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: "US".into(),
        };

        let err = service.add(&blank).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("point_of_contact")));
        let err = service.update(1, &blank).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingField("point_of_contact")));
        assert!(!mapper.manager().is_open(Privilege::Write).await);
    }

    #[tokio::test]
    async fn database_failures_are_wrapped() {
        let service = EntityService::<Equipment>::new(mapper());
        let err = service.list().await.unwrap_err();
        assert!(matches!(err, ServiceError::Db(DbError::Connection { .. })));
        assert!(!err.is_not_found());
    }
}
