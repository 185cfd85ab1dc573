//! Generic record mapper: CRUD over any [`Record`] kind.
//!
//! Every operation:
//! 1. checks the identifier column against the record descriptor,
//! 2. acquires the pool for the operation's privilege tier,
//! 3. resolves the table name through the live catalog,
//! 4. builds and runs the statement (mutations inside a transaction),
//! 5. queues exactly one audit entry describing the outcome, whatever it was.
//!
//! Keys for new rows come from the table's identity column, so concurrent
//! inserts always receive distinct, increasing identifiers.

use std::sync::Arc;

use sqlx::postgres::PgArguments;
use sqlx::Arguments;
use tracing::{instrument, warn};

use crate::audit::AuditSink;
use crate::catalog::validate_table;
use crate::models::AuditStatus;
use crate::pool::{ConnectionManager, DbPool};
use crate::record::{FieldValue, Record};
use crate::{sql, DbError, Privilege};

/// The mapper operations, each bound to a privilege tier and an audit verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchAll,
    FetchById,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn tier(&self) -> Privilege {
        match self {
            Self::FetchAll | Self::FetchById => Privilege::Read,
            Self::Insert | Self::Update => Privilege::Write,
            Self::Delete => Privilege::Delete,
        }
    }

    /// Audit action label, e.g. `ADD_BUSINESS_UNIT` or `GET_EQUIPMENT_BY_ID`.
    pub fn action(&self, entity: &str) -> String {
        match self {
            Self::FetchAll => format!("GET_{entity}"),
            Self::FetchById => format!("GET_{entity}_BY_ID"),
            Self::Insert => format!("ADD_{entity}"),
            Self::Update => format!("UPDATE_{entity}"),
            Self::Delete => format!("DELETE_{entity}"),
        }
    }
}

pub struct RecordMapper {
    manager: Arc<ConnectionManager>,
    audit: Arc<AuditSink>,
}

impl RecordMapper {
    pub fn new(manager: Arc<ConnectionManager>, audit: Arc<AuditSink>) -> Self {
        Self { manager, audit }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn audit(&self) -> &Arc<AuditSink> {
        &self.audit
    }

    /// Every row of `table`, ordered by identifier. Zero rows is an empty
    /// vector, audited as `WARN`.
    #[instrument(skip(self), fields(entity = R::ENTITY))]
    pub async fn fetch_all<R: Record>(&self, table: &str) -> Result<Vec<R>, DbError> {
        let result = self.fetch_all_inner::<R>(table).await;
        let status = match &result {
            Ok(rows) if rows.is_empty() => AuditStatus::Warn,
            Ok(_) => AuditStatus::Success,
            Err(_) => AuditStatus::Failed,
        };
        self.finish::<R, _>(Operation::FetchAll, result, status)
    }

    #[instrument(skip(self), fields(entity = R::ENTITY))]
    pub async fn fetch_by_id<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
    ) -> Result<R, DbError> {
        let result = self.fetch_by_id_inner::<R>(table, id_column, id).await;
        let status = outcome(&result);
        self.finish::<R, _>(Operation::FetchById, result, status)
    }

    /// Insert `record` and return the identifier the database assigned.
    /// The record's own identifier is ignored.
    #[instrument(skip(self, record), fields(entity = R::ENTITY))]
    pub async fn insert<R: Record>(&self, table: &str, record: &R) -> Result<R::Id, DbError> {
        let result = self.insert_inner(table, record).await;
        let status = outcome(&result);
        self.finish::<R, _>(Operation::Insert, result, status)
    }

    /// Overwrite every non-identifier field of the row keyed by `id`.
    #[instrument(skip(self, record), fields(entity = R::ENTITY))]
    pub async fn update<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
        record: &R,
    ) -> Result<(), DbError> {
        let result = self.update_inner(table, id_column, id, record).await;
        let status = outcome(&result);
        self.finish::<R, _>(Operation::Update, result, status)
    }

    #[instrument(skip(self), fields(entity = R::ENTITY))]
    pub async fn delete<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
    ) -> Result<(), DbError> {
        let result = self.delete_inner::<R>(table, id_column, id).await;
        let status = outcome(&result);
        self.finish::<R, _>(Operation::Delete, result, status)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn finish<R: Record, T>(
        &self,
        op: Operation,
        result: Result<T, DbError>,
        status: AuditStatus,
    ) -> Result<T, DbError> {
        if let Err(e) = &result {
            warn!("{:?} on {} failed: {e}", op, R::ENTITY);
        }
        self.audit.record(op.action(R::ENTITY), status);
        result
    }

    /// Descriptor check, pool and catalog resolution shared by every operation.
    async fn prepare<R: Record>(
        &self,
        op: Operation,
        table: &str,
        id_column: Option<&str>,
    ) -> Result<(DbPool, String, &'static str), DbError> {
        let id_column = match id_column {
            Some(column) => R::field(column)
                .ok_or_else(|| DbError::InvalidColumn {
                    table: table.to_owned(),
                    column: column.to_owned(),
                })?
                .column,
            None => R::id_field().column,
        };
        let pool = self.manager.acquire(op.tier()).await?;
        let table = validate_table(&pool, self.manager.schema(), table).await?;
        Ok((pool, table, id_column))
    }

    async fn fetch_all_inner<R: Record>(&self, table: &str) -> Result<Vec<R>, DbError> {
        let (pool, table, _) = self.prepare::<R>(Operation::FetchAll, table, None).await?;
        let statement = sql::select_all(self.manager.schema(), &table, R::FIELDS);
        sqlx::query_as::<_, R>(&statement)
            .fetch_all(&pool)
            .await
            .map_err(|source| DbError::Query { table, source })
    }

    async fn fetch_by_id_inner<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
    ) -> Result<R, DbError> {
        let (pool, table, id_column) = self
            .prepare::<R>(Operation::FetchById, table, Some(id_column))
            .await?;
        let statement = sql::select_by_id(self.manager.schema(), &table, R::FIELDS, id_column);
        let row = sqlx::query_as::<_, R>(&statement)
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|source| DbError::Query {
                table: table.clone(),
                source,
            })?;
        row.ok_or_else(|| DbError::NotFound {
            table,
            id: id.to_string(),
        })
    }

    async fn insert_inner<R: Record>(&self, table: &str, record: &R) -> Result<R::Id, DbError> {
        let (pool, table, _) = self.prepare::<R>(Operation::Insert, table, None).await?;
        let statement = sql::insert(self.manager.schema(), &table, R::FIELDS);
        let args = arguments(record.values().into_iter().skip(1))
            .map_err(|e| DbError::from_write(&table, e))?;

        let mut tx = pool.begin().await.map_err(|e| DbError::from_write(&table, e))?;
        let id = sqlx::query_scalar_with::<_, R::Id, _>(&statement, args)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from_write(&table, e))?;
        tx.commit().await.map_err(|e| DbError::from_write(&table, e))?;
        Ok(id)
    }

    async fn update_inner<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
        record: &R,
    ) -> Result<(), DbError> {
        let (pool, table, id_column) = self
            .prepare::<R>(Operation::Update, table, Some(id_column))
            .await?;
        let statement = sql::update(self.manager.schema(), &table, R::FIELDS, id_column);
        let mut args = arguments(record.values().into_iter().skip(1))
            .map_err(|e| DbError::from_write(&table, e))?;
        args.add(id)
            .map_err(|e| DbError::from_write(&table, sqlx::Error::Encode(e)))?;

        let mut tx = pool.begin().await.map_err(|e| DbError::from_write(&table, e))?;
        let result = sqlx::query_with(&statement, args)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_write(&table, e))?;
        // Dropping `tx` without committing rolls it back.
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        tx.commit().await.map_err(|e| DbError::from_write(&table, e))?;
        Ok(())
    }

    async fn delete_inner<R: Record>(
        &self,
        table: &str,
        id_column: &str,
        id: R::Id,
    ) -> Result<(), DbError> {
        let (pool, table, id_column) = self
            .prepare::<R>(Operation::Delete, table, Some(id_column))
            .await?;
        let statement = sql::delete(self.manager.schema(), &table, id_column);

        let mut tx = pool.begin().await.map_err(|e| DbError::from_write(&table, e))?;
        let result = sqlx::query(&statement)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_write(&table, e))?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        tx.commit().await.map_err(|e| DbError::from_write(&table, e))?;
        Ok(())
    }
}

fn outcome<T>(result: &Result<T, DbError>) -> AuditStatus {
    match result {
        Ok(_) => AuditStatus::Success,
        Err(_) => AuditStatus::Failed,
    }
}

fn arguments(values: impl IntoIterator<Item = FieldValue>) -> Result<PgArguments, sqlx::Error> {
    let mut args = PgArguments::default();
    for value in values {
        value.add_to(&mut args)?;
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::tests::MemoryWriter;
    use crate::config::DatabaseConfig;
    use crate::models::{BusinessUnit, Equipment, User};

    fn unreachable_manager() -> Arc<ConnectionManager> {
        let tier = "{ host: 127.0.0.1, port: 1, user: nobody, password: x, database: none }";
        let config = DatabaseConfig::from_yaml(&format!(
            "admin: {tier}\nread: {tier}\nwrite: {tier}\ndelete: {tier}\n\
             pool: {{ max_connections: 1, acquire_timeout_secs: 1 }}\n"
        ))
        .unwrap();
        Arc::new(ConnectionManager::new(config))
    }

    fn mapper() -> (RecordMapper, Arc<MemoryWriter>, Arc<AuditSink>) {
        let writer = Arc::new(MemoryWriter::default());
        let sink = Arc::new(AuditSink::spawn(writer.clone(), 16));
        (RecordMapper::new(unreachable_manager(), sink.clone()), writer, sink)
    }

    fn hq() -> BusinessUnit {
        BusinessUnit {
            unit_id: 0,
            name: "HQ".into(),
            point_of_contact: "J. Doe".into(),
            address_line_one: "1 Main St".into(),
            address_line_two: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn operations_map_to_tiers_and_actions() {
        assert_eq!(Operation::FetchAll.tier(), Privilege::Read);
        assert_eq!(Operation::FetchById.tier(), Privilege::Read);
        assert_eq!(Operation::Insert.tier(), Privilege::Write);
        assert_eq!(Operation::Update.tier(), Privilege::Write);
        assert_eq!(Operation::Delete.tier(), Privilege::Delete);

        assert_eq!(Operation::Insert.action("BUSINESS_UNIT"), "ADD_BUSINESS_UNIT");
        assert_eq!(Operation::FetchAll.action("EQUIPMENT"), "GET_EQUIPMENT");
        assert_eq!(Operation::FetchById.action("EQUIPMENT"), "GET_EQUIPMENT_BY_ID");
        assert_eq!(Operation::Update.action("USER"), "UPDATE_USER");
        assert_eq!(Operation::Delete.action("MANUFACTURER"), "DELETE_MANUFACTURER");
    }

    #[test]
    fn every_field_value_encodes() {
        assert!(arguments(hq().values()).is_ok());
        let equipment = Equipment {
            equipment_id: 3,
            business_unit_id: 1,
            manufacturer: "Acme".into(),
            model: "X1".into(),
            description: None,
            date_received: chrono::Utc::now(),
            last_inventoried: None,
        };
        assert!(arguments(equipment.values()).is_ok());
    }

    #[tokio::test]
    async fn connection_failures_are_typed_and_still_audited() {
        let (mapper, writer, sink) = mapper();

        let err = mapper.insert("businessunit", &hq()).await.unwrap_err();
        assert!(matches!(err, DbError::Connection { tier: Privilege::Write, .. }));

        let err = mapper.fetch_all::<Equipment>("equipment").await.unwrap_err();
        assert!(matches!(err, DbError::Connection { tier: Privilege::Read, .. }));

        let err = mapper.delete::<User>("smidgenusers", "user_id", 4).await.unwrap_err();
        assert!(matches!(err, DbError::Connection { tier: Privilege::Delete, .. }));

        sink.shutdown().await;
        assert_eq!(
            writer.actions(),
            vec![
                ("ADD_BUSINESS_UNIT".to_string(), AuditStatus::Failed),
                ("GET_EQUIPMENT".to_string(), AuditStatus::Failed),
                ("DELETE_USER".to_string(), AuditStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_id_columns_are_rejected_before_any_sql() {
        let (mapper, writer, sink) = mapper();

        let err = mapper
            .fetch_by_id::<BusinessUnit>("businessunit", "unit_id = 1 OR 1", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidColumn { ref column, .. } if column == "unit_id = 1 OR 1"));

        let err = mapper
            .update("businessunit", "nope", 1, &hq())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidColumn { .. }));

        sink.shutdown().await;
        assert_eq!(
            writer.actions(),
            vec![
                ("GET_BUSINESS_UNIT_BY_ID".to_string(), AuditStatus::Failed),
                ("UPDATE_BUSINESS_UNIT".to_string(), AuditStatus::Failed),
            ]
        );
        // The descriptor check happens before the pool is touched.
        assert!(!mapper.manager().is_open(Privilege::Read).await);
    }
}
