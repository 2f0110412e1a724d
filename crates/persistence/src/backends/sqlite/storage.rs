//! RecordStorage implementation for SQLite.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params_from_iter};
use uuid::Uuid;

use crate::core::RecordStorage;
use crate::criteria::Criteria;
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::model::{Record, from_columns, merge_present, to_columns};
use crate::query::{PageClause, Predicate, compile};

use super::SqliteBackend;
use super::backend::BACKEND_NAME;

fn row_values(row: &Row<'_>, count: usize) -> rusqlite::Result<Vec<Option<String>>> {
    (0..count).map(|i| row.get(i)).collect()
}

fn select_by_id<R: Record>(conn: &Connection, id: Uuid) -> StorageResult<Option<R>> {
    let schema = R::schema();
    let columns = schema.columns();
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        columns.join(", "),
        schema.table
    );
    let values = conn
        .query_row(&sql, [id.to_string()], |row| row_values(row, columns.len()))
        .optional()?;
    values.map(from_columns).transpose()
}

/// Writes every non-id column of an existing row. Returns the number of rows
/// changed.
fn update_row<R: Record>(conn: &Connection, record: &R) -> StorageResult<usize> {
    let schema = R::schema();
    let columns = schema.columns();
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?1",
        schema.table,
        assignments.join(", ")
    );
    let values = to_columns(record)?;
    Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
}

fn require_id<R: Record>(record: &R) -> StorageResult<Uuid> {
    record.id().ok_or_else(|| {
        StorageError::Resource(ResourceError::MissingIdentifier {
            resource_type: R::resource_type().to_string(),
        })
    })
}

fn check_predicate<R: Record>(predicate: &Predicate) -> StorageResult<()> {
    if predicate.resource_type() != R::resource_type() {
        return Err(StorageError::Backend(BackendError::QueryError {
            message: format!(
                "predicate compiled for {} used to query {}",
                predicate.resource_type(),
                R::resource_type()
            ),
        }));
    }
    Ok(())
}

#[async_trait]
impl<R: Record> RecordStorage<R> for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn insert(&self, record: &R) -> StorageResult<R> {
        let schema = R::schema();
        let mut stored = record.clone();
        stored.set_id(Uuid::new_v4());

        let columns = schema.columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let values = to_columns(&stored)?;

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(&sql, params_from_iter(values.iter()))?;
        tx.commit()?;

        Ok(stored)
    }

    async fn read(&self, id: Uuid) -> StorageResult<Option<R>> {
        let conn = self.get_connection()?;
        select_by_id(&conn, id)
    }

    async fn read_all(&self) -> StorageResult<Vec<R>> {
        let predicate = compile(R::schema(), &Criteria::new())?;
        self.find(&predicate, None).await
    }

    async fn replace(&self, record: &R) -> StorageResult<R> {
        let id = require_id(record)?;

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if update_row(&tx, record)? == 0 {
            return Err(StorageError::Resource(ResourceError::NotFound {
                resource_type: R::resource_type().to_string(),
                id: id.to_string(),
            }));
        }
        tx.commit()?;

        Ok(record.clone())
    }

    async fn merge(&self, id: Uuid, patch: &R) -> StorageResult<Option<R>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(stored) = select_by_id::<R>(&tx, id)? else {
            return Ok(None);
        };
        let merged = merge_present(&stored, patch)?;
        update_row(&tx, &merged)?;
        tx.commit()?;

        Ok(Some(merged))
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        let schema = R::schema();
        let sql = format!("DELETE FROM {} WHERE id = ?1", schema.table);

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = tx.execute(&sql, [id.to_string()])?;
        tx.commit()?;

        Ok(deleted > 0)
    }

    async fn find(&self, predicate: &Predicate, page: Option<&PageClause>) -> StorageResult<Vec<R>> {
        check_predicate::<R>(predicate)?;
        let columns = R::schema().columns();
        let fragment = predicate.select_sql(&columns, page);

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&fragment.sql)?;
        let rows = stmt
            .query_map(params_from_iter(fragment.params.iter()), |row| {
                row_values(row, columns.len())
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(from_columns).collect()
    }

    async fn count(&self, predicate: &Predicate) -> StorageResult<u64> {
        check_predicate::<R>(predicate)?;
        let fragment = predicate.count_sql();

        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            &fragment.sql,
            params_from_iter(fragment.params.iter()),
            |row| row.get(0),
        )?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
