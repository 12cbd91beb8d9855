use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    FromRow, Sqlite, SqlitePool,
};
use time::OffsetDateTime;
use tracing::debug;

use super::{checked_field, Entity, EntityStore, StoreError, StoreResult, Value};

/// Relational backend. One table per entity, `id` assigned by
/// `AUTOINCREMENT`, soft deletes through a nullable `deleted_at` column and
/// uniqueness enforced by a partial unique index over live rows.
pub struct SqliteStore<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteStore<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn select_list() -> String {
        format!("id, created_at, updated_at, {}", T::COLUMNS.join(", "))
    }

    fn write_error(e: sqlx::Error) -> StoreError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey {
                field: T::UNIQUE_FIELD,
            },
            _ => StoreError::Backend(e),
        }
    }
}

impl<T> Clone for SqliteStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Integer(n) => query.bind(n),
        Value::Text(s) => query.bind(s),
        Value::Null => query.bind(None::<String>),
    }
}

#[async_trait]
impl<T> EntityStore<T> for SqliteStore<T>
where
    T: Entity + for<'r> FromRow<'r, SqliteRow>,
{
    async fn create(&self, record: T) -> StoreResult<i64> {
        let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}, created_at, updated_at) VALUES ({}, ?, ?)",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders,
        );
        let now = OffsetDateTime::now_utc();
        let mut query = sqlx::query(&sql);
        for value in record.values() {
            query = bind_value(query, value);
        }
        let done = query
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Self::write_error)?;
        let id = done.last_insert_rowid();
        debug!(table = T::TABLE, id, "row created");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<T> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ? AND deleted_at IS NULL",
            Self::select_list(),
            T::TABLE,
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_field(&self, field: &str, value: Value) -> StoreResult<T> {
        let column = checked_field::<T>(field)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? AND deleted_at IS NULL ORDER BY id LIMIT 1",
            Self::select_list(),
            T::TABLE,
            column,
        );
        let row = bind_value(sqlx::query(&sql), value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(T::from_row(&row)?)
    }

    async fn update(&self, record: T) -> StoreResult<()> {
        let assignments = T::COLUMNS
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            T::TABLE,
            assignments,
        );
        let mut query = sqlx::query(&sql);
        for value in record.values() {
            query = bind_value(query, value);
        }
        let done = query
            .bind(OffsetDateTime::now_utc())
            .bind(record.id())
            .execute(&self.pool)
            .await
            .map_err(Self::write_error)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
            T::TABLE,
        );
        let done = sqlx::query(&sql)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(table = T::TABLE, id, "row soft-deleted");
        Ok(())
    }
}
