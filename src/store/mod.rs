//! Generic persistence contract shared by every entity type.
//!
//! Business code talks to [`EntityStore`] only. SQLite backs the running
//! service; the in-memory backend exists for tests.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::OffsetDateTime;

#[cfg(test)]
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate value for unique field `{field}`")]
    DuplicateKey { field: &'static str },
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A column value. Always bound as a query parameter, never spliced into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl Value {
    /// Lookup equality. `Null` matches nothing, as in SQL.
    pub fn matches(&self, other: &Value) -> bool {
        !matches!(self, Value::Null) && self == other
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::Text)
    }
}

/// A record type the store can persist.
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    /// Table (or collection) name.
    const TABLE: &'static str;
    /// Data columns, excluding `id` and the store-managed timestamps.
    const COLUMNS: &'static [&'static str];
    /// Column protected by the uniqueness constraint. Must be one of `COLUMNS`.
    const UNIQUE_FIELD: &'static str;

    fn id(&self) -> i64;

    /// Values for `COLUMNS`, in the same order.
    fn values(&self) -> Vec<Value>;

    /// Called once by the store when the record is created.
    fn assign(&mut self, id: i64, now: OffsetDateTime);

    /// Called by the store on every update.
    fn touch(&mut self, now: OffsetDateTime);

    fn value_of(&self, field: &str) -> Option<Value> {
        if field == "id" {
            return Some(Value::Integer(self.id()));
        }
        let idx = Self::COLUMNS.iter().position(|c| *c == field)?;
        self.values().into_iter().nth(idx)
    }
}

/// CRUD plus single-field lookup over one entity type.
///
/// Deletes are logical: a deleted record is invisible to every lookup and
/// no longer counts against the uniqueness constraint, but its id is never
/// handed out again.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Inserts `record` and returns the id assigned to it.
    async fn create(&self, record: T) -> StoreResult<i64>;

    async fn get_by_id(&self, id: i64) -> StoreResult<T>;

    /// Returns the live record whose `field` equals `value`, lowest id first.
    async fn get_by_field(&self, field: &str, value: Value) -> StoreResult<T>;

    async fn update(&self, record: T) -> StoreResult<()>;

    async fn delete(&self, id: i64) -> StoreResult<()>;
}

/// Resolves a logical field name to one of `T`'s own column names.
pub(crate) fn checked_field<T: Entity>(field: &str) -> StoreResult<&'static str> {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
    }
    if !IDENT_RE.is_match(field) {
        return Err(StoreError::UnknownField(field.to_string()));
    }
    if field == "id" {
        return Ok("id");
    }
    T::COLUMNS
        .iter()
        .copied()
        .find(|c| *c == field)
        .ok_or_else(|| StoreError::UnknownField(field.to_string()))
}
