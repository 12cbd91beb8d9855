use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{checked_field, Entity, EntityStore, StoreError, StoreResult, Value};

struct Slot<T> {
    record: T,
    deleted: bool,
}

struct Table<T> {
    rows: BTreeMap<i64, Slot<T>>,
    next_id: i64,
}

impl<T: Entity> Table<T> {
    fn live(&self) -> impl Iterator<Item = &T> {
        self.rows.values().filter(|s| !s.deleted).map(|s| &s.record)
    }

    fn unique_taken(&self, value: &Value, except: Option<i64>) -> bool {
        self.live().any(|r| {
            Some(r.id()) != except
                && r.value_of(T::UNIQUE_FIELD)
                    .is_some_and(|v| v.matches(value))
        })
    }
}

/// Process-local store. Every operation runs under a single mutex, so the
/// uniqueness check and the insert are one atomic step.
pub struct MemoryStore<T> {
    table: Mutex<Table<T>>,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for MemoryStore<T> {
    async fn create(&self, mut record: T) -> StoreResult<i64> {
        let unique = record.value_of(T::UNIQUE_FIELD).unwrap_or(Value::Null);
        let mut table = self.lock();
        if table.unique_taken(&unique, None) {
            return Err(StoreError::DuplicateKey {
                field: T::UNIQUE_FIELD,
            });
        }
        let id = table.next_id;
        table.next_id += 1;
        record.assign(id, OffsetDateTime::now_utc());
        table.rows.insert(
            id,
            Slot {
                record,
                deleted: false,
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<T> {
        self.lock()
            .rows
            .get(&id)
            .filter(|s| !s.deleted)
            .map(|s| s.record.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_field(&self, field: &str, value: Value) -> StoreResult<T> {
        let column = checked_field::<T>(field)?;
        self.lock()
            .live()
            .find(|r| r.value_of(column).is_some_and(|v| v.matches(&value)))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, mut record: T) -> StoreResult<()> {
        let id = record.id();
        let unique = record.value_of(T::UNIQUE_FIELD).unwrap_or(Value::Null);
        let mut table = self.lock();
        if !table.rows.get(&id).is_some_and(|s| !s.deleted) {
            return Err(StoreError::NotFound);
        }
        if table.unique_taken(&unique, Some(id)) {
            return Err(StoreError::DuplicateKey {
                field: T::UNIQUE_FIELD,
            });
        }
        record.touch(OffsetDateTime::now_utc());
        if let Some(slot) = table.rows.get_mut(&id) {
            slot.record = record;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        match self.lock().rows.get_mut(&id) {
            Some(slot) if !slot.deleted => {
                slot.deleted = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::test_support::{exercise_contract, Widget};

    #[tokio::test]
    async fn memory_store_honours_contract() {
        let store = MemoryStore::<Widget>::new();
        exercise_contract(&store).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_admit_exactly_one() {
        let store = Arc::new(MemoryStore::<Widget>::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(Widget::new("same")).await })
            })
            .collect();

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.expect("task") {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateKey { .. }) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 15);
        assert_eq!(store.lock().live().count(), 1);
    }

    #[tokio::test]
    async fn lookup_prefers_lowest_id() {
        let store = MemoryStore::<Widget>::new();
        let mut first = Widget::new("x");
        first.label = Some("shared".into());
        let mut second = Widget::new("y");
        second.label = Some("shared".into());
        let a = store.create(first).await.unwrap();
        store.create(second).await.unwrap();

        let hit = store
            .get_by_field("label", "shared".into())
            .await
            .unwrap();
        assert_eq!(hit.id, a);
    }
}
