// In-memory record store for tests and ephemeral sessions
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{RecordStore, StoreError, StoreResult};
use crate::state::Record;

#[derive(Default)]
struct MemoryState {
    // Next id handed out for unpersisted records. Never reused, like
    // SQLite AUTOINCREMENT.
    next_id: i64,
    records: BTreeMap<i64, Record>,
}

impl MemoryState {
    fn place(&mut self, record: &Record) -> i64 {
        let id = if record.is_persisted() {
            record.id
        } else {
            self.next_id.max(1)
        };
        self.next_id = self.next_id.max(id + 1);
        self.records.insert(id, record.clone().with_id(id));
        id
    }
}

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: &Record) -> StoreResult<i64> {
        let mut state = self.write()?;
        if record.is_persisted() && state.records.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id));
        }
        Ok(state.place(record))
    }

    fn insert_all(&self, records: &[Record]) -> StoreResult<()> {
        // One write guard for the whole batch keeps readers from seeing half of it
        let mut state = self.write()?;
        for record in records {
            state.place(record);
        }
        Ok(())
    }

    fn update(&self, record: &Record) -> StoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .records
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        stored.regency_code = record.regency_code;
        stored.regency_name = record.regency_name.clone();
        stored.value = record.value;
        stored.unit = record.unit.clone();
        stored.year = record.year;
        Ok(())
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        self.write()?.records.remove(&record.id);
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> StoreResult<Option<Record>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    fn get_all(&self) -> StoreResult<Vec<Record>> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    fn count(&self) -> StoreResult<i64> {
        Ok(self.read()?.records.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample;
    use std::thread;

    #[test]
    fn test_concurrent_inserts_get_unique_ids() {
        let store = MemoryRecordStore::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|i| store.insert(&sample("Cirebon", (t * 100 + i) as f64)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 200);
        assert_eq!(store.count().unwrap(), 200);
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryRecordStore::new();
        let other = store.clone();
        store.insert(&sample("Indramayu", 6.5)).unwrap();
        assert_eq!(other.count().unwrap(), 1);
    }
}
