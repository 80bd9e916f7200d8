// SQLite-backed record store
use rusqlite::ErrorCode;

use super::{RecordStore, StoreError, StoreResult};
use crate::state::{queries, DbConnection, DbError, Record};

pub struct SqliteRecordStore {
    db: DbConnection,
}

impl SqliteRecordStore {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn is_constraint_violation(error: &DbError) -> bool {
    matches!(
        error,
        DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
    )
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &Record) -> StoreResult<i64> {
        queries::insert_record(&self.db, record).map_err(|e| {
            if record.is_persisted() && is_constraint_violation(&e) {
                StoreError::Conflict(record.id)
            } else {
                e.into()
            }
        })
    }

    fn insert_all(&self, records: &[Record]) -> StoreResult<()> {
        queries::upsert_records(&self.db, records)?;
        Ok(())
    }

    fn update(&self, record: &Record) -> StoreResult<()> {
        match queries::update_record(&self.db, record)? {
            0 => Err(StoreError::NotFound(record.id)),
            _ => Ok(()),
        }
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        queries::delete_record(&self.db, record.id)?;
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> StoreResult<Option<Record>> {
        Ok(queries::get_record(&self.db, id)?)
    }

    fn get_all(&self) -> StoreResult<Vec<Record>> {
        Ok(queries::list_records(&self.db)?)
    }

    fn count(&self) -> StoreResult<i64> {
        Ok(queries::count_records(&self.db)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{init_db, MigrationOptions};
    use crate::store::tests::sample;
    use tempfile::TempDir;

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = SqliteRecordStore::new(init_db(&path, MigrationOptions::default()).unwrap());
            store.insert(&sample("Bandung", 8.5)).unwrap();
            store
                .insert_all(&[sample("Bogor", 9.0).with_id(20)])
                .unwrap();
        }

        let store = SqliteRecordStore::new(init_db(&path, MigrationOptions::default()).unwrap());
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_by_id(20).unwrap().unwrap().regency_name, "Bogor");
    }

    #[test]
    fn test_failed_batch_leaves_store_untouched() {
        let db = crate::state::init_memory_db().unwrap();
        let store = SqliteRecordStore::new(db.clone());
        store.insert(&sample("Bandung", 8.5)).unwrap();

        // Break the table for the second statement of the batch
        db.lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_bogor BEFORE INSERT ON records
                 WHEN NEW.regency_name = 'Bogor'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let batch = vec![sample("Depok", 1.0).with_id(2), sample("Bogor", 2.0).with_id(3)];
        assert!(store.insert_all(&batch).is_err());
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_by_id(2).unwrap().is_none());
    }
}
