// Database CRUD operations
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::db::{DbConnection, DbResult};
use super::models::{Profile, Record};

const RECORD_COLUMNS: &str =
    "id, province_code, province_name, regency_code, regency_name, value, unit, year";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        province_code: row.get(1)?,
        province_name: row.get(2)?,
        regency_code: row.get(3)?,
        regency_name: row.get(4)?,
        value: row.get(5)?,
        unit: row.get(6)?,
        year: row.get(7)?,
    })
}

fn parse_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        s.parse::<DateTime<Utc>>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

// ==================== RECORD QUERIES ====================

/// Insert a record, letting SQLite assign the id when it is 0
pub fn insert_record(db: &DbConnection, record: &Record) -> DbResult<i64> {
    let conn = db.lock()?;
    insert_record_on(&conn, record, false)?;
    Ok(conn.last_insert_rowid())
}

fn insert_record_on(
    conn: &rusqlite::Connection,
    record: &Record,
    replace: bool,
) -> rusqlite::Result<usize> {
    let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
    if record.is_persisted() {
        conn.execute(
            &format!("{verb} INTO records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                record.id,
                record.province_code,
                record.province_name,
                record.regency_code,
                record.regency_name,
                record.value,
                record.unit,
                record.year,
            ],
        )
    } else {
        conn.execute(
            &format!(
                "{verb} INTO records (province_code, province_name, regency_code, regency_name, value, unit, year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                record.province_code,
                record.province_name,
                record.regency_code,
                record.regency_name,
                record.value,
                record.unit,
                record.year,
            ],
        )
    }
}

/// Insert or overwrite a batch of records by id in a single transaction
pub fn upsert_records(db: &DbConnection, records: &[Record]) -> DbResult<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;
    for record in records {
        insert_record_on(&tx, record, true)?;
    }
    tx.commit()?;
    Ok(())
}

/// Overwrite the mutable fields of a record. Returns the number of rows changed.
pub fn update_record(db: &DbConnection, record: &Record) -> DbResult<usize> {
    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE records
         SET regency_code = ?1, regency_name = ?2, value = ?3, unit = ?4, year = ?5
         WHERE id = ?6",
        params![
            record.regency_code,
            record.regency_name,
            record.value,
            record.unit,
            record.year,
            record.id,
        ],
    )?;
    Ok(changed)
}

/// Delete a record. Returns the number of rows removed.
pub fn delete_record(db: &DbConnection, id: i64) -> DbResult<usize> {
    let conn = db.lock()?;
    let removed = conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
    Ok(removed)
}

/// Get a record by ID
pub fn get_record(db: &DbConnection, id: i64) -> DbResult<Option<Record>> {
    let conn = db.lock()?;
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
            [id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// List all records by id
pub fn list_records(db: &DbConnection) -> DbResult<Vec<Record>> {
    let conn = db.lock()?;
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id"))?;
    let records = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn count_records(db: &DbConnection) -> DbResult<i64> {
    let conn = db.lock()?;
    let count = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    Ok(count)
}

// ==================== PROFILE QUERIES ====================

/// Get the profile row if one has been saved
pub fn get_profile(db: &DbConnection) -> DbResult<Option<Profile>> {
    let conn = db.lock()?;
    let profile = conn
        .query_row(
            "SELECT name, student_id, email, age, image, image_sha256, updated_at
             FROM profile WHERE id = 1",
            [],
            |row| {
                Ok(Profile {
                    name: row.get(0)?,
                    student_id: row.get(1)?,
                    email: row.get(2)?,
                    age: row.get(3)?,
                    image: row.get(4)?,
                    image_sha256: row.get(5)?,
                    updated_at: parse_timestamp(6, row.get(6)?)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

/// Create or overwrite the profile row
pub fn save_profile(db: &DbConnection, profile: &Profile) -> DbResult<()> {
    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO profile (id, name, student_id, email, age, image, image_sha256, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            student_id = excluded.student_id,
            email = excluded.email,
            age = excluded.age,
            image = excluded.image,
            image_sha256 = excluded.image_sha256,
            updated_at = excluded.updated_at",
        params![
            profile.name,
            profile.student_id,
            profile.email,
            profile.age,
            profile.image,
            profile.image_sha256,
            profile.updated_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}
