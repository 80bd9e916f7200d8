// SQLite database setup and migrations
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Schema version this build knows how to produce
pub const SCHEMA_VERSION: i64 = 3;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

// Thread-safe database connection wrapper
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Drop and rebuild every table when the stored schema cannot be
    /// migrated forward. Loses all local data.
    pub destructive_fallback: bool,
}

/// Open (or create) the database file and bring its schema up to date
pub fn init_db(db_path: &Path, options: MigrationOptions) -> DbResult<DbConnection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    run_migrations(&conn, options)?;
    log::info!("Database ready at {}", db_path.display());

    Ok(DbConnection::new(conn))
}

/// In-memory database with the current schema, for tests and ephemeral sessions
pub fn init_memory_db() -> DbResult<DbConnection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn, MigrationOptions::default())?;
    Ok(DbConnection::new(conn))
}

struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Connection) -> DbResult<()>,
}

// Forward-only, additive steps. Never edit a released entry, append a new one.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create records and profile tables",
        apply: migration_v1,
    },
    Migration {
        version: 2,
        description: "add profile age",
        apply: migration_v2,
    },
    Migration {
        version: 3,
        description: "add profile image",
        apply: migration_v3,
    },
];

pub(crate) fn run_migrations(conn: &Connection, options: MigrationOptions) -> DbResult<()> {
    match migrate_forward(conn) {
        Ok(()) => Ok(()),
        Err(e) if options.destructive_fallback => {
            log::warn!("Schema migration failed ({}), rebuilding database from scratch", e);
            reset_schema(conn)?;
            migrate_forward(conn)
        }
        Err(e) => Err(e),
    }
}

/// Version recorded in `schema_migrations`, 0 for a fresh database
pub fn current_version(conn: &Connection) -> DbResult<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn migrate_forward(conn: &Connection) -> DbResult<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current = current_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current, SCHEMA_VERSION
        )));
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        log::info!(
            "Migrating database to v{}: {}",
            migration.version,
            migration.description
        );
        let tx = conn.unchecked_transaction()?;
        (migration.apply)(&tx).map_err(|e| {
            DbError::Migration(format!("v{} ({}): {}", migration.version, migration.description, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [migration.version],
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn reset_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS records;
         DROP TABLE IF EXISTS profile;
         DROP TABLE IF EXISTS schema_migrations;",
    )?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> DbResult<()> {
    if !has_column(conn, table, column)? {
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
            [],
        )?;
    }
    Ok(())
}

fn migration_v1(conn: &Connection) -> DbResult<()> {
    // Regional statistic records
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            province_code INTEGER NOT NULL,
            province_name TEXT NOT NULL,
            regency_code INTEGER NOT NULL,
            regency_name TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT NOT NULL,
            year INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_year ON records(year DESC)",
        [],
    )?;

    // Singleton profile row
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profile (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            name TEXT NOT NULL,
            student_id TEXT NOT NULL,
            email TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(())
}

fn migration_v2(conn: &Connection) -> DbResult<()> {
    add_column_if_missing(conn, "profile", "age", "INTEGER NOT NULL DEFAULT 0")
}

fn migration_v3(conn: &Connection) -> DbResult<()> {
    add_column_if_missing(conn, "profile", "image", "BLOB")?;
    add_column_if_missing(conn, "profile", "image_sha256", "TEXT")
}
