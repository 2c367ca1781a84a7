//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "onboarding_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                founder_id TEXT,
                venture_id TEXT,
                folder_structure TEXT,
                current_step TEXT NOT NULL DEFAULT 'founder',
                step_data TEXT NOT NULL DEFAULT '{}',
                completed_steps TEXT NOT NULL DEFAULT '[]',
                is_complete INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_founder ON sessions(founder_id);

            CREATE TABLE IF NOT EXISTS founders (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                role TEXT,
                linkedin_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_founders_email ON founders(email);

            CREATE TABLE IF NOT EXISTS ventures (
                id TEXT PRIMARY KEY,
                founder_id TEXT NOT NULL REFERENCES founders(id),
                name TEXT NOT NULL,
                industry TEXT NOT NULL,
                geography TEXT NOT NULL,
                description TEXT,
                website TEXT,
                proof_score REAL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ventures_founder ON ventures(founder_id);

            CREATE TABLE IF NOT EXISTS team_members (
                id TEXT PRIMARY KEY,
                venture_id TEXT NOT NULL REFERENCES ventures(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                email TEXT,
                linkedin_url TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_team_members_venture ON team_members(venture_id);

            CREATE TABLE IF NOT EXISTS document_uploads (
                id TEXT PRIMARY KEY,
                venture_id TEXT NOT NULL REFERENCES ventures(id) ON DELETE CASCADE,
                session_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                local_path TEXT NOT NULL,
                external_file_id TEXT,
                shared_url TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_uploads_venture ON document_uploads(venture_id);
            CREATE INDEX IF NOT EXISTS idx_uploads_session ON document_uploads(session_id);

            CREATE TABLE IF NOT EXISTS vault_folders (
                venture_id TEXT NOT NULL REFERENCES ventures(id) ON DELETE CASCADE,
                category TEXT NOT NULL,
                folder_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (venture_id, category)
            );
        "#,
    },
    Migration {
        version: 2,
        name: "coach_system",
        sql: r#"
            CREATE TABLE IF NOT EXISTS coach_state (
                founder_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS progress_snapshots (
                founder_id TEXT NOT NULL,
                venture_id TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                computed_at TEXT NOT NULL,
                PRIMARY KEY (founder_id, venture_id)
            );

            CREATE TABLE IF NOT EXISTS client_signals (
                founder_id TEXT PRIMARY KEY,
                dashboard_tutorial_viewed INTEGER NOT NULL DEFAULT 0,
                validation_map_exported INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 3,
        name: "activity_signals",
        sql: r#"
            CREATE TABLE IF NOT EXISTS experiments (
                id TEXT PRIMARY KEY,
                venture_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                completed_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_experiments_venture ON experiments(venture_id);

            CREATE TABLE IF NOT EXISTS deal_room_access (
                founder_id TEXT PRIMARY KEY,
                unlocked INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
        "#,
    },
];

/// Run all pending migrations against the connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            record_version(conn, migration.version, migration.name).await?;
        }
    }

    let version = get_current_version(conn).await?;
    tracing::info!(version, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => {
            let version: i64 = row.get(0).map_err(|e| {
                DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
            })?;
            Ok(version)
        }
        None => Ok(0),
    }
}

/// Insert a version record into `_migrations`.
async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
