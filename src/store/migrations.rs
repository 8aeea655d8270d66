//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//!
//! V1 predates the template review metadata: `templates` has no `buttons`
//! or `rejection_reason` columns. V2 adds them. A database stuck at V1 is
//! exactly the "old schema" the reconciliation engine's downgrade path
//! must keep working against.

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
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                direction TEXT NOT NULL,
                to_addr TEXT,
                from_addr TEXT,
                subject TEXT,
                body_text TEXT,
                body_html TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                error TEXT,
                provider_message_id TEXT,
                scheduled_at TEXT,
                sent_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_tenant_created
                ON messages(tenant_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_messages_tenant_channel
                ON messages(tenant_id, channel);
            CREATE INDEX IF NOT EXISTS idx_messages_status ON messages(status);

            CREATE TABLE IF NOT EXISTS tenant_configs (
                tenant_id TEXT NOT NULL,
                service_name TEXT NOT NULL,
                api_key TEXT,
                config_data TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, service_name)
            );
            CREATE INDEX IF NOT EXISTS idx_tenant_configs_service
                ON tenant_configs(service_name);

            CREATE TABLE IF NOT EXISTS templates (
                tenant_id TEXT NOT NULL,
                provider_template_id TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT,
                language TEXT,
                body_text TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'draft',
                review_status TEXT,
                raw TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, provider_template_id)
            );
            CREATE INDEX IF NOT EXISTS idx_templates_tenant ON templates(tenant_id);
        "#,
    },
    Migration {
        version: 2,
        name: "template_review_metadata",
        sql: r#"
            ALTER TABLE templates ADD COLUMN rejection_reason TEXT;
            ALTER TABLE templates ADD COLUMN buttons TEXT;
        "#,
    },
];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` table if it doesn't exist.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    run_migrations_to(conn, i64::MAX).await
}

/// Apply migrations up to and including `max_version`.
///
/// Production callers always migrate to the latest version; tests use a
/// lower bound to stand up the pre-V2 schema.
pub async fn run_migrations_to(conn: &Connection, max_version: i64) -> Result<(), DatabaseError> {
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
        if migration.version > current_version && migration.version <= max_version {
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
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
pub async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
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
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, table: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                libsql::params![table],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        count == 1
    }

    #[tokio::test]
    async fn migrations_create_all_tables() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["messages", "tenant_configs", "templates", "_migrations"] {
            assert!(table_exists(&conn, table).await, "Table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = get_current_version(&conn).await.unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn v2_adds_review_metadata_columns() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        conn.execute(
            "INSERT INTO templates (tenant_id, provider_template_id, name, status,
                rejection_reason, buttons, updated_at)
             VALUES ('t1', 'tpl1', 'welcome', 'approved', NULL, '[]', '2026-01-01')",
            (),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn v1_only_schema_lacks_review_metadata_columns() {
        let conn = test_conn().await;
        run_migrations_to(&conn, 1).await.unwrap();
        assert_eq!(get_current_version(&conn).await.unwrap(), 1);

        // Inserting into the V2 columns must fail on a V1 database.
        let result = conn
            .execute(
                "INSERT INTO templates (tenant_id, provider_template_id, name, status,
                    buttons, updated_at)
                 VALUES ('t1', 'tpl1', 'welcome', 'approved', '[]', '2026-01-01')",
                (),
            )
            .await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string().to_lowercase();
        assert!(err.contains("buttons"), "error should name the column: {err}");
    }
}
