use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Схема складских агрегатов; вложенные списки хранятся JSON-колонками
const SCHEMA: &[(&str, &str)] = &[
    (
        "a001_inbound_order",
        r#"
        CREATE TABLE IF NOT EXISTS a001_inbound_order (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            comment TEXT,
            supplier TEXT NOT NULL DEFAULT '',
            received_weight_kg REAL NOT NULL DEFAULT 0,
            state TEXT NOT NULL DEFAULT 'pending',
            classification_limits_json TEXT NOT NULL DEFAULT '[]',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a002_pallet",
        r#"
        CREATE TABLE IF NOT EXISTS a002_pallet (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            comment TEXT,
            status TEXT NOT NULL DEFAULT 'partial',
            customer_order_id TEXT,
            classifications_json TEXT NOT NULL DEFAULT '[]',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a003_customer_order",
        r#"
        CREATE TABLE IF NOT EXISTS a003_customer_order (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            comment TEXT,
            customer TEXT NOT NULL DEFAULT '',
            lines_json TEXT NOT NULL DEFAULT '[]',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
];

/// URL подключения SQLite для файла БД
pub fn sqlite_url(db_file: &Path) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = db_file.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db_url = sqlite_url(db_file);
    tracing::info!("Opening database: {}", db_url);
    let conn = Database::connect(&db_url).await?;

    ensure_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Database connection already initialized"))?;
    Ok(())
}

/// Create missing tables (minimal schema bootstrap)
pub async fn ensure_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    for (table, ddl) in SCHEMA {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            ddl.to_string(),
        ))
        .await?;
        tracing::debug!("Table {} ready", table);
    }
    Ok(())
}

pub fn get_connection() -> anyhow::Result<&'static DatabaseConnection> {
    DB_CONN
        .get()
        .ok_or_else(|| anyhow::anyhow!("Database connection has not been initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_url_forms() {
        assert_eq!(
            sqlite_url(Path::new("/var/lib/packing/app.db")),
            "sqlite:///var/lib/packing/app.db?mode=rwc"
        );
        assert_eq!(
            sqlite_url(Path::new("C:\\data\\app.db")),
            "sqlite:///C:/data/app.db?mode=rwc"
        );
    }
}
