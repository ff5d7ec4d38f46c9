use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

use crate::config::AppConfig;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".report-instance-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "reports.sqlite";

/// Ensure the database file exists, run lazy migrations, and return a live
/// connection. The function also toggles `PRAGMA foreign_keys = ON` so the
/// referential integrity checks in our schema behave the same during tests and
/// production runs.
pub fn ensure_schema(config: &AppConfig) -> Result<Connection> {
    let db_path = db_path(config)?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    prepare_connection(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema and seed catalogues. Tests lean on
/// this, and it keeps demo runs from touching the real data directory.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare_connection(&conn)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    apply_schema(conn)?;
    seed_catalogs(conn)?;
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS navigation (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            parent_id INTEGER REFERENCES navigation(id) ON DELETE CASCADE,
            url TEXT,
            permission TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            weight INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .context("failed to create navigation table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS report_instances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            report_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            email_subject TEXT,
            email_to TEXT,
            email_cc TEXT,
            header TEXT,
            footer TEXT,
            row_count INTEGER,
            cache_minutes INTEGER NOT NULL DEFAULT 60,
            is_dashboard INTEGER NOT NULL DEFAULT 0,
            is_reserved INTEGER NOT NULL DEFAULT 0,
            permission TEXT,
            grouprole TEXT,
            navigation_id INTEGER REFERENCES navigation(id) ON DELETE SET NULL,
            drilldown_id INTEGER,
            owner_id INTEGER,
            form_values TEXT
        )",
        [],
    )
    .context("failed to create report_instances table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS permissions (
            key TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            grp TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )
    .context("failed to create permissions table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS roles (
            name TEXT PRIMARY KEY,
            label TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create roles table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create meta table")?;

    Ok(())
}

/// Seed the permission and role catalogues plus the root menu entries. Uses
/// `INSERT OR IGNORE` so repeated startups stay idempotent and site-specific
/// additions survive.
fn seed_catalogs(conn: &Connection) -> Result<()> {
    let permissions: &[(&str, &str, &str, i64)] = &[
        ("access reports", "Access published reports", "reporting", 1),
        ("administer reports", "Administer saved reports", "reporting", 1),
        (
            "administer reserved reports",
            "Administer reserved reports",
            "reporting",
            1,
        ),
        ("view own reports", "View my reports list", "reporting", 1),
        ("access cms content", "Access site content", "cms", 1),
        ("edit billing plans", "Edit billing plans", "billing", 1),
        (
            "export report data",
            "Export report data (legacy)",
            "reporting",
            0,
        ),
    ];
    for (key, label, grp, is_active) in permissions {
        conn.execute(
            "INSERT OR IGNORE INTO permissions (key, label, grp, is_active)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![key, label, grp, is_active],
        )
        .context("failed to seed permissions")?;
    }

    let roles: &[(&str, &str)] = &[
        ("administrator", "Administrator"),
        ("editor", "Editor"),
        ("authenticated", "Authenticated User"),
    ];
    for (name, label) in roles {
        conn.execute(
            "INSERT OR IGNORE INTO roles (name, label) VALUES (?1, ?2)",
            rusqlite::params![name, label],
        )
        .context("failed to seed roles")?;
    }

    let menu_roots = conn
        .query_row("SELECT COUNT(*) FROM navigation", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("failed to count navigation entries")?;
    if menu_roots == 0 {
        conn.execute(
            "INSERT INTO navigation (label, parent_id, url, permission, is_active, weight)
             VALUES ('Reports', NULL, NULL, 'access reports', 1, 0)",
            [],
        )
        .context("failed to seed navigation roots")?;
        conn.execute(
            "INSERT INTO navigation (label, parent_id, url, permission, is_active, weight)
             VALUES ('Administer', NULL, NULL, 'administer reports', 1, 10)",
            [],
        )
        .context("failed to seed navigation roots")?;
    }

    Ok(())
}

/// Resolve the application data directory, honouring a configured override
/// before falling back to the user's home. Log files live next to the
/// database, so `main` uses this too.
pub fn data_root(config: &AppConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.data_dir {
        return Ok(dir.clone());
    }
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Absolute path to the SQLite database file.
fn db_path(config: &AppConfig) -> Result<PathBuf> {
    Ok(data_root(config)?.join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_and_seeds_apply_twice_without_error() {
        let conn = open_in_memory().unwrap();
        prepare_connection(&conn).unwrap();

        let roots: i64 = conn
            .query_row("SELECT COUNT(*) FROM navigation WHERE parent_id IS NULL", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(roots, 2);
    }

    #[test]
    fn ensure_schema_honours_data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path().to_path_buf());
        let conn = ensure_schema(&config).unwrap();
        conn.execute("INSERT INTO roles (name, label) VALUES ('scout', 'Scout')", [])
            .unwrap();
        assert!(dir.path().join(DB_FILE_NAME).exists());
    }
}
