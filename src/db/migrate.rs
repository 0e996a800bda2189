use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, RagctxError};

/// One `NNN_name.sql` file
struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(RagctxError::Database)?;
    Ok(names)
}

fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut files: Vec<_> = fs::read_dir(migrations_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();
    files.sort();

    let mut migrations = Vec::with_capacity(files.len());
    for path in files {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RagctxError::Config("Invalid migration filename".to_string()))?;

        // "001_document_graph.sql" -> 1
        let version_str = filename.split('_').next().unwrap_or_default();
        let version: u32 = version_str.parse().map_err(|_| {
            RagctxError::Config(format!("Invalid migration version in {}", filename))
        })?;

        migrations.push(Migration {
            version,
            name: filename.trim_end_matches(".sql").to_string(),
            sql: fs::read_to_string(&path)?,
        });
    }

    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

/// Apply every migration in `migrations_dir` not yet recorded, each in its
/// own transaction
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;
    let migrations = load_migrations(migrations_dir)?;

    for migration in migrations {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql).map_err(|e| {
            RagctxError::Config(format!("Failed to execute migration {}: {}", migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    log::info!("All migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_migrations() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    }

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap()
    }

    #[test]
    fn test_load_migrations_sorted_by_version() {
        let temp_dir = TempDir::new().unwrap();
        let migrations_dir = temp_dir.path().join("migrations");
        fs::create_dir(&migrations_dir).unwrap();
        fs::write(migrations_dir.join("002_another.sql"), "CREATE TABLE another (id INTEGER);").unwrap();
        fs::write(migrations_dir.join("001_test.sql"), "CREATE TABLE test (id INTEGER);").unwrap();
        fs::write(migrations_dir.join("README.md"), "not a migration").unwrap();

        let migrations = load_migrations(&migrations_dir).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[1].name, "002_another");
    }

    #[test]
    fn test_bad_version_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("first_table.sql"), "SELECT 1;").unwrap();
        assert!(matches!(load_migrations(temp_dir.path()), Err(RagctxError::Config(_))));
    }

    #[test]
    fn test_full_migration_schema() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        run_migrations(&mut conn, &repo_migrations()).unwrap();

        let tables = names(&conn, "table");
        for table in ["document_nodes", "document_relationships", "vector_chunks", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
        let indexes = names(&conn, "index");
        assert!(indexes.contains(&"idx_relationships_from".to_string()));
        assert!(indexes.contains(&"idx_vector_chunks_document_index".to_string()));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        run_migrations(&mut conn, &repo_migrations()).unwrap();
        run_migrations(&mut conn, &repo_migrations()).unwrap();

        let applied = get_applied_migrations(&conn).unwrap();
        assert_eq!(applied, vec!["001_document_graph", "002_vector_chunks"]);
    }
}
