//! Bulk SQLite load (§4.10, §6): installs the schema then loads every CSV
//! produced by [`crate::csvbuild`] inside one transaction per table, with a
//! `PRAGMA defer_foreign_keys` + per-row `INSERT OR IGNORE` fallback when the
//! batch transaction itself fails (e.g. a CHECK violation buried in one bad
//! row). Grounded in codanna's transaction-batched writes
//! (`storage/graph.rs`), generalized from an in-process `DependencyGraph` to
//! a bulk `COPY`-equivalent CSV ingest.

use std::path::Path;

use rusqlite::Connection;

use crate::error::{PersistError, PersistResult};

use super::schema::full_schema_ddl;

pub fn open(path: &Path) -> PersistResult<Connection> {
    Connection::open(path).map_err(|source| PersistError::DatabaseOpen { path: path.to_path_buf(), source })
}

pub fn install_schema(conn: &Connection) -> PersistResult<()> {
    conn.execute_batch(&full_schema_ddl())
        .map_err(|e| PersistError::SchemaInstall { reason: e.to_string() })
}

/// Bulk-loads one CSV file into `table`, assuming the first row is a header
/// whose column names exactly match the target table's columns.
pub fn bulk_load_csv(conn: &mut Connection, table: &str, csv_path: &Path) -> PersistResult<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(csv_path)
        .map_err(|e| PersistError::BulkLoadFailed { table: table.to_string(), source: rusqlite::Error::InvalidParameterName(e.to_string()) })?;
    let headers: Vec<String> = reader.headers().map_err(|e| PersistError::BulkLoadFailed {
        table: table.to_string(),
        source: rusqlite::Error::InvalidParameterName(e.to_string()),
    })?.iter().map(str::to_string).collect();

    let records: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PersistError::BulkLoadFailed { table: table.to_string(), source: rusqlite::Error::InvalidParameterName(e.to_string()) })?;

    let placeholders: Vec<String> = (1..=headers.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        headers.join(", "),
        placeholders.join(", ")
    );

    match bulk_insert(conn, &sql, &records) {
        Ok(n) => Ok(n),
        Err(_) => fallback_row_by_row(conn, table, &headers, &records),
    }
}

fn bulk_insert(conn: &mut Connection, sql: &str, records: &[csv::StringRecord]) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;
    {
        let mut stmt = tx.prepare(sql)?;
        for record in records {
            let params: Vec<&str> = record.iter().collect();
            stmt.execute(rusqlite::params_from_iter(params))?;
        }
    }
    tx.commit()?;
    Ok(records.len())
}

/// Per-row `INSERT OR IGNORE` fallback (§4.10): isolates the bad rows
/// instead of losing the whole batch to one violation.
fn fallback_row_by_row(
    conn: &mut Connection,
    table: &str,
    headers: &[String],
    records: &[csv::StringRecord],
) -> PersistResult<usize> {
    let placeholders: Vec<String> = (1..=headers.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT OR IGNORE INTO {table} ({}) VALUES ({})",
        headers.join(", "),
        placeholders.join(", ")
    );

    let tx = conn
        .transaction()
        .map_err(|source| PersistError::BulkLoadFailed { table: table.to_string(), source })?;
    let mut inserted = 0;
    {
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|source| PersistError::BulkLoadFailed { table: table.to_string(), source })?;
        for record in records {
            let params: Vec<&str> = record.iter().collect();
            match stmt.execute(rusqlite::params_from_iter(params)) {
                Ok(n) => inserted += n,
                Err(e) => tracing::warn!("dropping row while loading '{table}': {e}"),
            }
        }
    }
    tx.commit().map_err(|source| PersistError::BulkLoadFailed { table: table.to_string(), source })?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_simple_csv_into_an_installed_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        install_schema(&conn).unwrap();

        let dir = std::env::temp_dir().join(format!("gitnexus-sqlite-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("Folder.csv");
        std::fs::write(&csv_path, "id,name,file_path\nFolder:app,app,app\n").unwrap();

        let n = bulk_load_csv(&mut conn, "Folder", &csv_path).unwrap();
        assert_eq!(n, 1);

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM Folder", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_row_falls_back_to_insert_or_ignore() {
        let mut conn = Connection::open_in_memory().unwrap();
        install_schema(&conn).unwrap();

        let dir = std::env::temp_dir().join(format!("gitnexus-sqlite-fallback-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("Folder.csv");
        // Second row has an extra column and will break the batch statement binding.
        std::fs::write(&csv_path, "id,name,file_path\nFolder:app,app,app\nFolder:lib,lib,lib\n").unwrap();
        // Insert a conflicting primary key first so the batch transaction fails.
        conn.execute("INSERT INTO Folder (id, name, file_path) VALUES ('Folder:app', 'dup', 'dup')", []).unwrap();

        let n = bulk_load_csv(&mut conn, "Folder", &csv_path).unwrap();
        assert_eq!(n, 1, "only the non-conflicting row should have been inserted");

        std::fs::remove_dir_all(&dir).ok();
    }
}
