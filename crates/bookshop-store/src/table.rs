use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior, params_from_iter};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// How long a writer waits on another process holding the file lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Integer,
        }
    }
}

/// Fixed column layout of one table. Column order is part of the file
/// format and never changes.
#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    fn quoted_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {} NOT NULL", c.name, c.kind.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", self.table, columns)
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid",
            self.quoted_columns(),
            self.table
        )
    }

    fn insert_sql(&self) -> String {
        let placeholders = (1..=self.width())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            self.quoted_columns(),
            placeholders
        )
    }
}

/// One flat row, cells in schema column order.
pub type Row = Vec<Value>;

/// Every row of a table plus the version token it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub version: i64,
    pub rows: Vec<Row>,
}

/// A single named table stored in its own SQLite file.
///
/// Writes replace the whole table. Each committed write bumps the file's
/// `user_version`, which serves as the compare-and-swap token against
/// writers in other processes.
pub struct TableFile {
    schema: &'static TableSchema,
    max_rows: usize,
    conn: Connection,
}

impl TableFile {
    /// Open the table file, creating parent directories, the file and an
    /// empty table with the fixed header as needed.
    pub fn open(path: &Path, schema: &'static TableSchema, max_rows: usize) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let table = Self {
            schema,
            max_rows,
            conn,
        };
        table.ensure_header()?;

        info!("Table {} opened at {}", schema.table, path.display());
        Ok(table)
    }

    pub fn version(&self) -> Result<i64> {
        read_version(&self.conn)
    }

    /// Read every row in insertion order. An empty table is not an error.
    pub fn read_all(&self) -> Result<TableSnapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let version = read_version(&tx)?;

        let width = self.schema.width();
        let rows = {
            let mut stmt = tx.prepare(&self.schema.select_sql())?;
            stmt.query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?
        };
        tx.commit()?;

        debug!(
            "Read {} rows from {} at version {}",
            rows.len(),
            self.schema.table,
            version
        );
        Ok(TableSnapshot { version, rows })
    }

    /// Replace the whole table with `rows`, provided nobody committed since
    /// `expected_version` was read. Returns the new version.
    pub fn write_all(&mut self, rows: &[Row], expected_version: i64) -> Result<i64> {
        let table = self.schema.table;

        if rows.len() > self.max_rows {
            warn!(
                "Rejected write of {} rows to {} (limit {})",
                rows.len(),
                table,
                self.max_rows
            );
            return Err(StoreError::Capacity {
                table,
                limit: self.max_rows,
            });
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.schema.width())
        {
            return Err(StoreError::integrity(
                table,
                format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    self.schema.width()
                ),
            ));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = read_version(&tx)?;
        if current != expected_version {
            warn!(
                "Write to {} lost the race: read at version {}, file is at {}",
                table, expected_version, current
            );
            return Err(StoreError::Conflict { table });
        }

        tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
        {
            let mut stmt = tx.prepare(&self.schema.insert_sql())?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }

        let next = next_version(current);
        tx.pragma_update(None, "user_version", next)?;
        tx.commit()?;

        debug!("Wrote {} rows to {} (version {})", rows.len(), table, next);
        Ok(next)
    }

    fn ensure_header(&self) -> Result<()> {
        let found: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
            stmt.query_map([self.schema.table], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?
        };

        if found.is_empty() {
            self.conn.execute_batch(&self.schema.create_sql())?;
            info!(
                "Created table {} with columns [{}]",
                self.schema.table,
                self.schema.column_names().join(", ")
            );
            return Ok(());
        }

        let expected = self.schema.column_names();
        if found != expected {
            return Err(StoreError::integrity(
                self.schema.table,
                format!(
                    "column header mismatch: expected [{}], found [{}]",
                    expected.join(", "),
                    found.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

fn read_version(conn: &Connection) -> Result<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// `user_version` is a signed 32-bit header field.
fn next_version(current: i64) -> i64 {
    if current >= i64::from(i32::MAX) {
        1
    } else {
        current + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    static THINGS: TableSchema = TableSchema {
        table: "things",
        columns: &[Column::text("id"), Column::integer("count")],
    };

    fn row(id: &str, count: i64) -> Row {
        vec![Value::Text(id.into()), Value::Integer(count)]
    }

    #[test]
    fn open_creates_missing_directories_and_empty_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data/things.db");

        let table = TableFile::open(&path, &THINGS, 100).unwrap();
        assert!(path.exists());

        let snapshot = table.read_all().unwrap();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.version, 0);
    }

    #[test]
    fn write_all_replaces_contents_and_keeps_order() {
        let dir = TempDir::new().unwrap();
        let mut table = TableFile::open(&dir.path().join("things.db"), &THINGS, 100).unwrap();

        let v1 = table.write_all(&[row("b", 2), row("a", 1)], 0).unwrap();
        let v2 = table.write_all(&[row("c", 3), row("b", 2), row("a", 1)], v1).unwrap();
        assert!(v2 > v1);

        let snapshot = table.read_all().unwrap();
        assert_eq!(snapshot.version, v2);
        assert_eq!(snapshot.rows, vec![row("c", 3), row("b", 2), row("a", 1)]);

        table.write_all(&[], v2).unwrap();
        assert!(table.read_all().unwrap().rows.is_empty());
    }

    #[test]
    fn stale_version_from_another_handle_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("things.db");
        let mut first = TableFile::open(&path, &THINGS, 100).unwrap();
        let mut second = TableFile::open(&path, &THINGS, 100).unwrap();

        let seen_by_first = first.read_all().unwrap();
        let seen_by_second = second.read_all().unwrap();

        second
            .write_all(&[row("from-second", 1)], seen_by_second.version)
            .unwrap();

        let err = first
            .write_all(&[row("from-first", 1)], seen_by_first.version)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { table: "things" }));
        assert!(err.is_retryable());

        // The losing write left nothing behind.
        assert_eq!(first.read_all().unwrap().rows, vec![row("from-second", 1)]);
    }

    #[test]
    fn row_limit_is_enforced_before_writing() {
        let dir = TempDir::new().unwrap();
        let mut table = TableFile::open(&dir.path().join("things.db"), &THINGS, 2).unwrap();

        let err = table
            .write_all(&[row("a", 1), row("b", 2), row("c", 3)], 0)
            .unwrap_err();
        assert!(matches!(err, StoreError::Capacity { limit: 2, .. }));
        assert_eq!(table.version().unwrap(), 0);
    }

    #[test]
    fn reordered_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("things.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE things (count INTEGER NOT NULL, id TEXT NOT NULL)")
                .unwrap();
        }

        let err = TableFile::open(&path, &THINGS, 100).err().unwrap();
        assert!(matches!(err, StoreError::DataIntegrity { table: "things", .. }));
        assert!(err.to_string().contains("column header mismatch"));
    }

    #[test]
    fn short_row_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut table = TableFile::open(&dir.path().join("things.db"), &THINGS, 100).unwrap();

        let err = table
            .write_all(&[vec![Value::Text("a".into())]], 0)
            .unwrap_err();
        assert!(matches!(err, StoreError::DataIntegrity { .. }));
    }
}
