use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::table::{Row, TableFile, TableSchema};

/// An entity that lives in exactly one table file.
pub trait Record: Sized {
    const SCHEMA: &'static TableSchema;

    fn to_row(&self) -> Result<Row>;

    /// Decode one row. The error is a human-readable reason; the store wraps
    /// it into [`StoreError::DataIntegrity`] with the row position.
    fn from_row(row: Row) -> std::result::Result<Self, String>;
}

/// Typed read-all / overwrite-all access to one table.
///
/// The table file sits behind a single mutex, so a whole
/// read-modify-write cycle through [`RecordStore::modify`] is serialized
/// against every other reader and writer in this process.
pub struct RecordStore<T> {
    table: Mutex<TableFile>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RecordStore<T> {
    pub fn open(path: &Path, max_rows: usize) -> Result<Self> {
        let table = TableFile::open(path, T::SCHEMA, max_rows)?;
        Ok(Self {
            table: Mutex::new(table),
            _record: PhantomData,
        })
    }

    pub fn table_name(&self) -> &'static str {
        T::SCHEMA.table
    }

    /// Decode every row. A row that does not decode fails the whole read.
    pub fn read_all(&self) -> Result<Vec<T>> {
        let table = self.lock()?;
        let snapshot = table.read_all()?;
        decode_rows(snapshot.rows)
    }

    /// Overwrite the table with `records`, unconditionally.
    pub fn write_all(&self, records: &[T]) -> Result<()> {
        let mut table = self.lock()?;
        let rows = encode_rows(records)?;
        let version = table.version()?;
        table.write_all(&rows, version)?;
        Ok(())
    }

    /// Read every record, let `f` transform them, and write the result back,
    /// all under the table lock. Nothing is written when `f` fails.
    ///
    /// Fails with [`StoreError::Conflict`] if another process committed to
    /// the file between the read and the write.
    pub fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let mut table = self.lock()?;
        let snapshot = table.read_all()?;
        let mut records = decode_rows(snapshot.rows)?;

        let out = f(&mut records)?;

        let rows = encode_rows(&records)?;
        table.write_all(&rows, snapshot.version)?;
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, TableFile>> {
        self.table
            .lock()
            .map_err(|_| StoreError::LockPoisoned(T::SCHEMA.table))
    }
}

fn decode_rows<T: Record>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            T::from_row(row)
                .map_err(|reason| StoreError::integrity(T::SCHEMA.table, format!("row {idx}: {reason}")))
        })
        .collect()
}

fn encode_rows<T: Record>(records: &[T]) -> Result<Vec<Row>> {
    records.iter().map(Record::to_row).collect()
}
