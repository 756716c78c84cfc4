//! Cell-level encoding between typed fields and flat table rows.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};
use crate::table::{Row, TableSchema};

pub fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub fn display(value: impl Display) -> Value {
    Value::Text(value.to_string())
}

pub fn count(value: u32) -> Value {
    Value::Integer(i64::from(value))
}

pub fn decimal(value: Decimal) -> Value {
    Value::Text(value.to_string())
}

pub fn timestamp(value: &DateTime<Utc>) -> Value {
    Value::Text(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn json<T: Serialize>(schema: &TableSchema, value: &T) -> Result<Value> {
    serde_json::to_string(value)
        .map(Value::Text)
        .map_err(|e| StoreError::integrity(schema.table, format!("cannot encode cell: {e}")))
}

/// Sequential reader over one row, naming the offending column on failure.
pub struct Cells {
    schema: &'static TableSchema,
    cells: std::vec::IntoIter<Value>,
    index: usize,
}

impl Cells {
    pub fn new(schema: &'static TableSchema, row: Row) -> std::result::Result<Self, String> {
        if row.len() != schema.width() {
            return Err(format!(
                "expected {} cells, found {}",
                schema.width(),
                row.len()
            ));
        }
        Ok(Self {
            schema,
            cells: row.into_iter(),
            index: 0,
        })
    }

    fn next(&mut self) -> std::result::Result<(&'static str, Value), String> {
        let name = self
            .schema
            .columns
            .get(self.index)
            .map_or("?", |c| c.name);
        self.index += 1;
        let value = self
            .cells
            .next()
            .ok_or_else(|| format!("column `{name}` is missing"))?;
        Ok((name, value))
    }

    pub fn text(&mut self) -> std::result::Result<String, String> {
        match self.next()? {
            (_, Value::Text(s)) => Ok(s),
            (name, other) => Err(format!(
                "column `{name}`: expected text, found {}",
                kind(&other)
            )),
        }
    }

    pub fn count(&mut self) -> std::result::Result<u32, String> {
        match self.next()? {
            (name, Value::Integer(n)) => {
                u32::try_from(n).map_err(|_| format!("column `{name}`: {n} is out of range"))
            }
            (name, other) => Err(format!(
                "column `{name}`: expected integer, found {}",
                kind(&other)
            )),
        }
    }

    /// Text cell parsed through `FromStr` (ids, enums, decimals, timestamps).
    pub fn parse<T>(&mut self) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let name = self.current_name();
        let raw = self.text()?;
        raw.parse()
            .map_err(|e| format!("column `{name}`: cannot parse {raw:?}: {e}"))
    }

    /// Text cell holding an embedded JSON document.
    pub fn json<T: DeserializeOwned>(&mut self) -> std::result::Result<T, String> {
        let name = self.current_name();
        let raw = self.text()?;
        serde_json::from_str(&raw).map_err(|e| format!("column `{name}`: malformed JSON: {e}"))
    }

    fn current_name(&self) -> &'static str {
        self.schema
            .columns
            .get(self.index)
            .map_or("?", |c| c.name)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}
