use thiserror::Error;

/// Failure kinds of the record store.
///
/// Only [`StoreError::Conflict`] is worth retrying; every other kind is a
/// final answer for the operation that produced it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not found")]
    NotFound,

    /// The target is missing or belongs to someone else. Callers cannot tell
    /// which.
    #[error("not found or forbidden")]
    NotFoundOrForbidden,

    #[error("forbidden for role {0}")]
    Forbidden(bookshop_types::Role),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("data integrity violation in table {table}: {reason}")]
    DataIntegrity { table: &'static str, reason: String },

    #[error("table {table} was modified concurrently")]
    Conflict { table: &'static str },

    #[error("table {table} is full ({limit} rows)")]
    Capacity { table: &'static str, limit: usize },

    #[error("table {0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub(crate) fn integrity(table: &'static str, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            table,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
