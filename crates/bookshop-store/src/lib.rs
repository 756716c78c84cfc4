pub mod access;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod models;
pub mod orders;
pub mod password;
pub mod schema;
pub mod store;
pub mod table;
pub mod users;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

pub use access::AccessGuard;
pub use catalog::CatalogStore;
pub use error::{Result, StoreError};
pub use orders::OrderLedger;
pub use store::{Record, RecordStore};
pub use users::UserDirectory;

pub const DEFAULT_MAX_ROWS: usize = 100_000;

/// Where the table files live and how large each table may grow.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub max_rows: usize,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.db")
    }

    pub fn books_path(&self) -> PathBuf {
        self.data_dir.join("books.db")
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join("orders.db")
    }
}

/// The three tables wired together.
pub struct Bookshop {
    users: UserDirectory,
    catalog: Arc<CatalogStore>,
    orders: Arc<OrderLedger>,
    guard: AccessGuard,
}

impl Bookshop {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let users = UserDirectory::new(RecordStore::open(&config.users_path(), config.max_rows)?);
        let catalog = Arc::new(CatalogStore::new(RecordStore::open(
            &config.books_path(),
            config.max_rows,
        )?));
        let orders = Arc::new(OrderLedger::new(
            RecordStore::open(&config.orders_path(), config.max_rows)?,
            catalog.clone(),
        ));
        let guard = AccessGuard::new(catalog.clone(), orders.clone());

        info!("Bookshop tables opened in {}", config.data_dir.display());
        Ok(Self {
            users,
            catalog,
            orders,
            guard,
        })
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderLedger {
        &self.orders
    }

    /// Role- and ownership-checked access for request handlers.
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }
}
