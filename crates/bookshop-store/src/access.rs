//! Role and ownership rules applied on behalf of a verified caller.
//!
//! Admins manage only the books they own and see only those in listings.
//! Customers browse the full catalog. Everyone sees only their own orders.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use bookshop_types::{
    Book, BookPatch, Identity, NewBook, Order, OrderDetail, OrderItem, Role,
};

use crate::catalog::CatalogStore;
use crate::error::{Result, StoreError};
use crate::orders::OrderLedger;

pub struct AccessGuard {
    catalog: Arc<CatalogStore>,
    orders: Arc<OrderLedger>,
}

impl AccessGuard {
    pub fn new(catalog: Arc<CatalogStore>, orders: Arc<OrderLedger>) -> Self {
        Self { catalog, orders }
    }

    pub fn list_books(&self, caller: &Identity) -> Result<Vec<Book>> {
        let books = self.catalog.list_all()?;
        Ok(match caller.role {
            Role::Admin => books
                .into_iter()
                .filter(|b| b.owner_id == caller.user_id)
                .collect(),
            Role::Customer => books,
        })
    }

    /// A book the caller cannot see in listings is reported as missing.
    pub fn get_book(&self, caller: &Identity, id: Uuid) -> Result<Book> {
        self.catalog
            .get(id)?
            .filter(|b| !caller.is_admin() || b.owner_id == caller.user_id)
            .ok_or(StoreError::NotFound)
    }

    pub fn create_book(&self, caller: &Identity, new_book: NewBook) -> Result<Book> {
        require_admin(caller, "create a book")?;
        self.catalog.add(new_book, caller.user_id)
    }

    pub fn update_book(&self, caller: &Identity, id: Uuid, patch: BookPatch) -> Result<Book> {
        require_admin(caller, "update a book")?;
        self.catalog.update_owned(id, caller.user_id, patch)
    }

    pub fn delete_book(&self, caller: &Identity, id: Uuid) -> Result<()> {
        require_admin(caller, "delete a book")?;
        self.catalog.delete_owned(id, caller.user_id)
    }

    pub fn create_order(&self, caller: &Identity, items: Vec<OrderItem>) -> Result<Order> {
        self.orders.create(caller.user_id, items)
    }

    pub fn list_orders(&self, caller: &Identity) -> Result<Vec<Order>> {
        self.orders.list_by_user(caller.user_id)
    }

    pub fn list_order_details(&self, caller: &Identity) -> Result<Vec<OrderDetail>> {
        self.orders.list_details_by_user(caller.user_id)
    }
}

fn require_admin(caller: &Identity, action: &str) -> Result<()> {
    if caller.is_admin() {
        return Ok(());
    }
    warn!("{} ({}) tried to {}", caller.email, caller.role, action);
    Err(StoreError::Forbidden(caller.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshop_types::Genre;
    use crate::store::RecordStore;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        guard: AccessGuard,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(CatalogStore::new(
            RecordStore::open(&dir.path().join("books.db"), 1000).unwrap(),
        ));
        let orders = Arc::new(OrderLedger::new(
            RecordStore::open(&dir.path().join("orders.db"), 1000).unwrap(),
            catalog.clone(),
        ));
        Fixture {
            _dir: dir,
            guard: AccessGuard::new(catalog, orders),
        }
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: format!("{role}@example.ch"),
            role,
        }
    }

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.into(),
            author: "Author".into(),
            price: "9.90".parse().unwrap(),
            genre: Genre::Fantasy,
            page_count: 300,
            stock: 2,
            image_url: String::new(),
        }
    }

    #[test]
    fn admins_see_own_books_customers_see_all() {
        let f = fixture();
        let a1 = identity(Role::Admin);
        let a2 = identity(Role::Admin);
        let customer = identity(Role::Customer);

        let mine = f.guard.create_book(&a1, new_book("Mine")).unwrap();
        let theirs = f.guard.create_book(&a2, new_book("Theirs")).unwrap();

        assert_eq!(mine.owner_id, a1.user_id);
        assert_eq!(f.guard.list_books(&a1).unwrap(), vec![mine.clone()]);
        assert_eq!(
            f.guard.list_books(&customer).unwrap(),
            vec![mine.clone(), theirs.clone()]
        );

        assert_eq!(f.guard.get_book(&customer, theirs.id).unwrap(), theirs);
        assert!(matches!(
            f.guard.get_book(&a1, theirs.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn customers_cannot_manage_books() {
        let f = fixture();
        let admin = identity(Role::Admin);
        let customer = identity(Role::Customer);
        let book = f.guard.create_book(&admin, new_book("Kept")).unwrap();

        assert!(matches!(
            f.guard.create_book(&customer, new_book("Nope")),
            Err(StoreError::Forbidden(Role::Customer))
        ));
        assert!(matches!(
            f.guard.update_book(&customer, book.id, BookPatch::default()),
            Err(StoreError::Forbidden(Role::Customer))
        ));
        assert!(matches!(
            f.guard.delete_book(&customer, book.id),
            Err(StoreError::Forbidden(Role::Customer))
        ));
        assert_eq!(f.guard.list_books(&customer).unwrap(), vec![book]);
    }

    #[test]
    fn admins_cannot_touch_foreign_books() {
        let f = fixture();
        let owner = identity(Role::Admin);
        let other = identity(Role::Admin);
        let book = f.guard.create_book(&owner, new_book("Owned")).unwrap();

        let patch = BookPatch {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            f.guard.update_book(&other, book.id, patch),
            Err(StoreError::NotFoundOrForbidden)
        ));
        assert!(matches!(
            f.guard.delete_book(&other, book.id),
            Err(StoreError::NotFoundOrForbidden)
        ));
        assert_eq!(f.guard.get_book(&owner, book.id).unwrap().title, "Owned");
    }

    #[test]
    fn orders_are_scoped_to_the_caller() {
        let f = fixture();
        let admin = identity(Role::Admin);
        let alice = identity(Role::Customer);
        let bob = identity(Role::Customer);
        let book = f.guard.create_book(&admin, new_book("Shared")).unwrap();

        let order = f
            .guard
            .create_order(
                &alice,
                vec![OrderItem {
                    book_id: book.id,
                    quantity: 1,
                }],
            )
            .unwrap();

        assert_eq!(order.user_id, alice.user_id);
        assert_eq!(f.guard.list_orders(&alice).unwrap(), vec![order]);
        assert!(f.guard.list_orders(&bob).unwrap().is_empty());
        assert!(f.guard.list_order_details(&bob).unwrap().is_empty());
    }
}
