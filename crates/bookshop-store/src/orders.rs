use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use bookshop_types::{Book, BookSummary, Order, OrderDetail, OrderItem, OrderLine, OrderStatus};

use crate::catalog::CatalogStore;
use crate::error::{Result, StoreError};
use crate::store::RecordStore;

/// Order creation and per-user order history.
///
/// Totals are computed from the book table as it stands when the order is
/// created and are never recomputed afterwards.
pub struct OrderLedger {
    store: RecordStore<Order>,
    catalog: Arc<CatalogStore>,
}

impl OrderLedger {
    pub fn new(store: RecordStore<Order>, catalog: Arc<CatalogStore>) -> Self {
        Self { store, catalog }
    }

    pub fn create(&self, user_id: Uuid, items: Vec<OrderItem>) -> Result<Order> {
        if items.is_empty() {
            return Err(StoreError::InvalidInput("order has no items".into()));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(StoreError::InvalidInput(format!(
                "quantity for book {} must be at least 1",
                item.book_id
            )));
        }

        let prices = self.price_list()?;
        let total_amount = items.iter().try_fold(Decimal::ZERO, |total, item| {
            let Some(price) = prices.get(&item.book_id) else {
                warn!(
                    "Order by {} references unknown book {}; counted as 0",
                    user_id, item.book_id
                );
                return Ok(total);
            };
            price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| {
                    StoreError::InvalidInput("order total is out of range".into())
                })
        })?;

        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            items,
            total_amount,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
        };
        let created = order.clone();
        self.store.modify(move |orders| {
            orders.push(order);
            Ok(())
        })?;

        info!(
            "Order {} created by {} ({} items, total {})",
            created.id,
            user_id,
            created.items.len(),
            created.total_amount
        );
        Ok(created)
    }

    pub fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        Ok(self
            .store
            .read_all()?
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect())
    }

    /// The user's orders with every line joined against the current catalog.
    /// A line whose book is gone carries `book: None`. A line total that does
    /// not fit a `Decimal` at today's price is `None`.
    pub fn list_details_by_user(&self, user_id: Uuid) -> Result<Vec<OrderDetail>> {
        let orders = self.list_by_user(user_id)?;
        let books: HashMap<Uuid, Book> = self
            .catalog
            .list_all()?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = order
                    .items
                    .iter()
                    .map(|item| line(item, books.get(&item.book_id)))
                    .collect();
                OrderDetail { order, lines }
            })
            .collect())
    }

    fn price_list(&self) -> Result<HashMap<Uuid, Decimal>> {
        Ok(self
            .catalog
            .list_all()?
            .into_iter()
            .map(|b| (b.id, b.price))
            .collect())
    }
}

fn line(item: &OrderItem, book: Option<&Book>) -> OrderLine {
    OrderLine {
        book_id: item.book_id,
        quantity: item.quantity,
        line_total: book.and_then(|b| b.price.checked_mul(Decimal::from(item.quantity))),
        book: book.map(|b| BookSummary {
            title: b.title.clone(),
            author: b.author.clone(),
            price: b.price,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshop_types::{BookPatch, Genre, NewBook};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        catalog: Arc<CatalogStore>,
        ledger: OrderLedger,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(CatalogStore::new(
            RecordStore::open(&dir.path().join("books.db"), 1000).unwrap(),
        ));
        let ledger = OrderLedger::new(
            RecordStore::open(&dir.path().join("orders.db"), 1000).unwrap(),
            catalog.clone(),
        );
        Fixture {
            _dir: dir,
            catalog,
            ledger,
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn add_book(catalog: &CatalogStore, title: &str, price: &str) -> Book {
        catalog
            .add(
                NewBook {
                    title: title.into(),
                    author: "Author".into(),
                    price: dec(price),
                    genre: Genre::NonFiction,
                    page_count: 200,
                    stock: 10,
                    image_url: String::new(),
                },
                Uuid::new_v4(),
            )
            .unwrap()
    }

    fn item(book_id: Uuid, quantity: u32) -> OrderItem {
        OrderItem { book_id, quantity }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let f = fixture();
        let a = add_book(&f.catalog, "A", "10.00");
        let b = add_book(&f.catalog, "B", "5.50");
        let user = Uuid::new_v4();

        let order = f
            .ledger
            .create(user, vec![item(a.id, 2), item(b.id, 3)])
            .unwrap();

        assert_eq!(order.total_amount, dec("36.50"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(f.ledger.list_by_user(user).unwrap(), vec![order]);
    }

    #[test]
    fn unknown_book_counts_as_zero() {
        let f = fixture();
        let a = add_book(&f.catalog, "A", "10.00");

        let order = f
            .ledger
            .create(Uuid::new_v4(), vec![item(a.id, 1), item(Uuid::new_v4(), 4)])
            .unwrap();

        assert_eq!(order.total_amount, dec("10.00"));
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn later_price_change_does_not_touch_stored_total() {
        let f = fixture();
        let a = add_book(&f.catalog, "A", "10.00");
        let user = Uuid::new_v4();
        f.ledger.create(user, vec![item(a.id, 1)]).unwrap();

        f.catalog
            .update(
                a.id,
                BookPatch {
                    price: Some(dec("99.00")),
                    ..Default::default()
                },
            )
            .unwrap();

        let orders = f.ledger.list_by_user(user).unwrap();
        assert_eq!(orders[0].total_amount, dec("10.00"));
    }

    #[test]
    fn empty_or_zero_quantity_orders_are_rejected() {
        let f = fixture();
        let a = add_book(&f.catalog, "A", "10.00");
        let user = Uuid::new_v4();

        assert!(matches!(
            f.ledger.create(user, Vec::new()),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            f.ledger.create(user, vec![item(a.id, 0)]),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(f.ledger.list_by_user(user).unwrap().is_empty());
    }

    #[test]
    fn history_is_scoped_to_user_and_keeps_order() {
        let f = fixture();
        let a = add_book(&f.catalog, "A", "1.00");
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = f.ledger.create(alice, vec![item(a.id, 1)]).unwrap();
        f.ledger.create(bob, vec![item(a.id, 1)]).unwrap();
        let second = f.ledger.create(alice, vec![item(a.id, 2)]).unwrap();

        assert_eq!(f.ledger.list_by_user(alice).unwrap(), vec![first, second]);
        assert!(f.ledger.list_by_user(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn details_mark_deleted_books_as_missing() {
        let f = fixture();
        let kept = add_book(&f.catalog, "Kept", "4.00");
        let gone = add_book(&f.catalog, "Gone", "7.00");
        let user = Uuid::new_v4();
        f.ledger
            .create(user, vec![item(kept.id, 3), item(gone.id, 1)])
            .unwrap();

        f.catalog.delete(gone.id).unwrap();

        let details = f.ledger.list_details_by_user(user).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].order.total_amount, dec("19.00"));

        let lines = &details[0].lines;
        assert_eq!(lines[0].book.as_ref().unwrap().title, "Kept");
        assert_eq!(lines[0].line_total, Some(dec("12.00")));
        assert_eq!(lines[1].book_id, gone.id);
        assert_eq!(lines[1].book, None);
        assert_eq!(lines[1].line_total, None);
    }

    /// Reprice a book behind the catalog's back, the way an out-of-band edit
    /// of the table file would.
    fn reprice_on_disk(f: &Fixture, id: Uuid, price: &str) {
        let raw = RecordStore::<Book>::open(&f._dir.path().join("books.db"), 1000).unwrap();
        let mut books = raw.read_all().unwrap();
        for book in books.iter_mut().filter(|b| b.id == id) {
            book.price = dec(price);
        }
        raw.write_all(&books).unwrap();
    }

    #[test]
    fn overflowing_total_is_rejected_not_stored() {
        let f = fixture();
        let book = add_book(&f.catalog, "Pricey", "1.00");
        reprice_on_disk(&f, book.id, "100000000000000000000");
        let user = Uuid::new_v4();

        let err = f
            .ledger
            .create(user, vec![item(book.id, u32::MAX)])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)), "{err:?}");
        assert!(f.ledger.list_by_user(user).unwrap().is_empty());
    }

    #[test]
    fn price_rise_after_large_order_keeps_history_readable() {
        let f = fixture();
        let book = add_book(&f.catalog, "Bulk", "1");
        let user = Uuid::new_v4();
        let order = f
            .ledger
            .create(user, vec![item(book.id, u32::MAX)])
            .unwrap();
        assert_eq!(order.total_amount, Decimal::from(u32::MAX));

        // The catalog refuses such a price; only a direct edit gets it in.
        let patch = BookPatch {
            price: Some(dec("100000000000000000000")),
            ..Default::default()
        };
        assert!(matches!(
            f.catalog.update(book.id, patch),
            Err(StoreError::InvalidInput(_))
        ));
        reprice_on_disk(&f, book.id, "100000000000000000000");

        let details = f.ledger.list_details_by_user(user).unwrap();
        let line = &details[0].lines[0];
        assert_eq!(line.book.as_ref().unwrap().price, dec("100000000000000000000"));
        assert_eq!(line.line_total, None);
        assert_eq!(details[0].order.total_amount, Decimal::from(u32::MAX));
    }
}
