use tracing::{debug, info};
use uuid::Uuid;

use bookshop_types::{Book, BookPatch, NewBook};

use crate::error::{Result, StoreError};
use crate::store::RecordStore;

/// Add, update, delete and list books.
///
/// No role or ownership filtering happens here except in the `*_owned`
/// variants, which check ownership inside the same locked cycle as the
/// mutation.
pub struct CatalogStore {
    store: RecordStore<Book>,
}

impl CatalogStore {
    pub fn new(store: RecordStore<Book>) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> Result<Vec<Book>> {
        self.store.read_all()
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Book>> {
        Ok(self.list_all()?.into_iter().find(|b| b.id == id))
    }

    pub fn add(&self, new_book: NewBook, owner_id: Uuid) -> Result<Book> {
        new_book.validate().map_err(StoreError::InvalidInput)?;

        let book = new_book.into_book(owner_id);
        let created = book.clone();
        self.store.modify(move |books| {
            books.push(book);
            Ok(())
        })?;

        info!("Book {} ({}) added by {}", created.id, created.title, owner_id);
        Ok(created)
    }

    pub fn update(&self, id: Uuid, patch: BookPatch) -> Result<Book> {
        self.update_where(id, patch, |_| true, StoreError::NotFound)
    }

    /// Remove the book if present. Deleting an unknown id is a no-op.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let removed = self.store.modify(|books| {
            let before = books.len();
            books.retain(|b| b.id != id);
            Ok(before - books.len())
        })?;

        if removed > 0 {
            info!("Book {} deleted", id);
        } else {
            debug!("Delete of unknown book {} ignored", id);
        }
        Ok(())
    }

    /// Update a book only if `owner_id` owns it.
    pub fn update_owned(&self, id: Uuid, owner_id: Uuid, patch: BookPatch) -> Result<Book> {
        self.update_where(
            id,
            patch,
            |book| book.owner_id == owner_id,
            StoreError::NotFoundOrForbidden,
        )
    }

    /// Delete a book only if `owner_id` owns it. Missing and foreign books
    /// fail the same way.
    pub fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<()> {
        self.store.modify(|books| {
            let idx = books
                .iter()
                .position(|b| b.id == id && b.owner_id == owner_id)
                .ok_or(StoreError::NotFoundOrForbidden)?;
            books.remove(idx);
            Ok(())
        })?;

        info!("Book {} deleted by owner {}", id, owner_id);
        Ok(())
    }

    fn update_where<P>(
        &self,
        id: Uuid,
        patch: BookPatch,
        allowed: P,
        missing: StoreError,
    ) -> Result<Book>
    where
        P: FnOnce(&Book) -> bool,
    {
        patch.validate().map_err(StoreError::InvalidInput)?;

        let updated = self.store.modify(|books| {
            let book = books
                .iter_mut()
                .find(|b| b.id == id)
                .filter(|b| allowed(&**b))
                .ok_or(missing)?;
            patch.apply(book);
            Ok(book.clone())
        })?;

        info!("Book {} updated", updated.id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshop_types::Genre;
    use tempfile::TempDir;

    fn catalog(dir: &TempDir) -> CatalogStore {
        CatalogStore::new(RecordStore::open(&dir.path().join("books.db"), 1000).unwrap())
    }

    fn nineteen_eighty_four() -> NewBook {
        NewBook {
            title: "1984".into(),
            author: "George Orwell".into(),
            price: "24.90".parse().unwrap(),
            genre: Genre::Fiction,
            page_count: 328,
            stock: 10,
            image_url: String::new(),
        }
    }

    #[test]
    fn price_only_update_keeps_everything_else() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let owner = Uuid::new_v4();
        let original = catalog.add(nineteen_eighty_four(), owner).unwrap();

        let patch = BookPatch {
            price: Some("19.90".parse().unwrap()),
            ..Default::default()
        };
        let updated = catalog.update(original.id, patch).unwrap();

        assert_eq!(updated.price, "19.90".parse().unwrap());
        assert_eq!(
            Book {
                price: original.price,
                ..updated.clone()
            },
            original
        );
        assert_eq!(catalog.get(original.id).unwrap(), Some(updated));
    }

    #[test]
    fn update_of_unknown_book_is_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let err = catalog
            .update(Uuid::new_v4(), BookPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn delete_twice_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let book = catalog.add(nineteen_eighty_four(), Uuid::new_v4()).unwrap();
        let other = catalog.add(nineteen_eighty_four(), Uuid::new_v4()).unwrap();

        catalog.delete(book.id).unwrap();
        catalog.delete(book.id).unwrap();

        assert_eq!(catalog.list_all().unwrap(), vec![other]);
    }

    #[test]
    fn owned_mutations_reject_other_owners() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let book = catalog.add(nineteen_eighty_four(), owner).unwrap();

        let patch = BookPatch {
            stock: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_owned(book.id, intruder, patch.clone()),
            Err(StoreError::NotFoundOrForbidden)
        ));
        assert!(matches!(
            catalog.delete_owned(book.id, intruder),
            Err(StoreError::NotFoundOrForbidden)
        ));
        assert!(matches!(
            catalog.delete_owned(Uuid::new_v4(), owner),
            Err(StoreError::NotFoundOrForbidden)
        ));

        assert_eq!(catalog.update_owned(book.id, owner, patch).unwrap().stock, 0);
        catalog.delete_owned(book.id, owner).unwrap();
        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn invalid_book_never_reaches_the_table() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let mut book = nineteen_eighty_four();
        book.price = "-1".parse().unwrap();
        assert!(matches!(
            catalog.add(book, Uuid::new_v4()),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(catalog.list_all().unwrap().is_empty());
    }
}
