//! Row mappings for the domain entities.
//!
//! Each entity maps to one flat row in its schema's column order. The only
//! nested field, `Order::items`, is stored as a JSON array in one text cell.

use bookshop_types::{Book, Order, OrderItem, User};

use crate::codec::{self, Cells};
use crate::error::Result;
use crate::schema;
use crate::store::Record;
use crate::table::{Row, TableSchema};

impl Record for User {
    const SCHEMA: &'static TableSchema = &schema::USERS;

    fn to_row(&self) -> Result<Row> {
        Ok(vec![
            codec::display(self.id),
            codec::text(self.first_name.as_str()),
            codec::text(self.last_name.as_str()),
            codec::text(self.email.as_str()),
            codec::text(self.password_hash.as_str()),
            codec::display(self.role),
            codec::timestamp(&self.created_at),
        ])
    }

    fn from_row(row: Row) -> std::result::Result<Self, String> {
        let mut cells = Cells::new(Self::SCHEMA, row)?;
        Ok(Self {
            id: cells.parse()?,
            first_name: cells.text()?,
            last_name: cells.text()?,
            email: cells.text()?,
            password_hash: cells.text()?,
            role: cells.parse()?,
            created_at: cells.parse()?,
        })
    }
}

impl Record for Book {
    const SCHEMA: &'static TableSchema = &schema::BOOKS;

    fn to_row(&self) -> Result<Row> {
        Ok(vec![
            codec::display(self.id),
            codec::text(self.title.as_str()),
            codec::text(self.author.as_str()),
            codec::decimal(self.price),
            codec::display(self.genre),
            codec::count(self.page_count),
            codec::count(self.stock),
            codec::text(self.image_url.as_str()),
            codec::display(self.owner_id),
            codec::timestamp(&self.created_at),
        ])
    }

    fn from_row(row: Row) -> std::result::Result<Self, String> {
        let mut cells = Cells::new(Self::SCHEMA, row)?;
        Ok(Self {
            id: cells.parse()?,
            title: cells.text()?,
            author: cells.text()?,
            price: cells.parse()?,
            genre: cells.parse()?,
            page_count: cells.count()?,
            stock: cells.count()?,
            image_url: cells.text()?,
            owner_id: cells.parse()?,
            created_at: cells.parse()?,
        })
    }
}

impl Record for Order {
    const SCHEMA: &'static TableSchema = &schema::ORDERS;

    fn to_row(&self) -> Result<Row> {
        Ok(vec![
            codec::display(self.id),
            codec::display(self.user_id),
            codec::json(Self::SCHEMA, &self.items)?,
            codec::decimal(self.total_amount),
            codec::timestamp(&self.order_date),
            codec::display(self.status),
        ])
    }

    fn from_row(row: Row) -> std::result::Result<Self, String> {
        let mut cells = Cells::new(Self::SCHEMA, row)?;
        let id = cells.parse()?;
        let user_id = cells.parse()?;
        let items: Vec<OrderItem> = cells.json()?;
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(format!("item for book {} has quantity 0", item.book_id));
        }
        Ok(Self {
            id,
            user_id,
            items,
            total_amount: cells.parse()?,
            order_date: cells.parse()?,
            status: cells.parse()?,
        })
    }
}
