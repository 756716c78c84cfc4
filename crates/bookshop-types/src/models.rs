use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Roles & session identity --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// A verified session: who is calling and with which role.
///
/// Produced by the session layer once a token has been checked; the store
/// never sees raw credentials apart from login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2id PHC string. Never sent back to clients.
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Signup payload. The password only lives here until it is hashed.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("first and last name are required".into());
        }
        if !self.email.contains('@') {
            return Err(format!("invalid email address: {}", self.email));
        }
        if self.password.is_empty() {
            return Err("password must not be empty".into());
        }
        Ok(())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

// -- Books --

/// Closed set of catalog genres.
///
/// The hyphenated literals use U+2011 (non-breaking hyphen) on the wire and
/// in the table file. Plain ASCII hyphens are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non\u{2011}Fiction", alias = "Non-Fiction")]
    NonFiction,
    #[serde(rename = "Sci\u{2011}Fi", alias = "Sci-Fi")]
    SciFi,
    Fantasy,
    Biography,
    Children,
    Other,
}

impl Genre {
    pub const ALL: [Genre; 7] = [
        Self::Fiction,
        Self::NonFiction,
        Self::SciFi,
        Self::Fantasy,
        Self::Biography,
        Self::Children,
        Self::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fiction => "Fiction",
            Self::NonFiction => "Non\u{2011}Fiction",
            Self::SciFi => "Sci\u{2011}Fi",
            Self::Fantasy => "Fantasy",
            Self::Biography => "Biography",
            Self::Children => "Children",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('\u{2011}', "-");
        match normalized.as_str() {
            "Fiction" => Ok(Self::Fiction),
            "Non-Fiction" => Ok(Self::NonFiction),
            "Sci-Fi" => Ok(Self::SciFi),
            "Fantasy" => Ok(Self::Fantasy),
            "Biography" => Ok(Self::Biography),
            "Children" => Ok(Self::Children),
            "Other" => Ok(Self::Other),
            _ => Err(format!("invalid genre: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub genre: Genre,
    pub page_count: u32,
    pub stock: u32,
    pub image_url: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Fields an admin supplies when listing a new book. The owner is never
/// taken from input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub genre: Genre,
    pub page_count: u32,
    pub stock: u32,
    #[serde(default)]
    pub image_url: String,
}

impl NewBook {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        if self.author.trim().is_empty() {
            return Err("author must not be empty".into());
        }
        validate_price(self.price)
    }

    pub fn into_book(self, owner_id: Uuid) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: self.title,
            author: self.author,
            price: self.price,
            genre: self.genre,
            page_count: self.page_count,
            stock: self.stock,
            image_url: self.image_url,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// Partial book update: a present slot overwrites, an absent slot keeps the
/// stored value. `id`, `createdAt` and `ownerId` have no slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub genre: Option<Genre>,
    pub page_count: Option<u32>,
    pub stock: Option<u32>,
    pub image_url: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err("title must not be empty".into());
        }
        if self.author.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err("author must not be empty".into());
        }
        match self.price {
            Some(price) => validate_price(price),
            None => Ok(()),
        }
    }

    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(page_count) = self.page_count {
            book.page_count = page_count;
        }
        if let Some(stock) = self.stock {
            book.stock = stock;
        }
        if let Some(image_url) = self.image_url {
            book.image_url = image_url;
        }
    }
}

/// Highest accepted book price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

fn validate_price(price: Decimal) -> Result<(), String> {
    if price < Decimal::ZERO {
        return Err(format!("price must not be negative: {price}"));
    }
    if price > MAX_PRICE {
        return Err(format!("price must not exceed {MAX_PRICE}: {price}"));
    }
    Ok(())
}

// -- Orders --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment choice offered at checkout. Recorded in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Ghost,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub book_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    /// Snapshot of book prices at creation; never recomputed.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

/// An order joined against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// One order item with the book it points at, if that book still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book_id: Uuid,
    pub quantity: u32,
    pub book: Option<BookSummary>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub line_total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}
