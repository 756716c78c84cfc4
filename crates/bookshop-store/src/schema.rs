//! Column layouts of the three table files. Names match the header row of
//! the original spreadsheets so external tools keep finding fields by name.

use crate::table::{Column, TableSchema};

pub const USERS: TableSchema = TableSchema {
    table: "users",
    columns: &[
        Column::text("id"),
        Column::text("firstName"),
        Column::text("lastName"),
        Column::text("email"),
        // Argon2id PHC string; the column keeps its historical name.
        Column::text("password"),
        Column::text("role"),
        Column::text("createdAt"),
    ],
};

pub const BOOKS: TableSchema = TableSchema {
    table: "books",
    columns: &[
        Column::text("id"),
        Column::text("title"),
        Column::text("author"),
        Column::text("price"),
        Column::text("genre"),
        Column::integer("pageCount"),
        Column::integer("stock"),
        Column::text("imageUrl"),
        Column::text("ownerId"),
        Column::text("createdAt"),
    ],
};

pub const ORDERS: TableSchema = TableSchema {
    table: "orders",
    columns: &[
        Column::text("id"),
        Column::text("userId"),
        // JSON array of {"bookId", "quantity"} objects.
        Column::text("items"),
        Column::text("totalAmount"),
        Column::text("orderDate"),
        Column::text("status"),
    ],
};
