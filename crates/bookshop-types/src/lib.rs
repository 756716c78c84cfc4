//! Domain and wire types shared by the bookshop store, API and server.
//!
//! Nothing in here performs I/O.

pub mod api;
pub mod models;

pub use models::*;
