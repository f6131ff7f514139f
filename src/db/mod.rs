//! Database module: schema, row models and the PostgreSQL handle.
//!
//! Layout:
//! - `schema.rs`: table definitions and DDL rendering (PostgreSQL and SQLite)
//! - `models.rs`: Rust structs mirroring DB rows, with insert/lookup helpers
//! - `postgres.rs`: unpooled connection handle and sessions

pub mod models;
pub mod postgres;
pub mod schema;

pub use models::{Article, NewArticle, NewSource, Source};
pub use postgres::{Database, Session};
pub use schema::{Column, ColumnType, Dialect, Schema, SchemaTarget, Table, create_tables};
