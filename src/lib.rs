pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;

pub use bootstrap::{Attempt, connect, init};
pub use config::{DatabaseConfig, DatabaseOverrides, RetryPolicy};
pub use db::{Article, Database, NewArticle, NewSource, Schema, Session, Source};
pub use error::NewsDbError;
