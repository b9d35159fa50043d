//! SQLite-backed relationship cache.

pub mod db;
pub mod schema;
pub mod store;

pub use db::CacheDb;
pub use store::SqliteCache;
