//! # Taproom
//!
//! Coroutine-native product-catalog core for a beer shop backend, built on the
//! `may` runtime. The catalog keeps two independently-owned stores in mutual
//! agreement: the local PostgreSQL product store and a remote inventory/stock
//! service reached over HTTP. Every product write is mirrored to the remote
//! service inside a still-open local transaction, every read is enriched with
//! remote stock counts, and partial failure between the two stores is rolled
//! back and surfaced rather than left to diverge silently.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inventory;
pub mod product;
pub mod sku;
pub mod store;

pub use catalog::Catalog;
pub use config::ServiceConfig;
pub use error::CatalogError;
pub use inventory::HttpInventoryClient;
pub use store::PgProductStore;
