//! Storage layer for the kpm package registry.
//!
//! Owns the SQLite schema and migrations, the pooled [`Database`] handle with
//! deadline-aware transactions, and the [`PackageRepository`] queries.

pub mod connection;
pub mod deadline;
pub mod error;
pub mod migration;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{Database, PoolOptions};
pub use deadline::Deadline;
pub use error::{DbError, Result};
pub use models::registry::{Cursor, NewPackage, Package, PackageSummary};
pub use repository::registry::{NameMatch, PackageRepository};
