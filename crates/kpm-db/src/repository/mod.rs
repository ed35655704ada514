//! Repository pattern implementations for database operations.
//!
//! - [`PackageRepository`](registry::PackageRepository) - Published package records

pub mod registry;
