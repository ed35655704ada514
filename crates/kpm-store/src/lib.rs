//! Metadata store for the kpm package registry.
//!
//! [`RegistryStore`] admits new packages with unique names and answers
//! bounded, paginated name searches. All state lives in SQLite through
//! [`kpm_db`]; the store itself is a cheap, cloneable handle.

pub mod error;
pub mod page;
pub mod store;
mod task;
pub mod token;
pub mod validate;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use kpm_db::{Deadline, Package, PackageSummary};
pub use page::{PageRequest, SearchPage};
pub use store::RegistryStore;
pub use token::ContinuationToken;
