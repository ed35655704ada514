pub mod config;
pub mod duration;
pub mod error;
pub mod search;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use search::{MatchMode, SearchSettings};
