use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Hard ceiling on any configured page size.
pub const MAX_PAGE_SIZE_LIMIT: usize = 1000;

/// Search settings for name lookups.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchSettings {
    /// Page size used when the caller does not ask for one.
    /// Default: 20
    pub default_results: Option<usize>,

    /// Largest page a single call may return.
    /// Default: 100
    pub max_results: Option<usize>,

    /// How a fragment is matched against package names: "prefix" or "substring".
    /// Default: "prefix"
    pub match_mode: Option<MatchMode>,

    /// Whether name matching distinguishes letter case.
    /// Default: true
    pub case_sensitive: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Names starting with the fragment
    #[default]
    Prefix,
    /// Names containing the fragment anywhere
    Substring,
}

impl SearchSettings {
    pub fn default_results(&self) -> usize {
        self.default_results.unwrap_or(20)
    }

    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(100)
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode.unwrap_or_default()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive.unwrap_or(true)
    }

    pub(crate) fn resolve(&mut self) -> Result<()> {
        let max_results = *self.max_results.get_or_insert(100);
        let default_results = *self.default_results.get_or_insert(20.min(max_results));
        self.match_mode.get_or_insert_with(MatchMode::default);
        self.case_sensitive.get_or_insert(true);

        if max_results == 0 || max_results > MAX_PAGE_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "search.max_results",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE_LIMIT}"),
            });
        }
        if default_results == 0 || default_results > max_results {
            return Err(ConfigError::InvalidValue {
                field: "search.default_results",
                reason: format!("must be between 1 and search.max_results ({max_results})"),
            });
        }

        Ok(())
    }
}
