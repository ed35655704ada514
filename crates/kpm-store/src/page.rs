//! Page requests and bounded result pages.

use kpm_db::{Cursor, PackageSummary};
use serde::Serialize;

use crate::token::ContinuationToken;

/// Which page of a search or listing to return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page size. `None` uses the configured default; values above
    /// the configured cap are clamped.
    pub max_results: Option<usize>,
    /// Token from the previous page's `next`.
    pub continuation: Option<ContinuationToken>,
}

impl PageRequest {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn after(mut self, token: impl Into<ContinuationToken>) -> Self {
        self.continuation = Some(token.into());
        self
    }
}

/// One bounded page of package summaries in `(name, id)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub items: Vec<PackageSummary>,
    /// Present only when more rows remain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<ContinuationToken>,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a page from up to `limit + 1` rows; the extra row only signals
    /// that another page exists.
    pub(crate) fn from_rows(mut rows: Vec<PackageSummary>, limit: usize) -> Self {
        let next = if rows.len() > limit {
            rows.truncate(limit);
            rows.last()
                .map(|last| ContinuationToken::encode(&Cursor::from(last)))
        } else {
            None
        };

        Self { items: rows, next }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Request for the following page, keeping the same size.
    pub fn next_request(&self, max_results: Option<usize>) -> Option<PageRequest> {
        self.next.clone().map(|token| PageRequest {
            max_results,
            continuation: Some(token),
        })
    }
}
