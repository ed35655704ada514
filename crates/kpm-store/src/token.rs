//! Opaque continuation tokens for paged results.
//!
//! A token is the percent-encoded JSON form of the last row's `(name, id)`
//! sort key. Callers must treat it as opaque.

use std::fmt;

use kpm_db::Cursor;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub(crate) fn encode(cursor: &Cursor) -> Self {
        let json = serde_json::json!({ "name": cursor.name, "id": cursor.id }).to_string();
        Self(utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string())
    }

    pub(crate) fn decode(&self) -> StoreResult<Cursor> {
        let json = percent_decode_str(&self.0)
            .decode_utf8()
            .map_err(|_| malformed())?;
        let cursor: Cursor = serde_json::from_str(&json).map_err(|_| malformed())?;

        if cursor.name.is_empty() || cursor.id < 1 {
            return Err(malformed());
        }
        Ok(cursor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn malformed() -> StoreError {
    StoreError::InvalidInput("malformed continuation token".into())
}

impl From<String> for ContinuationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
