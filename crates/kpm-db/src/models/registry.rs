use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::registry::packages;

/// A committed package record.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub admin: String,
    pub description: String,
    pub published_at: String,
}

/// The row shape returned by searches and listings.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackage<'a> {
    pub name: &'a str,
    pub admin: &'a str,
    pub description: &'a str,
    pub published_at: &'a str,
}

/// Sort position of a row in `(name, id)` order.
///
/// Listing queries resume strictly after this position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub name: String,
    pub id: i64,
}

impl From<&PackageSummary> for Cursor {
    fn from(summary: &PackageSummary) -> Self {
        Self {
            name: summary.name.clone(),
            id: summary.id,
        }
    }
}
