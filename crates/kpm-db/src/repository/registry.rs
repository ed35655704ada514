//! Registry database repository for published packages.

use diesel::{dsl::sql, prelude::*, sql_types::Bool, sql_types::Text, sqlite::Sqlite};
use kpm_config::MatchMode;

use crate::{
    models::registry::{Cursor, NewPackage, Package, PackageSummary},
    schema::registry::packages,
};

/// How a name fragment is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch<'a> {
    pub fragment: &'a str,
    pub mode: MatchMode,
    pub case_sensitive: bool,
}

type NameFilter = Box<dyn BoxableExpression<packages::table, Sqlite, SqlType = Bool>>;

impl NameMatch<'_> {
    /// Builds the `WHERE` expression for this match. The fragment is always
    /// bound as a parameter.
    fn filter(&self) -> NameFilter {
        let (open, close) = match (self.case_sensitive, self.mode) {
            (true, MatchMode::Prefix) => ("instr(name, ", ") = 1"),
            (true, MatchMode::Substring) => ("instr(name, ", ") > 0"),
            (false, MatchMode::Prefix) => ("instr(lower(name), lower(", ")) = 1"),
            (false, MatchMode::Substring) => ("instr(lower(name), lower(", ")) > 0"),
        };

        Box::new(
            sql::<Bool>(open)
                .bind::<Text, _>(self.fragment.to_string())
                .sql(close),
        )
    }
}

/// Repository for package operations.
pub struct PackageRepository;

impl PackageRepository {
    /// Finds a package by exact name.
    pub fn find_by_name(conn: &mut SqliteConnection, name: &str) -> QueryResult<Option<Package>> {
        packages::table
            .filter(packages::name.eq(name))
            .select(Package::as_select())
            .first(conn)
            .optional()
    }

    /// Checks if a package with the given name exists.
    pub fn exists_by_name(conn: &mut SqliteConnection, name: &str) -> QueryResult<bool> {
        use diesel::dsl::exists;
        diesel::select(exists(packages::table.filter(packages::name.eq(name)))).get_result(conn)
    }

    /// Inserts a new package and returns the assigned ID.
    pub fn insert(conn: &mut SqliteConnection, package: &NewPackage) -> QueryResult<i64> {
        diesel::insert_into(packages::table)
            .values(package)
            .returning(packages::id)
            .get_result(conn)
    }

    /// Counts all packages.
    pub fn count(conn: &mut SqliteConnection) -> QueryResult<i64> {
        packages::table.count().get_result(conn)
    }

    /// Searches package names, ordered by name then ID, resuming after
    /// `after` when given.
    pub fn search(
        conn: &mut SqliteConnection,
        name_match: &NameMatch,
        after: Option<&Cursor>,
        limit: i64,
    ) -> QueryResult<Vec<PackageSummary>> {
        let mut query = packages::table.into_boxed().filter(name_match.filter());

        // Lets SQLite walk the name index from the prefix onwards.
        if name_match.case_sensitive && name_match.mode == MatchMode::Prefix {
            query = query.filter(packages::name.ge(name_match.fragment.to_string()));
        }

        Self::page(query, after, limit)
            .select(PackageSummary::as_select())
            .load(conn)
    }

    /// Lists every package, ordered by name then ID, resuming after `after`
    /// when given.
    pub fn list(
        conn: &mut SqliteConnection,
        after: Option<&Cursor>,
        limit: i64,
    ) -> QueryResult<Vec<PackageSummary>> {
        Self::page(packages::table.into_boxed(), after, limit)
            .select(PackageSummary::as_select())
            .load(conn)
    }

    fn page<'a>(
        mut query: packages::BoxedQuery<'a, Sqlite>,
        after: Option<&Cursor>,
        limit: i64,
    ) -> packages::BoxedQuery<'a, Sqlite> {
        if let Some(cursor) = after {
            query = query.filter(
                packages::name.gt(cursor.name.clone()).or(packages::name
                    .eq(cursor.name.clone())
                    .and(packages::id.gt(cursor.id))),
            );
        }

        query
            .order((packages::name.asc(), packages::id.asc()))
            .limit(limit)
    }
}
