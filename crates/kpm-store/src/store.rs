//! The registry store: publish, search and list package records.

use std::{path::Path, time::Duration};

use chrono::{SecondsFormat, Utc};
use kpm_config::{Config, SearchSettings};
use kpm_db::{
    Database, DbError, Deadline, NameMatch, NewPackage, Package, PackageRepository, PoolOptions,
};
use tracing::{debug, trace};

use crate::{
    error::{StoreError, StoreResult},
    page::{PageRequest, SearchPage},
    validate,
};

/// Handle to the package registry.
///
/// Cloning is cheap; clones share one connection pool. No per-call state is
/// kept outside the database.
#[derive(Clone)]
pub struct RegistryStore {
    db: Database,
    search: SearchSettings,
    default_deadline: Option<Duration>,
}

impl RegistryStore {
    /// Opens the store at the database path named by `config`.
    pub fn open(config: &Config) -> StoreResult<Self> {
        let db = Database::open_with_config(config)?;
        Ok(Self::with_database(
            db,
            config.search.clone(),
            config.default_deadline()?,
        ))
    }

    /// Opens the store at `path`, taking every other setting from `config`.
    pub fn open_at<P: AsRef<Path>>(path: P, config: &Config) -> StoreResult<Self> {
        let options = PoolOptions::from_config(config)?;
        let db = Database::open(path, options)?;
        Ok(Self::with_database(
            db,
            config.search.clone(),
            config.default_deadline()?,
        ))
    }

    pub fn with_database(
        db: Database,
        search: SearchSettings,
        default_deadline: Option<Duration>,
    ) -> Self {
        Self {
            db,
            search,
            default_deadline,
        }
    }

    /// A fresh deadline using the configured default.
    pub fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.default_deadline)
    }

    /// Admits a new package and returns its assigned id.
    pub fn publish(&self, name: &str, admin: &str, description: &str) -> StoreResult<i64> {
        self.publish_within(name, admin, description, self.deadline())
    }

    pub fn publish_within(
        &self,
        name: &str,
        admin: &str,
        description: &str,
        deadline: Deadline,
    ) -> StoreResult<i64> {
        let name = validate::package_name(name)?;
        let admin = validate::admin(admin)?;
        let description = validate::description(description)?;
        let published_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        debug!(name = name, admin = admin, "publishing package");

        let id = self
            .db
            .write(deadline, |conn| {
                if PackageRepository::exists_by_name(conn, name)? {
                    return Err(DbError::UniqueViolation(format!("packages.name: {name}")));
                }

                let id = PackageRepository::insert(
                    conn,
                    &NewPackage {
                        name,
                        admin,
                        description,
                        published_at: &published_at,
                    },
                )?;
                Ok(id)
            })
            .map_err(|err| publish_error(err, name))?;

        debug!(name = name, id = id, "package published");
        Ok(id)
    }

    /// Finds packages whose name matches `fragment`.
    pub fn search(&self, fragment: &str, page: &PageRequest) -> StoreResult<SearchPage> {
        self.search_within(fragment, page, self.deadline())
    }

    pub fn search_within(
        &self,
        fragment: &str,
        page: &PageRequest,
        deadline: Deadline,
    ) -> StoreResult<SearchPage> {
        let fragment = validate::fragment(fragment)?;
        let limit = self.page_size(page.max_results)?;
        let after = page
            .continuation
            .as_ref()
            .map(|token| token.decode())
            .transpose()?;

        if fragment.trim().is_empty() {
            trace!("blank search fragment");
            return Ok(SearchPage::empty());
        }

        let name_match = NameMatch {
            fragment,
            mode: self.search.match_mode(),
            case_sensitive: self.search.case_sensitive(),
        };
        trace!(
            fragment = fragment,
            mode = ?name_match.mode,
            case_sensitive = name_match.case_sensitive,
            limit = limit,
            "searching packages"
        );

        let rows = self.db.read(deadline, |conn| {
            Ok(PackageRepository::search(
                conn,
                &name_match,
                after.as_ref(),
                fetch_limit(limit),
            )?)
        })?;

        let page = SearchPage::from_rows(rows, limit);
        debug!(
            fragment = fragment,
            count = page.items.len(),
            more = page.has_more(),
            "search complete"
        );
        Ok(page)
    }

    /// Lists every package in name order.
    pub fn list_all(&self, page: &PageRequest) -> StoreResult<SearchPage> {
        self.list_all_within(page, self.deadline())
    }

    pub fn list_all_within(
        &self,
        page: &PageRequest,
        deadline: Deadline,
    ) -> StoreResult<SearchPage> {
        let limit = self.page_size(page.max_results)?;
        let after = page
            .continuation
            .as_ref()
            .map(|token| token.decode())
            .transpose()?;

        trace!(limit = limit, resumed = after.is_some(), "listing packages");

        let rows = self.db.read(deadline, |conn| {
            Ok(PackageRepository::list(conn, after.as_ref(), fetch_limit(limit))?)
        })?;

        Ok(SearchPage::from_rows(rows, limit))
    }

    /// Looks up one package by exact name.
    pub fn get(&self, name: &str) -> StoreResult<Option<Package>> {
        self.get_within(name, self.deadline())
    }

    pub fn get_within(&self, name: &str, deadline: Deadline) -> StoreResult<Option<Package>> {
        let name = validate::package_name(name)?;
        let package = self.db.read(deadline, |conn| {
            Ok(PackageRepository::find_by_name(conn, name)?)
        })?;
        Ok(package)
    }

    /// Number of committed packages.
    pub fn count(&self) -> StoreResult<u64> {
        self.count_within(self.deadline())
    }

    pub fn count_within(&self, deadline: Deadline) -> StoreResult<u64> {
        let count = self
            .db
            .read(deadline, |conn| Ok(PackageRepository::count(conn)?))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn page_size(&self, requested: Option<usize>) -> StoreResult<usize> {
        let cap = self.search.max_results();
        match requested {
            Some(0) => Err(StoreError::InvalidInput(
                "max_results must be at least 1".into(),
            )),
            Some(n) => Ok(n.min(cap)),
            None => Ok(self.search.default_results().min(cap)),
        }
    }
}

/// A duplicate name reads the same whether the pre-check or the unique index
/// caught it.
fn publish_error(err: DbError, name: &str) -> StoreError {
    match err {
        DbError::UniqueViolation(_) => {
            StoreError::Conflict(format!("package '{name}' is already published"))
        }
        other => other.into(),
    }
}

/// One extra row tells whether a further page exists.
fn fetch_limit(limit: usize) -> i64 {
    i64::try_from(limit).map_or(i64::MAX, |limit| limit.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use kpm_config::MatchMode;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::error::ErrorKind;

    fn open_store(search: SearchSettings) -> (RegistryStore, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("registry.db"), PoolOptions::default()).unwrap();
        (RegistryStore::with_database(db, search, None), dir)
    }

    fn names(page: &SearchPage) -> Vec<&str> {
        page.items.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_publish_stores_trimmed_values() {
        let (store, _dir) = open_store(SearchSettings::default());

        let id = store
            .publish("  kcl-openapi ", " alice ", " OpenAPI models ")
            .unwrap();

        let pkg = store.get("kcl-openapi").unwrap().unwrap();
        assert_eq!(pkg.id, id);
        assert_eq!(pkg.name, "kcl-openapi");
        assert_eq!(pkg.admin, "alice");
        assert_eq!(pkg.description, " OpenAPI models ");
        assert!(chrono::DateTime::parse_from_rfc3339(&pkg.published_at).is_ok());
    }

    #[test]
    fn test_get_unknown_and_empty_name() {
        let (store, _dir) = open_store(SearchSettings::default());

        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.get(" ").unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_page_size_bounds() {
        let (store, _dir) = open_store(SearchSettings::default());

        assert_eq!(store.page_size(None).unwrap(), 20);
        assert_eq!(store.page_size(Some(5)).unwrap(), 5);
        assert_eq!(store.page_size(Some(10_000)).unwrap(), 100);
        assert_eq!(
            store.page_size(Some(0)).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_case_insensitive_substring_search() {
        let search = SearchSettings {
            match_mode: Some(MatchMode::Substring),
            case_sensitive: Some(false),
            ..SearchSettings::default()
        };
        let (store, _dir) = open_store(search);
        for name in ["kcl-Lang", "LANG-server", "other"] {
            store.publish(name, "admin", "").unwrap();
        }

        let page = store.search("lang", &PageRequest::first()).unwrap();
        assert_eq!(names(&page), vec!["LANG-server", "kcl-Lang"]);
    }

    #[test]
    fn test_bad_token_rejected_even_for_empty_fragment() {
        let (store, _dir) = open_store(SearchSettings::default());
        let request = PageRequest::first().after("garbage");

        assert_eq!(
            store.search("", &request).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            store.list_all(&request).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_unique_index_conflict_matches_precheck() {
        let (store, _dir) = open_store(SearchSettings::default());
        store.publish("konfig", "alice", "").unwrap();

        let precheck = store.publish("konfig", "bob", "").unwrap_err();

        // Insert without the existence check so only the index can object.
        let indexed = store
            .db
            .write(Deadline::none(), |conn| {
                Ok(PackageRepository::insert(
                    conn,
                    &NewPackage {
                        name: "konfig",
                        admin: "bob",
                        description: "",
                        published_at: "2026-01-12T00:00:00Z",
                    },
                )?)
            })
            .map_err(|err| publish_error(err, "konfig"))
            .unwrap_err();

        assert_eq!(precheck.kind(), ErrorKind::Conflict);
        assert_eq!(indexed.kind(), ErrorKind::Conflict);
        assert_eq!(indexed.detail(), precheck.detail());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_fetch_limit() {
        assert_eq!(fetch_limit(20), 21);
        assert_eq!(fetch_limit(usize::MAX), i64::MAX);
    }
}
