#![allow(dead_code)]

use std::path::PathBuf;

use kpm_config::Config;
use kpm_store::{PageRequest, RegistryStore, SearchPage};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A store backed by a scratch database that lives as long as this value.
pub struct TestRegistry {
    pub store: RegistryStore,
    dir: TempDir,
}

impl TestRegistry {
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("registry.db")
    }
}

pub fn registry() -> TestRegistry {
    registry_with(|_| {})
}

pub fn registry_with(configure: impl FnOnce(&mut Config)) -> TestRegistry {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default_config();
    configure(&mut config);
    config.resolve().unwrap();

    let store = RegistryStore::open_at(dir.path().join("registry.db"), &config).unwrap();
    TestRegistry { store, dir }
}

pub fn names(page: &SearchPage) -> Vec<String> {
    page.items.iter().map(|p| p.name.clone()).collect()
}

/// Follows continuation tokens until the listing is exhausted.
pub fn collect_all(store: &RegistryStore, max_results: Option<usize>) -> Vec<String> {
    let mut request = PageRequest {
        max_results,
        continuation: None,
    };
    let mut all = Vec::new();
    loop {
        let page = store.list_all(&request).unwrap();
        all.extend(names(&page));
        match page.next_request(max_results) {
            Some(next) => request = next,
            None => return all,
        }
    }
}
