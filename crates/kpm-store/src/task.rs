//! Async entry points for callers running on a tokio runtime.
//!
//! Every call runs the blocking store operation on tokio's blocking pool. The
//! deadline is fixed before the work is queued, so time spent waiting for a
//! blocking worker counts against it.

use kpm_db::{Deadline, Package};
use tracing::error;

use crate::{
    error::{StoreError, StoreResult},
    page::{PageRequest, SearchPage},
    store::RegistryStore,
};

impl RegistryStore {
    pub async fn publish_async(
        &self,
        name: impl Into<String>,
        admin: impl Into<String>,
        description: impl Into<String>,
    ) -> StoreResult<i64> {
        self.publish_within_async(name, admin, description, self.deadline())
            .await
    }

    pub async fn publish_within_async(
        &self,
        name: impl Into<String>,
        admin: impl Into<String>,
        description: impl Into<String>,
        deadline: Deadline,
    ) -> StoreResult<i64> {
        let (name, admin, description) = (name.into(), admin.into(), description.into());
        self.spawn(move |store| store.publish_within(&name, &admin, &description, deadline))
            .await
    }

    pub async fn search_async(
        &self,
        fragment: impl Into<String>,
        page: PageRequest,
    ) -> StoreResult<SearchPage> {
        self.search_within_async(fragment, page, self.deadline())
            .await
    }

    pub async fn search_within_async(
        &self,
        fragment: impl Into<String>,
        page: PageRequest,
        deadline: Deadline,
    ) -> StoreResult<SearchPage> {
        let fragment = fragment.into();
        self.spawn(move |store| store.search_within(&fragment, &page, deadline))
            .await
    }

    pub async fn list_all_async(&self, page: PageRequest) -> StoreResult<SearchPage> {
        self.list_all_within_async(page, self.deadline()).await
    }

    pub async fn list_all_within_async(
        &self,
        page: PageRequest,
        deadline: Deadline,
    ) -> StoreResult<SearchPage> {
        self.spawn(move |store| store.list_all_within(&page, deadline))
            .await
    }

    pub async fn get_async(&self, name: impl Into<String>) -> StoreResult<Option<Package>> {
        self.get_within_async(name, self.deadline()).await
    }

    pub async fn get_within_async(
        &self,
        name: impl Into<String>,
        deadline: Deadline,
    ) -> StoreResult<Option<Package>> {
        let name = name.into();
        self.spawn(move |store| store.get_within(&name, deadline))
            .await
    }

    pub async fn count_async(&self) -> StoreResult<u64> {
        self.count_within_async(self.deadline()).await
    }

    pub async fn count_within_async(&self, deadline: Deadline) -> StoreResult<u64> {
        self.spawn(move |store| store.count_within(deadline)).await
    }

    async fn spawn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(RegistryStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|err| {
                error!(error = %err, "registry worker failed");
                StoreError::Unavailable(format!("registry worker failed: {err}"))
            })?
    }
}
