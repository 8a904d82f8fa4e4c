use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use route_forge_backend::{
    BackendError, Criteria, FileStorage, ModelStore, QueryResult, Record, UpdateMode,
};
use route_forge_core::types::ModelName;
use serde_json::{Map, Value};

use crate::auth::AuthProvider;
use crate::config::ServerSettings;
use crate::csrf::CsrfGuard;
use crate::headers::HeaderValidator;
use crate::models::ModelSet;
use crate::rate_limit::RateLimit;
use crate::validation::ValidatorRegistry;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ---------------------------------------------------------------------------
// DynModelStore
// ---------------------------------------------------------------------------

/// Object-safe wrapper for `ModelStore`.
///
/// RPITIT traits cannot be used as `dyn Trait`. This wrapper uses boxed futures
/// to enable dynamic dispatch for HTTP handler state.
pub trait DynModelStore: Send + Sync {
    fn create<'a>(
        &'a self,
        model: &'a ModelName,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<Record, BackendError>>;

    fn find<'a>(
        &'a self,
        model: &'a ModelName,
        criteria: &'a Criteria,
    ) -> BoxFuture<'a, Result<QueryResult, BackendError>>;

    fn find_one<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Record, BackendError>>;

    fn update<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
        fields: Map<String, Value>,
        mode: UpdateMode,
    ) -> BoxFuture<'a, Result<Record, BackendError>>;

    fn upsert<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(Record, bool), BackendError>>;

    fn destroy<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Record, BackendError>>;
}

/// Blanket impl: any concrete `ModelStore` automatically implements `DynModelStore`.
impl<T: ModelStore + 'static> DynModelStore for T {
    fn create<'a>(
        &'a self,
        model: &'a ModelName,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<Record, BackendError>> {
        Box::pin(ModelStore::create(self, model, fields))
    }

    fn find<'a>(
        &'a self,
        model: &'a ModelName,
        criteria: &'a Criteria,
    ) -> BoxFuture<'a, Result<QueryResult, BackendError>> {
        Box::pin(ModelStore::find(self, model, criteria))
    }

    fn find_one<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Record, BackendError>> {
        Box::pin(ModelStore::find_one(self, model, id))
    }

    fn update<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
        fields: Map<String, Value>,
        mode: UpdateMode,
    ) -> BoxFuture<'a, Result<Record, BackendError>> {
        Box::pin(ModelStore::update(self, model, id, fields, mode))
    }

    fn upsert<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(Record, bool), BackendError>> {
        Box::pin(ModelStore::upsert(self, model, id, fields))
    }

    fn destroy<'a>(
        &'a self,
        model: &'a ModelName,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Record, BackendError>> {
        Box::pin(ModelStore::destroy(self, model, id))
    }
}

// ---------------------------------------------------------------------------
// DynFileStorage
// ---------------------------------------------------------------------------

/// Object-safe wrapper for `FileStorage`.
pub trait DynFileStorage: Send + Sync {
    fn upload<'a>(
        &'a self,
        local_path: &'a Path,
        name: &'a str,
    ) -> BoxFuture<'a, Result<String, BackendError>>;
}

impl<T: FileStorage + 'static> DynFileStorage for T {
    fn upload<'a>(
        &'a self,
        local_path: &'a Path,
        name: &'a str,
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(FileStorage::upload(self, local_path, name))
    }
}

// ---------------------------------------------------------------------------
// ForgeState
// ---------------------------------------------------------------------------

/// Shared state for every generated route.
///
/// Header rules and validators are snapshots taken when routes were
/// generated.
#[derive(Clone)]
pub struct ForgeState {
    pub models: Arc<ModelSet>,
    pub store: Arc<dyn DynModelStore>,
    pub storage: Option<Arc<dyn DynFileStorage>>,
    pub validators: Arc<ValidatorRegistry>,
    pub headers: Arc<HeaderValidator>,
    pub auth_provider: Option<Arc<dyn AuthProvider>>,
    pub csrf: Option<Arc<CsrfGuard>>,
    pub rate_limit: Option<Arc<RateLimit>>,
    pub settings: Arc<ServerSettings>,
}

impl std::fmt::Debug for ForgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeState")
            .field("models", &self.models.len())
            .field("validators", &self.validators)
            .field("has_storage", &self.storage.is_some())
            .field("has_auth", &self.auth_provider.is_some())
            .field("has_csrf", &self.csrf.is_some())
            .field("rate_limited", &self.rate_limit.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_forge_backend::{DirectoryStorage, MemoryStore};

    #[test]
    fn forge_state_is_clone_send_sync() {
        fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
        assert_bounds::<ForgeState>();
    }

    #[tokio::test]
    async fn dyn_store_delegates_to_concrete_store() {
        let store: Arc<dyn DynModelStore> = Arc::new(MemoryStore::default());
        let model = ModelName::new("note").unwrap();
        let mut fields = Map::new();
        fields.insert("title".into(), Value::from("hi"));
        let created = store.create(&model, fields).await.unwrap();
        let found = store.find_one(&model, &created.id).await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[test]
    fn directory_storage_is_dyn_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let _: Arc<dyn DynFileStorage> = Arc::new(DirectoryStorage::new(dir.path()));
    }
}
