use std::future::Future;
use std::path::Path;

use route_forge_core::types::ModelName;
use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::record::{Criteria, QueryResult, Record, UpdateMode};

/// Record CRUD for model collections.
///
/// Uses RPITIT for async methods, avoiding the `async-trait` crate.
/// Invoked only by the generated route handlers.
pub trait ModelStore: Send + Sync {
    /// Inserts a record with a store-generated id.
    fn create(
        &self,
        model: &ModelName,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<Record, BackendError>> + Send;

    /// Returns every record matching `criteria`. An unknown model yields an
    /// empty result, not an error.
    fn find(
        &self,
        model: &ModelName,
        criteria: &Criteria,
    ) -> impl Future<Output = Result<QueryResult, BackendError>> + Send;

    /// Returns `BackendError::RecordNotFound` if the record does not exist.
    fn find_one(
        &self,
        model: &ModelName,
        id: &str,
    ) -> impl Future<Output = Result<Record, BackendError>> + Send;

    /// Updates an existing record.
    ///
    /// Returns `BackendError::RecordNotFound` if the record does not exist.
    fn update(
        &self,
        model: &ModelName,
        id: &str,
        fields: Map<String, Value>,
        mode: UpdateMode,
    ) -> impl Future<Output = Result<Record, BackendError>> + Send;

    /// Replaces the record with `id`, creating it when absent. The flag is
    /// true when a new record was created.
    fn upsert(
        &self,
        model: &ModelName,
        id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(Record, bool), BackendError>> + Send;

    /// Removes a record and returns it.
    ///
    /// Returns `BackendError::RecordNotFound` if the record does not exist.
    fn destroy(
        &self,
        model: &ModelName,
        id: &str,
    ) -> impl Future<Output = Result<Record, BackendError>> + Send;
}

/// Destination for uploaded files.
pub trait FileStorage: Send + Sync {
    /// Moves the file at `local_path` into storage under `name` and returns
    /// its location.
    fn upload(
        &self,
        local_path: &Path,
        name: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time checks that the in-tree implementations satisfy the bounds.
    fn _assert_model_store<T: ModelStore>() {}
    fn _assert_file_storage<T: FileStorage>() {}

    #[test]
    fn implementations_satisfy_traits() {
        _assert_model_store::<crate::memory::MemoryStore>();
        _assert_file_storage::<crate::storage::DirectoryStorage>();
    }
}
