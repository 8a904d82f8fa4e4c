//! In-process `ModelStore` used by the CLI and the test suites.

use std::collections::HashMap;
use std::sync::Arc;

use route_forge_core::types::ModelName;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::BackendError;
use crate::record::{Criteria, QueryResult, Record, UpdateMode};
use crate::traits::ModelStore;

/// Collections keyed by model name, each kept in insertion order.
///
/// Collections are created on first write. Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<ModelName, Vec<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `model`'s collection.
    pub async fn count(&self, model: &ModelName) -> usize {
        self.collections
            .read()
            .await
            .get(model)
            .map_or(0, Vec::len)
    }
}

fn not_found(model: &ModelName, id: &str) -> BackendError {
    BackendError::RecordNotFound {
        model: model.to_string(),
        id: id.to_string(),
    }
}

impl ModelStore for MemoryStore {
    async fn create(
        &self,
        model: &ModelName,
        fields: Map<String, Value>,
    ) -> Result<Record, BackendError> {
        let record = Record::new(model.clone(), fields);
        self.collections
            .write()
            .await
            .entry(model.clone())
            .or_default()
            .push(record.clone());
        tracing::debug!(model = %model, id = %record.id, "record created");
        Ok(record)
    }

    async fn find(
        &self,
        model: &ModelName,
        criteria: &Criteria,
    ) -> Result<QueryResult, BackendError> {
        let guard = self.collections.read().await;
        let matching: Vec<&Record> = guard
            .get(model)
            .map(|rows| rows.iter().filter(|r| criteria.matches(r)).collect())
            .unwrap_or_default();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(criteria.skip)
            .take(criteria.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(QueryResult::new(page, Some(total)))
    }

    async fn find_one(&self, model: &ModelName, id: &str) -> Result<Record, BackendError> {
        self.collections
            .read()
            .await
            .get(model)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| not_found(model, id))
    }

    async fn update(
        &self,
        model: &ModelName,
        id: &str,
        fields: Map<String, Value>,
        mode: UpdateMode,
    ) -> Result<Record, BackendError> {
        let mut guard = self.collections.write().await;
        let record = guard
            .get_mut(model)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| not_found(model, id))?;
        match mode {
            UpdateMode::Merge => record.merge(fields),
            UpdateMode::Replace => record.replace(fields),
        }
        Ok(record.clone())
    }

    async fn upsert(
        &self,
        model: &ModelName,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(Record, bool), BackendError> {
        let mut guard = self.collections.write().await;
        let rows = guard.entry(model.clone()).or_default();
        if let Some(existing) = rows.iter_mut().find(|r| r.id == id) {
            existing.replace(fields);
            return Ok((existing.clone(), false));
        }
        let record = Record::with_id(id, model.clone(), fields);
        rows.push(record.clone());
        Ok((record, true))
    }

    async fn destroy(&self, model: &ModelName, id: &str) -> Result<Record, BackendError> {
        let mut guard = self.collections.write().await;
        let rows = guard.get_mut(model).ok_or_else(|| not_found(model, id))?;
        let pos = rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(model, id))?;
        Ok(rows.remove(pos))
    }
}
