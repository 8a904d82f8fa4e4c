pub mod check;
pub mod completions;
pub mod routes;
pub mod serve;

use std::path::Path;

use route_forge_axum::ForgeServer;
use route_forge_backend::{DirectoryStorage, MemoryStore};

use crate::config::LoadedConfig;
use crate::error::CliError;

/// A server over the in-memory store with uploads stored under
/// `storage_root`. Routes are not generated yet. Bearer auth is installed
/// only when `[auth]` lists tokens.
pub fn build_server(loaded: &LoadedConfig, storage_root: &Path) -> Result<ForgeServer, CliError> {
    let mut builder = ForgeServer::builder()
        .with_settings(loaded.server_settings())
        .with_models(loaded.model_set()?)
        .with_store(MemoryStore::new())
        .with_storage(DirectoryStorage::new(storage_root));
    if !loaded.config.auth.tokens.is_empty() {
        builder = builder.with_auth_provider(loaded.token_provider());
    }
    Ok(builder.build()?)
}
