use std::path::{Path, PathBuf};

use route_forge_axum::{ModelSet, ServerSettings, StaticTokenProvider};
use route_forge_backend::AuthContext;
use route_forge_core::ModelDescriptor;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CliError;

/// Project-local config file name.
pub const DEFAULT_CONFIG_FILE: &str = "route-forge.toml";

/// CLI configuration loaded from `route-forge.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
    /// Glob patterns, relative to the config file, of files holding one
    /// model each.
    #[serde(default)]
    pub model_files: Vec<String>,
    #[serde(default)]
    pub auth: AuthSettings,
}

/// Bearer tokens accepted by `serve` and `check`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub principal: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// A parsed config together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: CliConfig,
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory that relative paths in the config resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Inline models followed by every file matched by `model_files`.
    pub fn models(&self) -> Result<Vec<ModelDescriptor>, CliError> {
        let mut models = self.config.models.clone();
        let base = self.base_dir();
        for pattern in &self.config.model_files {
            let full = base.join(pattern);
            let full = full.to_string_lossy();
            let entries = glob::glob(&full).map_err(|e| CliError::Config {
                message: format!("invalid model_files pattern '{pattern}': {e}"),
            })?;
            let mut paths = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| CliError::Io {
                    path: e.path().to_path_buf(),
                    source: std::io::Error::new(e.error().kind(), e.error().to_string()),
                })?;
                paths.push(path);
            }
            paths.sort();
            for path in paths {
                let source = read_file(&path)?;
                models.push(parse_toml(&source, &path)?);
            }
        }
        tracing::debug!(count = models.len(), "models loaded");
        Ok(models)
    }

    /// Registers every configured model. Duplicate names are rejected.
    pub fn model_set(&self) -> Result<ModelSet, CliError> {
        let models = self.models()?;
        if models.is_empty() {
            return Err(CliError::NoModels);
        }
        let set = models
            .into_iter()
            .fold(ModelSet::builder(), |builder, model| builder.model(model))
            .build()?;
        Ok(set)
    }

    /// Settings with `upload_dir` resolved against the config directory.
    pub fn server_settings(&self) -> ServerSettings {
        let mut settings = self.config.server.clone();
        if settings.upload_dir.is_relative() {
            settings.upload_dir = self.base_dir().join(&settings.upload_dir);
        }
        settings
    }

    pub fn token_provider(&self) -> StaticTokenProvider {
        self.config
            .auth
            .tokens
            .iter()
            .fold(StaticTokenProvider::new(), |provider, entry| {
                provider.with_token(
                    entry.token.clone(),
                    AuthContext::new(entry.principal.clone(), entry.scopes.clone()),
                )
            })
    }
}

/// Discovery order for the config file:
/// 1. `--config <path>` or `ROUTE_FORGE_CONFIG` (explicit)
/// 2. `./route-forge.toml`
///
/// Without either, an empty configuration is returned.
pub fn load_config(explicit_path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    if let Some(path) = explicit_path {
        return load_config_from_path(path);
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return load_config_from_path(&local);
    }

    Ok(LoadedConfig::default())
}

fn load_config_from_path(path: &Path) -> Result<LoadedConfig, CliError> {
    let source = read_file(path)?;
    let config = parse_toml(&source, path)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(LoadedConfig {
        config,
        path: Some(path.to_path_buf()),
    })
}

pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Deserializes `source`, keeping the span of the first error for
/// diagnostics.
pub fn parse_toml<T: DeserializeOwned>(source: &str, path: &Path) -> Result<T, CliError> {
    toml::from_str(source).map_err(|e| CliError::Toml {
        file: path.to_path_buf(),
        source_text: source.to_string(),
        message: e.message().to_string(),
        span: e.span(),
    })
}
