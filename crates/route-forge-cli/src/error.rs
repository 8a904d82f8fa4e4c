use std::path::PathBuf;

use route_forge_axum::ServerError;

/// Exit codes for the CLI process.
///
/// - 0: success
/// - 1: general error, including failed flow tasks
/// - 2: invalid arguments or configuration
/// - 3: malformed TOML input
/// - 10: the server could not bind or serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    GeneralError = 1,
    InvalidArguments = 2,
    ParseError = 3,
    ServeError = 10,
}

/// Errors returned by CLI command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A TOML document could not be deserialized.
    #[error("invalid TOML in {file}: {message}")]
    Toml {
        file: PathBuf,
        source_text: String,
        message: String,
        span: Option<std::ops::Range<usize>>,
    },

    /// Route generation or server lifecycle failure.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration error: {message}")]
    Config { message: String },

    /// No model is selected by the configuration or the `--model` filter.
    #[error("no models configured")]
    NoModels,

    #[error("model '{name}' not found")]
    ModelNotFound { name: String },

    /// One or more flow tasks did not meet their expectation.
    #[error("{failed} of {total} flow tasks failed")]
    FlowFailed { failed: usize, total: usize },

    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Maps this error to the appropriate exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Toml { .. } => ExitCode::ParseError,
            Self::Server(ServerError::Bind { .. } | ServerError::Serve(_)) => ExitCode::ServeError,
            Self::Server(_) | Self::Config { .. } | Self::NoModels | Self::ModelNotFound { .. } => {
                ExitCode::InvalidArguments
            }
            Self::Io { .. } | Self::FlowFailed { .. } | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Serializes this error as a JSON value for `--format json` output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Toml { file, message, .. } => serde_json::json!({
                "error": "parse_error",
                "file": file.display().to_string(),
                "message": message,
            }),
            Self::Server(e) => serde_json::json!({
                "error": "server_error",
                "message": e.to_string(),
            }),
            Self::Io { path, source } => serde_json::json!({
                "error": "io_error",
                "path": path.display().to_string(),
                "message": source.to_string(),
            }),
            Self::Config { message } => serde_json::json!({
                "error": "config_error",
                "message": message,
            }),
            Self::FlowFailed { failed, total } => serde_json::json!({
                "error": "flow_failed",
                "failed": failed,
                "total": total,
            }),
            other => serde_json::json!({
                "error": "error",
                "message": other.to_string(),
            }),
        }
    }
}
