use std::fmt;
use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use route_forge_backend::{AuthError, BackendError};
use route_forge_core::SchemaError;

/// Errors returned by generated HTTP routes.
///
/// Each variant maps to a specific HTTP status code. The JSON body is always
/// `{ error, message, details? }`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    /// Request headers violate the header rules. Maps to 400.
    InvalidHeaders { details: Vec<String> },
    /// Request body failed payload validation. Maps to 400.
    ValidationFailed { details: Vec<String> },
    /// Query string could not be interpreted. Maps to 400.
    InvalidQuery { message: String },
    /// Missing or invalid anti-forgery token. Maps to 400.
    CsrfRejected { message: String },
    /// No valid credentials for a route that requires them. Maps to 401.
    Unauthorized { message: String },
    /// Credentials lack the route's scope. Maps to 403.
    Forbidden { message: String },
    /// Record not found by model + id. Maps to 404.
    RecordNotFound { model: String, id: String },
    /// No route for the method and path. Maps to 404.
    RouteNotFound { method: String, path: String },
    /// Request body did not arrive in time. Maps to 408.
    RequestTimeout { timeout: Duration },
    /// Upload body over the configured limit. Maps to 413.
    PayloadTooLarge { limit: usize },
    /// Client exhausted its request budget. Maps to 429.
    RateLimited { retry_after: Duration },
    /// Data layer unreachable. Maps to 502.
    BackendUnavailable { message: String },
    /// Internal error. Maps to 500.
    Internal { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeaders { details } => {
                write!(f, "invalid request headers: {}", details.join("; "))
            }
            Self::ValidationFailed { details } => {
                write!(f, "validation failed: {}", details.join("; "))
            }
            Self::InvalidQuery { message } => write!(f, "invalid query: {message}"),
            Self::CsrfRejected { message } => write!(f, "csrf check failed: {message}"),
            Self::Unauthorized { message } => write!(f, "unauthorized: {message}"),
            Self::Forbidden { message } => write!(f, "forbidden: {message}"),
            Self::RecordNotFound { model, id } => {
                write!(f, "record '{id}' not found in model '{model}'")
            }
            Self::RouteNotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            Self::RequestTimeout { timeout } => {
                write!(
                    f,
                    "request body not received within {}",
                    humantime::format_duration(*timeout)
                )
            }
            Self::PayloadTooLarge { limit } => {
                write!(f, "payload exceeds the limit of {limit} bytes")
            }
            Self::RateLimited { retry_after } => {
                write!(
                    f,
                    "rate limit exceeded, retry in {}",
                    humantime::format_duration(Duration::from_secs(retry_after.as_secs().max(1)))
                )
            }
            Self::BackendUnavailable { message } => write!(f, "backend unavailable: {message}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Returns the HTTP status code for this error variant.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidHeaders { .. }
            | Self::ValidationFailed { .. }
            | Self::InvalidQuery { .. }
            | Self::CsrfRejected { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::RecordNotFound { .. } | Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::RequestTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error kind string used in JSON responses.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidHeaders { .. } => "invalid_headers",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::InvalidQuery { .. } => "invalid_query",
            Self::CsrfRejected { .. } => "csrf_rejected",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::RouteNotFound { .. } => "route_not_found",
            Self::RequestTimeout { .. } => "request_timeout",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RateLimited { .. } => "rate_limited",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Internal { .. } => "internal_error",
        }
    }

    fn details(&self) -> Option<&[String]> {
        match self {
            Self::InvalidHeaders { details } | Self::ValidationFailed { details } => Some(details),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "error": self.error_kind(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = serde_json::json!(details);
        }
        let mut response = (status, axum::Json(body)).into_response();
        if let Self::RateLimited { retry_after } = &self {
            let seconds = retry_after.as_secs().max(1);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::RecordNotFound { model, id } => Self::RecordNotFound { model, id },
            BackendError::ValidationFailed { field, reason } => Self::ValidationFailed {
                details: vec![format!("field '{field}': {reason}")],
            },
            BackendError::ConnectionError { message } => Self::BackendUnavailable { message },
            BackendError::StorageError { .. } => Self::BackendUnavailable {
                message: err.to_string(),
            },
            BackendError::Internal { message } => Self::Internal { message },
            _ => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal { message } => Self::Internal { message },
            other => Self::Unauthorized {
                message: other.to_string(),
            },
        }
    }
}

/// Setup and lifecycle errors. Fatal at generation or start.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServerError {
    #[error("model '{0}' is registered more than once")]
    DuplicateModel(String),

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    #[error("no model store configured (call .with_store())")]
    MissingStore,

    #[error("model '{model}' declares uploads but no file storage is configured")]
    MissingStorage { model: String },

    #[error("custom routes for model '{model}' failed: {message}")]
    Hook { model: String, message: String },

    #[error("routes have not been generated yet")]
    RoutesNotGenerated,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,

    #[error("server task failed: {0}")]
    Serve(String),

    #[error("invalid csrf key: {0}")]
    CsrfKey(String),

    #[error("invalid rate limiting settings: {0}")]
    RateLimit(String),

    #[error("plugin '{name}' failed: {message}")]
    Plugin { name: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn display_messages() {
        let err = ApiError::RecordNotFound {
            model: "test".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "record 'abc' not found in model 'test'");

        let err = ApiError::ValidationFailed {
            details: vec!["\"name\" is required".into(), "\"age\" must be an integer".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("name"));
        assert!(msg.contains("age"));

        let err = ApiError::RequestTimeout {
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::InvalidHeaders { details: vec![] }, StatusCode::BAD_REQUEST),
            (ApiError::ValidationFailed { details: vec![] }, StatusCode::BAD_REQUEST),
            (
                ApiError::CsrfRejected {
                    message: "x".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Unauthorized {
                    message: "x".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Forbidden {
                    message: "x".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::RouteNotFound {
                    method: "GET".into(),
                    path: "/x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::RequestTimeout {
                    timeout: Duration::from_secs(1),
                },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (ApiError::PayloadTooLarge { limit: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (
                ApiError::RateLimited {
                    retry_after: Duration::from_secs(3),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::BackendUnavailable {
                    message: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal {
                    message: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "status for {err:?}");
        }
    }

    #[tokio::test]
    async fn into_response_has_json_body() {
        let err = ApiError::ValidationFailed {
            details: vec!["\"name\" is required".into()],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "validation_failed");
        assert_eq!(json["details"][0], "\"name\" is required");
    }

    #[tokio::test]
    async fn details_omitted_when_not_applicable() {
        let response = ApiError::Forbidden {
            message: "nope".into(),
        }
        .into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_millis(200),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "1");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "rate_limited");
        assert_eq!(json["message"], "rate limit exceeded, retry in 1s");
    }

    #[test]
    fn from_backend_errors() {
        let err: ApiError = BackendError::RecordNotFound {
            model: "test".into(),
            id: "1".into(),
        }
        .into();
        assert!(matches!(err, ApiError::RecordNotFound { ref id, .. } if id == "1"));

        let err: ApiError = BackendError::ConnectionError {
            message: "refused".into(),
        }
        .into();
        assert!(matches!(err, ApiError::BackendUnavailable { message } if message == "refused"));

        let err: ApiError = BackendError::ValidationFailed {
            field: "file".into(),
            reason: "bad name".into(),
        }
        .into();
        assert!(matches!(err, ApiError::ValidationFailed { details } if details.len() == 1));
    }

    #[test]
    fn from_auth_errors() {
        let err: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let err: ApiError = AuthError::Internal {
            message: "db".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn server_error_messages() {
        let err = ServerError::DuplicateRoute {
            method: "GET".into(),
            path: "/test".into(),
        };
        assert_eq!(err.to_string(), "route GET /test is already registered");
        let err: ServerError = SchemaError::InvalidModelName("1x".into()).into();
        assert!(err.to_string().contains("invalid model name"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
        assert_send_sync::<ServerError>();
    }
}
