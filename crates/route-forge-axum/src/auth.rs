use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use route_forge_backend::{AuthContext, AuthError};

/// Trait for authenticating API requests and producing an [`AuthContext`].
///
/// Uses `Pin<Box<dyn Future>>` for object safety (stored as `Arc<dyn AuthProvider>`).
///
/// Registering a provider turns on authentication for every generated route;
/// the route's scope then comes from the model's roles.
pub trait AuthProvider: Send + Sync {
    /// Strategy name recorded in each route's auth configuration.
    fn strategy(&self) -> &str;

    /// Authenticate the request and produce an [`AuthContext`].
    fn authenticate<'a>(
        &'a self,
        parts: &'a Parts,
    ) -> Pin<Box<dyn Future<Output = Result<AuthContext, AuthError>> + Send + 'a>>;
}

/// Bearer-token provider backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, AuthContext>,
}

impl StaticTokenProvider {
    pub const STRATEGY: &'static str = "bearer";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, context: AuthContext) -> Self {
        self.tokens.insert(token.into(), context);
        self
    }

    fn bearer(parts: &Parts) -> Result<&str, AuthError> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?;
        let value = value.to_str().map_err(|_| AuthError::InvalidCredentials {
            reason: "authorization header is not valid UTF-8".into(),
        })?;
        value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(str::trim)
            .ok_or_else(|| AuthError::InvalidCredentials {
                reason: "expected a bearer token".into(),
            })
    }
}

impl AuthProvider for StaticTokenProvider {
    fn strategy(&self) -> &str {
        Self::STRATEGY
    }

    fn authenticate<'a>(
        &'a self,
        parts: &'a Parts,
    ) -> Pin<Box<dyn Future<Output = Result<AuthContext, AuthError>> + Send + 'a>> {
        Box::pin(async move {
            let token = Self::bearer(parts)?;
            self.tokens
                .get(token)
                .cloned()
                .ok_or_else(|| AuthError::InvalidCredentials {
                    reason: "unknown token".into(),
                })
        })
    }
}
