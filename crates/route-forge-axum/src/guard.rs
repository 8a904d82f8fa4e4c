//! Authentication middleware and per-route authorization.

use axum::extract::{Request, State};
use axum::http::Extensions;
use axum::middleware::Next;
use axum::response::Response;
use route_forge_backend::{AuthContext, AuthError};

use crate::error::ApiError;
use crate::route::AuthConfig;
use crate::state::ForgeState;

/// Result of running the auth provider, stored in request extensions.
///
/// Failures are recorded instead of rejected so that routes with auth
/// disabled still answer unauthenticated callers.
#[derive(Debug, Clone)]
pub struct AuthOutcome(pub Result<AuthContext, AuthError>);

/// Middleware that authenticates API requests using the configured
/// [`AuthProvider`](crate::auth::AuthProvider).
///
/// Without a provider, requests pass through untouched.
pub async fn auth_middleware(
    State(state): State<ForgeState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ref provider) = state.auth_provider else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    let outcome = provider.authenticate(&parts).await;
    if let Err(ref err) = outcome {
        tracing::debug!(uri = %parts.uri, error = %err, "authentication failed");
    }
    parts.extensions.insert(AuthOutcome(outcome));
    next.run(Request::from_parts(parts, body)).await
}

/// Applies a route's auth requirement to the outcome recorded by
/// [`auth_middleware`].
pub fn authorize<'a>(
    config: &AuthConfig,
    extensions: &'a Extensions,
) -> Result<Option<&'a AuthContext>, ApiError> {
    let AuthConfig::Required { scope, .. } = config else {
        return Ok(None);
    };
    let context = match extensions.get::<AuthOutcome>() {
        Some(AuthOutcome(Ok(context))) => context,
        Some(AuthOutcome(Err(err))) => return Err(err.clone().into()),
        None => return Err(AuthError::MissingCredentials.into()),
    };
    match scope {
        Some(scope) if !scope.permits(context) => Err(ApiError::Forbidden {
            message: format!(
                "principal '{}' lacks required scope '{scope}'",
                context.principal
            ),
        }),
        _ => Ok(Some(context)),
    }
}
