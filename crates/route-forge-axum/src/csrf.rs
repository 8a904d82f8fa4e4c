//! Signed anti-forgery tokens ("crumbs").
//!
//! A crumb is `nonce.signature`, both hex, where the signature is an
//! HMAC-SHA256 of the nonce under the server key. Any crumb signed with the
//! key is accepted; crumbs are not bound to a session.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::CsrfSettings;
use crate::error::{ApiError, ServerError};
use crate::state::ForgeState;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Path of the crumb-issuing route. Never prefixed.
pub const CSRF_PATH: &str = "/csrf";

#[derive(Clone)]
pub struct CsrfGuard {
    mac: HmacSha256,
}

impl std::fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfGuard").finish_non_exhaustive()
    }
}

impl CsrfGuard {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ServerError> {
        let mac = <HmacSha256 as hmac::digest::KeyInit>::new_from_slice(secret.as_ref())
            .map_err(|e| ServerError::CsrfKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// A guard with a random per-process key.
    pub fn random() -> Result<Self, ServerError> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::new(key)
    }

    /// Builds the guard described by `settings`, or `None` when disabled.
    pub fn from_settings(settings: &CsrfSettings) -> Result<Option<Self>, ServerError> {
        if !settings.enabled {
            return Ok(None);
        }
        match &settings.secret {
            Some(secret) => Self::new(secret).map(Some),
            None => Self::random().map(Some),
        }
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    pub fn issue(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let mut mac = self.mac();
        mac.update(nonce.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("{nonce}.{signature}")
    }

    pub fn verify(&self, crumb: &str) -> bool {
        let Some((nonce, signature)) = crumb.split_once('.') else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(nonce.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

fn is_unsafe(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Rejects unsafe requests without a valid crumb and attaches a fresh crumb
/// to every response.
pub async fn csrf_middleware(
    State(state): State<ForgeState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(guard) = state.csrf.clone() else {
        return next.run(request).await;
    };

    if is_unsafe(request.method()) {
        let presented = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok());
        let rejection = match presented {
            None => Some("missing x-csrf-token header"),
            Some(crumb) if !guard.verify(crumb) => Some("invalid x-csrf-token header"),
            Some(_) => None,
        };
        if let Some(message) = rejection {
            tracing::debug!(method = %request.method(), uri = %request.uri(), message, "csrf rejected");
            let mut response = ApiError::CsrfRejected {
                message: message.to_string(),
            }
            .into_response();
            attach(&guard, &mut response);
            return response;
        }
    }

    let mut response = next.run(request).await;
    attach(&guard, &mut response);
    response
}

fn attach(guard: &CsrfGuard, response: &mut Response) {
    if let Ok(value) = HeaderValue::from_str(&guard.issue()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CSRF_HEADER), value);
    }
}

/// Handler of [`CSRF_PATH`].
pub async fn crumb_handler(State(state): State<ForgeState>) -> Response {
    match state.csrf {
        Some(guard) => axum::Json(serde_json::json!({ "crumb": guard.issue() })).into_response(),
        None => ApiError::RouteNotFound {
            method: "GET".into(),
            path: CSRF_PATH.into(),
        }
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_crumb_verifies() {
        let guard = CsrfGuard::new("secret").unwrap();
        let crumb = guard.issue();
        assert!(guard.verify(&crumb));
    }

    #[test]
    fn crumbs_are_unique() {
        let guard = CsrfGuard::random().unwrap();
        assert_ne!(guard.issue(), guard.issue());
    }

    #[test]
    fn other_key_rejects() {
        let crumb = CsrfGuard::new("a").unwrap().issue();
        assert!(!CsrfGuard::new("b").unwrap().verify(&crumb));
    }

    #[test]
    fn tampered_or_malformed_crumbs_reject() {
        let guard = CsrfGuard::new("secret").unwrap();
        let crumb = guard.issue();
        let (nonce, sig) = crumb.split_once('.').unwrap();
        assert!(!guard.verify(&format!("{nonce}x.{sig}")));
        assert!(!guard.verify(nonce));
        assert!(!guard.verify(&format!("{nonce}.zz")));
        assert!(!guard.verify(""));
    }

    #[test]
    fn settings_toggle_guard() {
        assert!(CsrfGuard::from_settings(&CsrfSettings::default())
            .unwrap()
            .is_none());
        let settings = CsrfSettings {
            enabled: true,
            secret: Some("k".into()),
        };
        let guard = CsrfGuard::from_settings(&settings).unwrap().unwrap();
        assert!(CsrfGuard::new("k").unwrap().verify(&guard.issue()));
    }

    #[test]
    fn only_writes_are_checked() {
        assert!(is_unsafe(&Method::POST));
        assert!(is_unsafe(&Method::DELETE));
        assert!(!is_unsafe(&Method::GET));
        assert!(!is_unsafe(&Method::OPTIONS));
    }
}
