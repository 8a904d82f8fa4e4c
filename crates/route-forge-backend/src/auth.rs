use std::collections::BTreeMap;
use std::fmt;

/// Authenticated caller of a generated route.
///
/// Produced by the auth provider and placed into request extensions, where
/// handlers read it to enforce the route's scope.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Stable identifier of the caller (user id, service name, ...).
    pub principal: String,
    /// Scopes (roles) granted to the caller.
    pub scopes: Vec<String>,
    /// Additional attributes from the authentication source.
    pub attributes: BTreeMap<String, String>,
}

impl AuthContext {
    pub fn new(principal: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            principal: principal.into(),
            scopes,
            attributes: BTreeMap::new(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns `true` if the caller holds any of `scopes`.
    pub fn has_any_scope(&self, scopes: &[String]) -> bool {
        scopes.iter().any(|s| self.scopes.contains(s))
    }
}

/// Errors that can occur during authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// No authentication credentials provided.
    MissingCredentials,
    /// Authentication credentials are invalid or expired.
    InvalidCredentials { reason: String },
    /// An internal error occurred during authentication.
    Internal { message: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => {
                write!(f, "no authentication credentials provided")
            }
            Self::InvalidCredentials { reason } => {
                write!(f, "invalid credentials: {reason}")
            }
            Self::Internal { message } => {
                write!(f, "authentication error: {message}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_context(scopes: Vec<&str>) -> AuthContext {
        AuthContext::new("user_1", scopes.into_iter().map(String::from).collect())
    }

    #[test]
    fn has_scope_matches_exactly() {
        let ctx = make_context(vec!["admin", "member"]);
        assert!(ctx.has_scope("admin"));
        assert!(!ctx.has_scope("Admin"));
    }

    #[test]
    fn has_any_scope_returns_true_when_one_matches() {
        let ctx = make_context(vec!["member"]);
        assert!(ctx.has_any_scope(&["admin".to_string(), "member".to_string()]));
    }

    #[test]
    fn has_any_scope_returns_false_for_empty_input() {
        let ctx = make_context(vec!["admin"]);
        assert!(!ctx.has_any_scope(&[]));
    }

    #[test]
    fn auth_error_display() {
        assert!(AuthError::MissingCredentials
            .to_string()
            .contains("no authentication credentials"));
        let err = AuthError::InvalidCredentials {
            reason: "token expired".into(),
        };
        assert!(err.to_string().contains("token expired"));
        let err = AuthError::Internal {
            message: "db timeout".into(),
        };
        assert!(err.to_string().contains("db timeout"));
    }

    #[test]
    fn auth_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthError>();
        assert_send_sync::<AuthContext>();
    }
}
