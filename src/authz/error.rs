use axum::http::StatusCode;

use super::store::StoreError;

/// Why an authorization check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// A permission code was empty or lacked the `resource:action` separator.
    InvalidPermissionCode,
    /// No user is known for the caller identifier.
    UserNotFound,
    /// The user exists but carries a deletion marker.
    UserDeleted,
    /// The user lacks the required role or permission.
    InsufficientPermissions,
}

impl AuthErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthErrorKind::InvalidPermissionCode => StatusCode::BAD_REQUEST,
            AuthErrorKind::UserNotFound => StatusCode::NOT_FOUND,
            AuthErrorKind::UserDeleted => StatusCode::FORBIDDEN,
            AuthErrorKind::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidPermissionCode => "invalid_permission_code",
            AuthErrorKind::UserNotFound => "user_not_found",
            AuthErrorKind::UserDeleted => "user_deleted",
            AuthErrorKind::InsufficientPermissions => "insufficient_permissions",
        }
    }
}

/// The single error kind produced by authorization failures.
///
/// Carries a machine-readable [`AuthErrorKind`] and the status code handlers
/// should answer with, so callers can match on the cause without parsing
/// the message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    kind: AuthErrorKind,
    message: String,
    status: StatusCode,
}

impl AuthError {
    fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.status(),
        }
    }

    pub fn invalid_permission_code(code: &str) -> Self {
        Self::new(
            AuthErrorKind::InvalidPermissionCode,
            format!("InvalidPermissionCode: {code:?} must have the form resource:action"),
        )
    }

    pub fn user_not_found() -> Self {
        Self::new(AuthErrorKind::UserNotFound, "User not found")
    }

    pub fn user_deleted() -> Self {
        Self::new(AuthErrorKind::UserDeleted, "User is deleted")
    }

    /// `operation` is appended as `" for {operation}"` when present and non-empty.
    pub fn insufficient_permissions(operation: Option<&str>) -> Self {
        let message = match operation.map(str::trim).filter(|op| !op.is_empty()) {
            Some(op) => format!("Insufficient permissions for {op}"),
            None => "Insufficient permissions".to_string(),
        };
        Self::new(AuthErrorKind::InsufficientPermissions, message)
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Failure of an enforcement check: either a denial or an identity store
/// failure passed through untouched.
#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    #[error(transparent)]
    Denied(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthzError {
    /// The denial, if this failure is one.
    pub fn as_denied(&self) -> Option<&AuthError> {
        match self {
            AuthzError::Denied(err) => Some(err),
            AuthzError::Store(_) => None,
        }
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_taxonomy() {
        assert_eq!(AuthError::user_not_found().to_string(), "User not found");
        assert_eq!(AuthError::user_deleted().to_string(), "User is deleted");
        assert_eq!(AuthError::insufficient_permissions(None).to_string(), "Insufficient permissions");
        assert_eq!(
            AuthError::insufficient_permissions(Some("user query")).to_string(),
            "Insufficient permissions for user query"
        );
    }

    #[test]
    fn blank_operation_name_is_not_appended() {
        assert_eq!(AuthError::insufficient_permissions(Some("  ")).message(), "Insufficient permissions");
    }

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(AuthError::invalid_permission_code("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::user_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::user_deleted().status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::insufficient_permissions(None).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn authz_error_exposes_denial() {
        let err = AuthzError::from(AuthError::user_deleted());
        assert_eq!(err.as_denied().map(AuthError::kind), Some(AuthErrorKind::UserDeleted));
        assert_eq!(err.to_string(), "User is deleted");

        let err = AuthzError::from(StoreError::Unavailable("down".to_string()));
        assert!(err.as_denied().is_none());
    }
}
