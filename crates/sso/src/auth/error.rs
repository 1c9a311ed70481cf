//! Identity service errors.
//!
//! An [`AuthError`] carries three things: the operation that failed, the
//! caller-facing [`ErrorKind`], and optionally the low-level cause. Callers
//! dispatch on [`AuthError::kind`]. The cause is reachable only through
//! [`std::error::Error::source`] for trusted logging and never appears in the
//! `Display` output.

use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong password, or unknown user. Deliberately ambiguous.
    InvalidCredentials,
    /// Email already registered.
    UserExists,
    /// Application name already registered.
    AppExists,
    /// One or more role names outside the fixed vocabulary.
    InvalidRoles,
    /// Unknown application id.
    AppNotFound,
    /// The request was cancelled before it completed.
    Cancelled,
    /// Any other failure (storage outage, hashing or signing failure).
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::UserExists => "user_exists",
            ErrorKind::AppExists => "app_exists",
            ErrorKind::InvalidRoles => "invalid_roles",
            ErrorKind::AppNotFound => "app_not_found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::InvalidCredentials => "invalid credentials",
            ErrorKind::UserExists => "user already exists",
            ErrorKind::AppExists => "app already exists",
            ErrorKind::InvalidRoles => "invalid roles",
            ErrorKind::AppNotFound => "app not found",
            ErrorKind::Cancelled => "request cancelled",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(text)
    }
}

/// Error returned by every identity service operation.
#[derive(Debug, Error)]
#[error("{op}: {kind}")]
pub struct AuthError {
    op: &'static str,
    kind: ErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl AuthError {
    /// Create an error without an underlying cause.
    pub fn new(op: &'static str, kind: ErrorKind) -> Self {
        Self {
            op,
            kind,
            source: None,
        }
    }

    /// Create an [`ErrorKind::Internal`] error wrapping `source`.
    pub fn internal(op: &'static str, source: impl Into<BoxError>) -> Self {
        Self::new(op, ErrorKind::Internal).with_source(source)
    }

    /// Attach the low-level cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The failure classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The operation label, e.g. `auth.login`.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_hides_source() {
        let err = AuthError::internal("auth.login", "connection refused by db-01");
        assert_eq!(err.to_string(), "auth.login: internal error");
        assert_eq!(err.kind(), ErrorKind::Internal);

        let source = err.source().expect("source retained");
        assert_eq!(source.to_string(), "connection refused by db-01");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::InvalidCredentials.as_str(), "invalid_credentials");
        assert_eq!(ErrorKind::InvalidRoles.to_string(), "invalid roles");
    }

    #[test]
    fn test_same_kind_same_message() {
        let unknown_user = AuthError::new("auth.login", ErrorKind::InvalidCredentials);
        let wrong_password = AuthError::new("auth.login", ErrorKind::InvalidCredentials)
            .with_source("password mismatch");

        assert_eq!(unknown_user.to_string(), wrong_password.to_string());
        assert!(unknown_user.is(ErrorKind::InvalidCredentials));
        assert_eq!(wrong_password.op(), "auth.login");
    }
}
