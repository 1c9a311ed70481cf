//! Authentication core.
//!
//! Provides the [`IdentityService`] and the pieces it orchestrates:
//! - bcrypt password hashing with constant-time verification
//! - HS256 session tokens scoped to one application's secret
//! - the fixed role vocabulary and its validation
//! - the caller-facing error taxonomy

mod context;
mod error;
mod password;
mod roles;
mod service;
mod token;

pub use context::{Cancelled, RequestContext};
pub use error::{AuthError, ErrorKind};
pub use password::{BcryptHasher, HashError, PasswordHasher};
pub use roles::{Role, validate_roles};
pub use service::IdentityService;
pub use token::{JwtIssuer, TokenClaims, TokenError, TokenIssuer, verify_token};
