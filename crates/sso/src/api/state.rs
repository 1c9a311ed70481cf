//! Application state shared across handlers.

use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::auth::IdentityService;

/// State shared by every handler and middleware.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The identity service.
    pub identity: IdentityService,
    /// Cancelled on server shutdown; each request gets a child token.
    pub shutdown: CancellationToken,
    /// Per-request timeout.
    pub timeout: Duration,
    /// SHA-256 of the admin token, when administrative routes are guarded.
    admin_token_digest: Option<[u8; 32]>,
}

impl AppState {
    pub fn new(identity: IdentityService) -> Self {
        Self {
            identity,
            shutdown: CancellationToken::new(),
            timeout: Duration::from_secs(10),
            admin_token_digest: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Guard administrative routes with a bearer token.
    pub fn with_admin_token(mut self, token: Option<&str>) -> Self {
        self.admin_token_digest = token.map(|t| Sha256::digest(t.as_bytes()).into());
        self
    }

    /// Whether administrative routes require a token.
    pub fn admin_guarded(&self) -> bool {
        self.admin_token_digest.is_some()
    }

    /// Check a presented admin token. Compares SHA-256 digests, never the raw token.
    pub fn admin_token_matches(&self, presented: &str) -> bool {
        match &self.admin_token_digest {
            None => true,
            Some(expected) => {
                let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
                presented == *expected
            }
        }
    }
}
