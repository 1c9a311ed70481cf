//! Identity service: login, registration, app provisioning and role management.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use super::context::RequestContext;
use super::error::{AuthError, ErrorKind};
use super::password::{BcryptHasher, PasswordHasher};
use super::roles::validate_roles;
use super::token::{JwtIssuer, TokenClaims, TokenIssuer, verify_token};
use crate::storage::{AppStore, StorageError, UserStore};

const OP_LOGIN: &str = "auth.login";
const OP_REGISTER: &str = "auth.register_new_user";
const OP_CREATE_APP: &str = "auth.create_app";
const OP_SET_ROLES: &str = "auth.set_roles";
const OP_GET_ROLES: &str = "auth.get_roles";
const OP_DELETE_USER: &str = "auth.delete_user";
const OP_VALIDATE_TOKEN: &str = "auth.validate_token";

/// Orchestrates credential verification, token minting and role management.
///
/// Stateless between calls and cheap to clone; every collaborator sits behind
/// an `Arc`. Each operation takes a [`RequestContext`] that scopes its span and
/// carries the request's cancellation token.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    apps: Arc<dyn AppStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    token_ttl: Duration,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    /// Create a service using bcrypt at the default cost and HS256 tokens.
    pub fn new(users: Arc<dyn UserStore>, apps: Arc<dyn AppStore>, token_ttl: Duration) -> Self {
        Self {
            users,
            apps,
            hasher: Arc::new(BcryptHasher::default()),
            issuer: Arc::new(JwtIssuer::new()),
            token_ttl,
        }
    }

    /// Replace the password hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the token issuer.
    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Verify credentials and mint a token scoped to `app_id`.
    ///
    /// An unknown email and a wrong password produce the same error.
    #[instrument(skip_all, fields(op = OP_LOGIN, request_id = %ctx.request_id(), email = %email, app_id = app_id))]
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
        app_id: i64,
    ) -> Result<String, AuthError> {
        info!("attempting to login user");

        let user = match ctx
            .run(self.users.user(email))
            .await
            .map_err(|_| cancelled(OP_LOGIN))?
        {
            Ok(user) => Some(user),
            Err(StorageError::UserNotFound) => None,
            Err(e) => {
                error!(error = %e, "failed to get user");
                return Err(AuthError::internal(OP_LOGIN, e));
            }
        };

        let stored_hash = user.as_ref().map(|u| u.pass_hash.clone());
        let matched = self
            .verify_password(ctx, OP_LOGIN, password, stored_hash)
            .await?;

        let user = match user {
            Some(user) if matched => user,
            _ => {
                warn!("invalid credentials");
                return Err(AuthError::new(OP_LOGIN, ErrorKind::InvalidCredentials));
            }
        };

        let app = ctx
            .run(self.apps.app(app_id))
            .await
            .map_err(|_| cancelled(OP_LOGIN))?
            .map_err(|e| {
                warn!(error = %e, "failed to get app");
                storage_error(OP_LOGIN, e)
            })?;

        if ctx.is_cancelled() {
            return Err(cancelled(OP_LOGIN));
        }

        let token = self
            .issuer
            .mint(&user, &app, self.token_ttl)
            .map_err(|e| {
                error!(error = %e, "cannot generate token");
                AuthError::internal(OP_LOGIN, e)
            })?;

        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Register a user and return the assigned id.
    #[instrument(skip_all, fields(op = OP_REGISTER, request_id = %ctx.request_id(), email = %email))]
    pub async fn register_new_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<i64, AuthError> {
        info!("registering new user");

        let pass_hash = self.hash_password(ctx, OP_REGISTER, password).await?;

        let id = ctx
            .run(self.users.save_user(email, &pass_hash))
            .await
            .map_err(|_| cancelled(OP_REGISTER))?
            .map_err(|e| {
                if matches!(e, StorageError::UserExists) {
                    warn!("user already exists");
                } else {
                    error!(error = %e, "failed to save user");
                }
                storage_error(OP_REGISTER, e)
            })?;

        info!(user_id = id, "user registered");
        Ok(id)
    }

    /// Register an application and return the assigned id.
    #[instrument(skip_all, fields(op = OP_CREATE_APP, request_id = %ctx.request_id(), name = %name))]
    pub async fn create_app(
        &self,
        ctx: &RequestContext,
        name: &str,
        secret: &str,
    ) -> Result<i64, AuthError> {
        let app_id = ctx
            .run(self.apps.save_app(name, secret))
            .await
            .map_err(|_| cancelled(OP_CREATE_APP))?
            .map_err(|e| {
                if matches!(e, StorageError::AppExists) {
                    warn!("app already exists");
                } else {
                    error!(error = %e, "failed to save app");
                }
                storage_error(OP_CREATE_APP, e)
            })?;

        info!(app_id, "app created");
        Ok(app_id)
    }

    /// Replace the user's role set.
    ///
    /// Every role is validated before storage is touched; one unknown role
    /// rejects the whole request.
    #[instrument(skip_all, fields(op = OP_SET_ROLES, request_id = %ctx.request_id(), email = %email))]
    pub async fn set_roles<S: AsRef<str>>(
        &self,
        ctx: &RequestContext,
        email: &str,
        roles: &[S],
    ) -> Result<(), AuthError> {
        let roles = validate_roles(roles).map_err(|rejected| {
            warn!(?rejected, "invalid roles");
            AuthError::new(OP_SET_ROLES, ErrorKind::InvalidRoles)
        })?;

        ctx.run(self.users.set_roles(email, &roles))
            .await
            .map_err(|_| cancelled(OP_SET_ROLES))?
            .map_err(|e| {
                warn!(error = %e, "failed to set roles");
                storage_error(OP_SET_ROLES, e)
            })?;

        info!(?roles, "roles set");
        Ok(())
    }

    /// Current role set of the user.
    #[instrument(skip_all, fields(op = OP_GET_ROLES, request_id = %ctx.request_id(), email = %email))]
    pub async fn get_roles(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Vec<String>, AuthError> {
        let roles = ctx
            .run(self.users.roles(email))
            .await
            .map_err(|_| cancelled(OP_GET_ROLES))?
            .map_err(|e| {
                warn!(error = %e, "failed to get roles");
                storage_error(OP_GET_ROLES, e)
            })?;

        info!("got roles");
        Ok(roles)
    }

    /// Delete the user. Deleting an absent user fails.
    #[instrument(skip_all, fields(op = OP_DELETE_USER, request_id = %ctx.request_id(), email = %email))]
    pub async fn delete_user(&self, ctx: &RequestContext, email: &str) -> Result<(), AuthError> {
        ctx.run(self.users.delete_user(email))
            .await
            .map_err(|_| cancelled(OP_DELETE_USER))?
            .map_err(|e| {
                warn!(error = %e, "failed to delete user");
                storage_error(OP_DELETE_USER, e)
            })?;

        info!("user deleted");
        Ok(())
    }

    /// Verify a token against the secret of `app_id` and return its claims.
    #[instrument(skip_all, fields(op = OP_VALIDATE_TOKEN, request_id = %ctx.request_id(), app_id = app_id))]
    pub async fn validate_token(
        &self,
        ctx: &RequestContext,
        token: &str,
        app_id: i64,
    ) -> Result<TokenClaims, AuthError> {
        let app = ctx
            .run(self.apps.app(app_id))
            .await
            .map_err(|_| cancelled(OP_VALIDATE_TOKEN))?
            .map_err(|e| storage_error(OP_VALIDATE_TOKEN, e))?;

        let claims = verify_token(token, &app.secret).map_err(|e| {
            warn!(error = %e, "token rejected");
            AuthError::new(OP_VALIDATE_TOKEN, ErrorKind::InvalidCredentials).with_source(e)
        })?;

        if claims.app_id != app.id {
            warn!(token_app_id = claims.app_id, "token scoped to another app");
            return Err(AuthError::new(
                OP_VALIDATE_TOKEN,
                ErrorKind::InvalidCredentials,
            ));
        }

        Ok(claims)
    }

    async fn hash_password(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        password: &str,
    ) -> Result<Vec<u8>, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let task = tokio::task::spawn_blocking(move || hasher.hash(&password));

        ctx.run(task)
            .await
            .map_err(|_| cancelled(op))?
            .map_err(|e| AuthError::internal(op, e))?
            .map_err(|e| {
                error!(error = %e, "failed to generate password hash");
                AuthError::internal(op, e)
            })
    }

    /// Compare `password` with `stored_hash`, or burn one verification against
    /// the decoy hash when there is no stored hash.
    async fn verify_password(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        password: &str,
        stored_hash: Option<Vec<u8>>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let task = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                let _ = hasher.verify(&password, hasher.decoy_hash());
                false
            }
        });

        ctx.run(task)
            .await
            .map_err(|_| cancelled(op))?
            .map_err(|e| AuthError::internal(op, e))
    }
}

fn cancelled(op: &'static str) -> AuthError {
    warn!(op, "request cancelled");
    AuthError::new(op, ErrorKind::Cancelled)
}

/// Translate a storage failure into the caller-facing taxonomy.
///
/// A missing user is reported as invalid credentials so management calls do
/// not reveal whether an account exists.
fn storage_error(op: &'static str, err: StorageError) -> AuthError {
    let kind = match err {
        StorageError::UserNotFound => ErrorKind::InvalidCredentials,
        StorageError::UserExists => ErrorKind::UserExists,
        StorageError::AppExists => ErrorKind::AppExists,
        StorageError::AppNotFound => ErrorKind::AppNotFound,
        StorageError::Database(_) | StorageError::Backend(_) => {
            return AuthError::internal(op, err);
        }
    };
    AuthError::new(op, kind)
}
