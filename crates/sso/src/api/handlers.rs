//! HTTP handlers for the identity service.
//!
//! Handlers check request shape (non-empty fields, ids present) and delegate
//! every security decision to [`IdentityService`](crate::auth::IdentityService).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{RequestContext, TokenClaims};

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub app_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    require_field("email", &req.email)?;
    require_field("password", &req.password)?;
    require_id("app_id", req.app_id)?;

    let token = state
        .identity
        .login(&ctx, &req.email, &req.password, req.app_id)
        .await?;

    Ok(Json(LoginResponse { token }))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    require_field("email", &req.email)?;
    require_field("password", &req.password)?;

    let user_id = state
        .identity
        .register_new_user(&ctx, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

#[derive(Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
    pub app_id: i64,
}

pub async fn validate_token(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<ValidateTokenRequest>,
) -> ApiResult<Json<TokenClaims>> {
    require_field("token", &req.token)?;
    require_id("app_id", req.app_id)?;

    let claims = state
        .identity
        .validate_token(&ctx, &req.token, req.app_id)
        .await?;

    Ok(Json(claims))
}

#[derive(Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAppResponse {
    pub app_id: i64,
}

pub async fn create_app(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateAppRequest>,
) -> ApiResult<(StatusCode, Json<CreateAppResponse>)> {
    require_field("name", &req.name)?;
    require_field("secret", &req.secret)?;

    let app_id = state
        .identity
        .create_app(&ctx, &req.name, &req.secret)
        .await?;

    Ok((StatusCode::CREATED, Json(CreateAppResponse { app_id })))
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub email: String,
    pub roles: Vec<String>,
}

pub async fn get_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(email): Path<String>,
) -> ApiResult<Json<RolesResponse>> {
    require_field("email", &email)?;

    let roles = state.identity.get_roles(&ctx, &email).await?;
    Ok(Json(RolesResponse { email, roles }))
}

#[derive(Deserialize)]
pub struct SetRolesRequest {
    pub roles: Vec<String>,
}

pub async fn set_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(email): Path<String>,
    Json(req): Json<SetRolesRequest>,
) -> ApiResult<StatusCode> {
    require_field("email", &email)?;

    state.identity.set_roles(&ctx, &email, &req.roles).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(email): Path<String>,
) -> ApiResult<StatusCode> {
    require_field("email", &email)?;

    state.identity.delete_user(&ctx, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_field(name: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{name} is required")));
    }
    Ok(())
}

fn require_id(name: &str, value: i64) -> ApiResult<()> {
    if value <= 0 {
        return Err(ApiError::bad_request(format!("{name} is required")));
    }
    Ok(())
}
