//! Request middleware.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use log::{debug, warn};

use super::error::ApiError;
use super::state::AppState;
use crate::auth::RequestContext;

/// Header carrying the caller's request id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Attach a [`RequestContext`] to every request.
///
/// The request id is taken from `x-request-id` when present and echoed on the
/// response. The context's cancellation token is a child of the server
/// shutdown token and is cancelled when this middleware's future is dropped,
/// so a timed-out request aborts its in-flight storage call.
pub async fn request_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_owned);

    let ctx = match request_id {
        Some(id) => RequestContext::new(id),
        None => RequestContext::generate(),
    }
    .with_cancellation(state.shutdown.child_token());

    let _cancel_on_drop = ctx.cancellation().clone().drop_guard();
    let header_value = HeaderValue::from_str(ctx.request_id()).ok();

    req.extensions_mut().insert(ctx);
    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

/// Require the admin bearer token on administrative routes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.admin_guarded() {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token_from_header);

    match token {
        Some(token) if state.admin_token_matches(token) => {
            debug!("admin token accepted");
            Ok(next.run(req).await)
        }
        Some(_) => {
            warn!("admin token rejected");
            Err(ApiError::unauthorized("invalid admin token"))
        }
        None => Err(ApiError::unauthorized("missing admin token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_from_header_valid() {
        assert_eq!(bearer_token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token_from_header("bearer   token123"), Some("token123"));
        assert_eq!(
            bearer_token_from_header("   Bearer\tmixed-case "),
            Some("mixed-case")
        );
    }

    #[test]
    fn test_bearer_token_from_header_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "Token something",
            "Bearer token extra",
            "bear token",
        ];

        for case in cases {
            assert!(
                bearer_token_from_header(case).is_none(),
                "{case} should fail"
            );
        }
    }
}
