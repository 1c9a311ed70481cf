//! API route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers;
use super::middleware::{request_context, require_admin};
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Tracing layer with request timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/validate", post(handlers::validate_token));

    // Administrative routes (guarded when an admin token is configured)
    let admin_routes = Router::new()
        .route("/apps", post(handlers::create_app))
        .route(
            "/users/{email}/roles",
            get(handlers::get_roles).put(handlers::set_roles),
        )
        .route("/users/{email}", delete(handlers::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Outermost first. The timeout sits outside the context middleware so an
    // expired request drops it, which cancels the request's token.
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(TimeoutLayer::new(state.timeout))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    request_context,
                )),
        )
        .with_state(state)
}
