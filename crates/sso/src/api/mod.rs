//! HTTP API exposing the identity service.

mod error;
pub mod handlers;
mod middleware;
mod routes;
mod state;

pub use error::{ApiError, ErrorResponse};
pub use middleware::REQUEST_ID_HEADER;
pub use routes::create_router;
pub use state::AppState;
