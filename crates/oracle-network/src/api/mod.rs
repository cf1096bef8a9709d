//! HTTP API for the oracle network

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, ApiState, CALLER_HEADER};
pub use routes::create_router;
