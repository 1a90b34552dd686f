//! HTTP surface
//!
//! `POST /new`, `GET /status`, `GET /getresult` behind the `x-api-token`
//! header, plus an unauthenticated `GET /health`.

mod error;
mod routes;
mod server;

pub use error::ApiError;
pub use routes::{AppState, TOKEN_HEADER, router};
pub use server::serve;
