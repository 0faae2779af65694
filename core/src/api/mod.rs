//! API Module
//!
//! HTTP API for banks, administrators and the engine callback.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ApiError;
pub use handlers::{ApiState, SharedEngine};
pub use routes::create_router;
