//! Amana HTTP Server - REST API over the book catalogue
//!
//! Read endpoints serve straight from the in-memory catalogue; the two write
//! endpoints sit behind a static token gate and persist every change.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tracing;

pub use api::{CreateBookResponse, CreateReviewResponse, HealthResponse};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
