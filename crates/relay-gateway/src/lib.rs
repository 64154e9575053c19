//! HTTP surface of the relay.
//!
//! One chat endpoint (`/` and `/api/copilot`) accepting
//! `POST {"message": "...", "model": "..."}`, plus `GET /health`. Every
//! response carries permissive CORS headers.

/// Chat request handling and error mapping.
pub mod handler;
/// CORS middleware.
pub mod middleware;
/// Router construction.
pub mod server;

pub use handler::{ApiError, ChatRequest};
pub use server::{AppState, GatewayServer};
