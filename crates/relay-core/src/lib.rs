//! Core types and error definitions for the Copilot relay.
//!
//! This crate provides the types shared by the upstream client and the HTTP
//! gateway.
//!
//! # Main types
//!
//! - [`RelayError`] — Unified error enum for every failure the relay reports.
//! - [`RelayResult`] — Convenience alias for `Result<T, RelayError>`.
//! - [`ModelSelector`] — Closed set of user-facing model names.
//! - [`ChatResponse`] — Aggregated text and citations of one chat turn.
//! - [`Citation`] — A reference attached to a generated answer.

/// Error taxonomy.
pub mod error;
/// Model selector enumeration.
pub mod model;
/// Aggregated chat response types.
pub mod response;

pub use error::{RelayError, RelayResult};
pub use model::ModelSelector;
pub use response::{ChatResponse, Citation};
