//! HTTP inbound adapter exposing REST endpoints.
//!
//! Business handlers declare an [`pipeline::Endpoint`] and hand their
//! operation to the shared [`pipeline::RequestPipeline`], which owns
//! authorization, auditing, payload validation and response shaping.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod request;
pub mod routes;
pub mod schemas;
pub mod state;
pub mod stocks;
pub mod throttle;
pub mod users;
pub mod validation;

pub use routes::{API_PREFIX, api_scope};
