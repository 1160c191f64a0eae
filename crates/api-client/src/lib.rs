//! REST client for the monitoring backend

pub mod client;
pub mod endpoints;

pub use client::{unwrap_envelope, ApiClient, ApiClientConfig, ApiPayload, QueryParams};
