//! REST gateway for the portal backend.
//!
//! - `RecordGateway`: the contract the cache and workflows call through
//! - `ApiClient`: the reqwest implementation, bearer-token authenticated
//! - `wire`: JSON shapes of requests and responses, and their normalization
//!   into domain models

pub mod client;
pub mod error;
pub mod gateway;
pub mod wire;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use gateway::RecordGateway;
