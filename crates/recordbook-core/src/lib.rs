//! Recordbook core - client library for the student/faculty records portal.
//!
//! Keeps a client-side cache of portal data and drives the review workflow
//! students and faculty share:
//!
//! - `api`: the request gateway contract and its reqwest implementation
//! - `cache`: per-domain entries, staleness, and deduplicated fetching
//! - `workflow`: review decisions, submissions, and club enrollment
//! - `portal`: one actor's view of all of the above
//! - `auth`, `config`: session, token, and settings persistence

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod portal;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, RecordGateway};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use portal::Portal;
