//! Session handling for the signed-in actor.
//!
//! Tokens are issued by the portal's own login flow; this module only keeps
//! them:
//! - `TokenStore`: the bearer token in the OS keychain
//! - `Session`: the actor and issue time on disk, expiring after a day

pub mod credentials;
pub mod session;

pub use credentials::TokenStore;
pub use session::{Session, SessionData};
