//! Client-side domain cache.
//!
//! This module holds the last-known server truth for each data domain and
//! decides when it must be refetched:
//!
//! - `DomainStore`: one `DomainCacheEntry` per domain key, mutated only through
//!   begin/commit/fail fetch, patch, and invalidate
//! - `StalenessPolicy`: per-domain TTL (3 minutes for review lists, 5 minutes
//!   for dashboard summaries by default)
//! - `FetchCoordinator`: read-through fetching with in-flight deduplication

pub mod coordinator;
pub mod domain;
pub mod entry;
pub mod staleness;
pub mod store;

pub use coordinator::{FetchCoordinator, FetchSource};
pub use domain::{Domain, DomainData, DomainKey, EntityPatch};
pub use entry::DomainCacheEntry;
pub use staleness::{is_stale, StalenessPolicy};
pub use store::{CommitOutcome, DomainStore, FetchTicket};
