//! The in-memory domain store.
//!
//! `DomainStore` is the only holder of last-known server truth. It is a cheap
//! handle over shared state: clone it into whatever needs access rather than
//! reaching for a global. All mutation goes through six operations:
//! `begin_fetch`, `commit_fetch`, `fail_fetch`, `patch`, `invalidate`, and the
//! read-only `get`.
//!
//! Every key carries a monotonic sequence. `begin_fetch`, a changing `patch`,
//! and `invalidate` each take the next number, and a commit only lands if no
//! later number has been applied. A read that was issued before a mutation
//! therefore cannot overwrite it when it completes afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{DomainCacheEntry, Domain, DomainData, DomainKey, EntityPatch};
use crate::clock::{Clock, SystemClock};
use crate::models::Submission;

/// Proof that a fetch was started for a key. Handed back on commit or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: DomainKey,
    seq: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &DomainKey {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Result of handing fetched data to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The data is now the entry's truth.
    Applied(DomainData),
    /// A later mutation won; the store kept its data. Carries what callers
    /// should see: the stored data when a patch landed after the read began
    /// (the fetched payload may predate it), otherwise the fetched data.
    Superseded(DomainData),
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied(_))
    }

    pub fn into_data(self) -> DomainData {
        match self {
            CommitOutcome::Applied(data) | CommitOutcome::Superseded(data) => data,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: DomainCacheEntry<DomainData>,
    /// Last sequence number handed out.
    issued: u64,
    /// Highest sequence whose effect is in `entry`.
    applied: u64,
    /// Sequence of the last patch that changed `entry`.
    patched: u64,
    /// Sequence of the fetch that owns the loading flag.
    loading_seq: Option<u64>,
}

impl Slot {
    fn next_seq(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }
}

#[derive(Clone)]
pub struct DomainStore {
    slots: Arc<Mutex<HashMap<DomainKey, Slot>>>,
    clock: Arc<dyn Clock>,
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<DomainKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the entry for `key`. Unknown keys read as empty entries.
    pub fn get(&self, key: &DomainKey) -> DomainCacheEntry<DomainData> {
        self.slots()
            .get(key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_default()
    }

    /// Mark `key` as loading. Returns `None` if a fetch already owns it.
    pub fn begin_fetch(&self, key: &DomainKey) -> Option<FetchTicket> {
        let mut slots = self.slots();
        let slot = slots.entry(key.clone()).or_default();
        if slot.entry.loading {
            debug!(key = %key, "begin_fetch refused, already loading");
            return None;
        }
        let seq = slot.next_seq();
        slot.entry.loading = true;
        slot.entry.error = None;
        slot.loading_seq = Some(seq);
        debug!(key = %key, seq, "fetch started");
        Some(FetchTicket {
            key: key.clone(),
            seq,
        })
    }

    /// Store fetched data for the ticket's key, unless a later mutation has
    /// already been applied.
    pub fn commit_fetch(&self, ticket: &FetchTicket, data: DomainData) -> CommitOutcome {
        if data.domain() != ticket.key.domain {
            warn!(key = %ticket.key, got = %data.domain(), "Committing data of a different domain");
        }
        let now = self.clock.now();
        let mut slots = self.slots();
        let slot = slots.entry(ticket.key.clone()).or_default();
        if slot.loading_seq == Some(ticket.seq) {
            slot.entry.loading = false;
            slot.loading_seq = None;
        }
        if ticket.seq < slot.applied {
            debug!(
                key = %ticket.key,
                seq = ticket.seq,
                applied = slot.applied,
                "Discarding superseded fetch result"
            );
            let visible = if slot.patched > ticket.seq {
                slot.entry.data.clone().unwrap_or(data)
            } else {
                data
            };
            return CommitOutcome::Superseded(visible);
        }
        slot.entry.data = Some(data.clone());
        slot.entry.last_fetched_at = Some(now);
        slot.entry.error = None;
        slot.applied = ticket.seq;
        CommitOutcome::Applied(data)
    }

    /// Record a failed fetch. Existing data is left untouched.
    pub fn fail_fetch(&self, ticket: &FetchTicket, error: &str) {
        let mut slots = self.slots();
        let slot = slots.entry(ticket.key.clone()).or_default();
        if slot.loading_seq == Some(ticket.seq) {
            slot.entry.loading = false;
            slot.loading_seq = None;
        }
        if ticket.seq >= slot.applied {
            slot.entry.error = Some(error.to_string());
        }
        debug!(key = %ticket.key, seq = ticket.seq, error, "fetch failed");
    }

    /// Update entity `id` in place in every loaded entry of `domain`.
    /// Returns how many entities changed.
    pub fn patch(&self, domain: Domain, id: &str, patch: &EntityPatch) -> usize {
        let mut changed = 0;
        for (key, slot) in self.slots().iter_mut().filter(|(key, _)| key.domain == domain) {
            let Some(data) = slot.entry.data.as_mut() else {
                continue;
            };
            let n = data.apply_patch(id, patch);
            if n > 0 {
                slot.applied = slot.next_seq();
                slot.patched = slot.applied;
                debug!(key = %key, id, "patched entity");
            }
            changed += n;
        }
        changed
    }

    /// Force the next read of every entry of `domain` to refetch.
    /// Returns how many entries were invalidated.
    pub fn invalidate(&self, domain: Domain) -> usize {
        let mut count = 0;
        for (key, slot) in self.slots().iter_mut().filter(|(key, _)| key.domain == domain) {
            slot.entry.last_fetched_at = None;
            slot.applied = slot.next_seq();
            debug!(key = %key, "invalidated");
            count += 1;
        }
        count
    }

    /// Invalidate the entries of `domain` that don't hold submission `id`.
    ///
    /// Pairs with [`patch`](Self::patch): entries that hold the submission
    /// were updated in place, the others (lists under a different filter,
    /// entries still loading) may now be missing it.
    pub fn invalidate_except(&self, domain: Domain, id: &str) -> usize {
        let mut count = 0;
        for (key, slot) in self.slots().iter_mut().filter(|(key, _)| key.domain == domain) {
            let holds = slot
                .entry
                .data
                .as_ref()
                .is_some_and(|data| data.find_submission(id).is_some());
            if holds {
                continue;
            }
            slot.entry.last_fetched_at = None;
            slot.applied = slot.next_seq();
            debug!(key = %key, id, "invalidated, entity not held");
            count += 1;
        }
        count
    }

    /// Look up a cached submission by id across every entry of `domain`.
    pub fn find_submission(&self, domain: Domain, id: &str) -> Option<Submission> {
        self.slots()
            .iter()
            .filter(|(key, _)| key.domain == domain)
            .filter_map(|(_, slot)| slot.entry.data.as_ref())
            .find_map(|data| data.find_submission(id).cloned())
    }

    /// Keys currently held for `domain`.
    pub fn keys(&self, domain: Domain) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self
            .slots()
            .keys()
            .filter(|key| key.domain == domain)
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
