//! Read-through caching over the domain store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use super::{DomainData, DomainKey, DomainStore, FetchTicket, StalenessPolicy};
use crate::error::{ClientError, ClientResult};

type SharedFetch = Shared<BoxFuture<'static, ClientResult<DomainData>>>;

/// Where a `fetch_domain` answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fresh cached data, no request made.
    Cache,
    /// This call started the request.
    Network,
    /// Another caller's request was already in flight and was awaited.
    Joined,
}

/// Orchestrates cache reads: serve fresh data, join in-flight requests, and
/// otherwise fetch and commit.
///
/// The in-flight check, `begin_fetch`, and registration of the shared request
/// all happen under one lock before the fetcher is first polled, so two reads
/// of the same key issued in the same tick produce one request. The request
/// runs as its own task and lands in the store even if every caller goes away.
#[derive(Clone)]
pub struct FetchCoordinator {
    store: DomainStore,
    policy: Arc<StalenessPolicy>,
    in_flight: Arc<Mutex<HashMap<DomainKey, SharedFetch>>>,
}

impl FetchCoordinator {
    pub fn new(store: DomainStore, policy: StalenessPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &DomainStore {
        &self.store
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<DomainKey, SharedFetch>> {
        lock_in_flight(&self.in_flight)
    }

    /// True if a request for `key` is currently outstanding.
    pub fn is_fetching(&self, key: &DomainKey) -> bool {
        self.in_flight().contains_key(key)
    }

    /// Return fresh cached data for `key`, or fetch it with `fetcher`.
    pub async fn fetch_domain<F, Fut>(&self, key: DomainKey, fetcher: F) -> ClientResult<DomainData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<DomainData>> + Send + 'static,
    {
        self.fetch_with_source(key, fetcher, false)
            .await
            .map(|(data, _)| data)
    }

    /// Fetch `key` regardless of staleness. Still joins a request that is
    /// already in flight.
    pub async fn refresh<F, Fut>(&self, key: DomainKey, fetcher: F) -> ClientResult<DomainData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<DomainData>> + Send + 'static,
    {
        self.fetch_with_source(key, fetcher, true)
            .await
            .map(|(data, _)| data)
    }

    /// Like [`fetch_domain`](Self::fetch_domain), also reporting where the
    /// answer came from.
    pub async fn fetch_with_source<F, Fut>(
        &self,
        key: DomainKey,
        fetcher: F,
        force: bool,
    ) -> ClientResult<(DomainData, FetchSource)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<DomainData>> + Send + 'static,
    {
        let (request, source) = {
            let mut in_flight = self.in_flight();

            if let Some(existing) = in_flight.get(&key) {
                debug!(key = %key, "joining in-flight fetch");
                (existing.clone(), FetchSource::Joined)
            } else {
                let entry = self.store.get(&key);
                if !force {
                    if let Some(data) = entry.data {
                        if !self
                            .policy
                            .is_stale(key.domain, entry.last_fetched_at, self.store.now())
                        {
                            debug!(key = %key, "cache hit");
                            return Ok((data, FetchSource::Cache));
                        }
                    }
                }

                let Some(ticket) = self.store.begin_fetch(&key) else {
                    warn!(key = %key, "Entry is loading outside the coordinator");
                    return Err(ClientError::FetchInProgress(key.to_string()));
                };
                debug!(key = %key, forced = force, "cache miss, fetching");

                // Spawned while the lock is held: the task cannot deregister
                // itself before it has been registered.
                let request = self.spawn_fetch(ticket, fetcher());
                in_flight.insert(key, request.clone());
                (request, FetchSource::Network)
            }
        };

        request.await.map(|data| (data, source))
    }

    fn spawn_fetch<Fut>(&self, ticket: FetchTicket, request: Fut) -> SharedFetch
    where
        Fut: Future<Output = ClientResult<DomainData>> + Send + 'static,
    {
        let store = self.store.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let task_ticket = ticket.clone();

        let task = tokio::spawn(async move {
            let outcome = match request.await {
                Ok(data) => Ok(store.commit_fetch(&task_ticket, data).into_data()),
                Err(err) => {
                    store.fail_fetch(&task_ticket, &err.to_string());
                    Err(err)
                }
            };
            lock_in_flight(&in_flight).remove(task_ticket.key());
            outcome
        });

        let store = self.store.clone();
        let in_flight = Arc::clone(&self.in_flight);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    // The task died before it could clean up after itself.
                    let err = ClientError::Network(format!("fetch task aborted: {}", join_err));
                    store.fail_fetch(&ticket, &err.to_string());
                    lock_in_flight(&in_flight).remove(ticket.key());
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock_in_flight(
    in_flight: &Mutex<HashMap<DomainKey, SharedFetch>>,
) -> MutexGuard<'_, HashMap<DomainKey, SharedFetch>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::{Domain, EntityPatch};
    use crate::clock::MockClock;
    use crate::models::{ClubDirectory, ResultsSheet};

    fn coordinator() -> (FetchCoordinator, MockClock) {
        let clock = MockClock::new();
        let store = DomainStore::with_clock(Arc::new(clock.clone()));
        (FetchCoordinator::new(store, StalenessPolicy::new()), clock)
    }

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, ClientResult<DomainData>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(DomainData::Results(ResultsSheet::default()))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_ttl_window_controls_network_calls() {
        let (coord, clock) = coordinator();
        let key = DomainKey::new(Domain::StudentHome);
        let calls = Arc::new(AtomicUsize::new(0));

        coord.fetch_domain(key.clone(), counting_fetcher(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance_minutes(1);
        let (_, source) = coord
            .fetch_with_source(key.clone(), counting_fetcher(&calls), false)
            .await
            .unwrap();
        assert_eq!(source, FetchSource::Cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance_minutes(5);
        coord.fetch_domain(key.clone(), counting_fetcher(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let (coord, _) = coordinator();
        let key = DomainKey::leave_requests(&Default::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            coord.fetch_with_source(key.clone(), counting_fetcher(&calls), false),
            coord.fetch_with_source(key.clone(), counting_fetcher(&calls), false),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().1, FetchSource::Network);
        assert_eq!(b.unwrap().1, FetchSource::Joined);
        assert!(!coord.is_fetching(&key));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_and_keeps_data() {
        let (coord, clock) = coordinator();
        let key = DomainKey::new(Domain::Results);
        let calls = Arc::new(AtomicUsize::new(0));
        coord.fetch_domain(key.clone(), counting_fetcher(&calls)).await.unwrap();
        clock.advance(Duration::minutes(10));

        let failing = || async { Err::<DomainData, _>(ClientError::Network("timeout".to_string())) };
        let (a, b) = tokio::join!(
            coord.fetch_domain(key.clone(), failing),
            coord.fetch_domain(key.clone(), failing),
        );
        assert_eq!(a, Err(ClientError::Network("timeout".to_string())));
        assert_eq!(b, Err(ClientError::Network("timeout".to_string())));

        let entry = coord.store().get(&key);
        assert!(!entry.loading);
        assert_eq!(entry.error.as_deref(), Some("Network error: timeout"));
        assert!(entry.data.is_some());
    }

    #[tokio::test]
    async fn test_refresh_ignores_freshness() {
        let (coord, _) = coordinator();
        let key = DomainKey::new(Domain::Results);
        let calls = Arc::new(AtomicUsize::new(0));
        coord.fetch_domain(key.clone(), counting_fetcher(&calls)).await.unwrap();
        coord.refresh(key, counting_fetcher(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_caller_still_commits() {
        let (coord, _) = coordinator();
        let key = DomainKey::new(Domain::Results);
        let gate = Arc::new(Notify::new());

        let waiting = Arc::clone(&gate);
        let fetch = coord.fetch_domain(key.clone(), move || async move {
            waiting.notified().await;
            Ok(DomainData::Results(ResultsSheet::default()))
        });
        // Poll once so the request is registered, then drop the caller.
        assert!(futures::poll!(Box::pin(fetch)).is_pending());
        assert!(coord.is_fetching(&key));

        gate.notify_one();
        while coord.is_fetching(&key) {
            tokio::task::yield_now().await;
        }
        let entry = coord.store().get(&key);
        assert!(entry.data.is_some());
        assert!(entry.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_read_started_before_patch_does_not_overwrite_it() {
        let (coord, clock) = coordinator();
        let key = DomainKey::new(Domain::Clubs);
        let seed = || async { Ok(DomainData::Clubs(ClubDirectory::default())) };
        coord.fetch_domain(key.clone(), seed).await.unwrap();
        clock.advance_minutes(10);

        let gate = Arc::new(Notify::new());
        let waiting = Arc::clone(&gate);
        let slow = coord.fetch_domain(key.clone(), move || async move {
            waiting.notified().await;
            Ok(DomainData::Clubs(ClubDirectory::default()))
        });
        let mutate = async {
            tokio::task::yield_now().await;
            coord
                .store()
                .patch(Domain::Clubs, "C1", &EntityPatch::Membership { joined: true });
            gate.notify_one();
        };
        let (read, ()) = tokio::join!(slow, mutate);

        let seen = read.unwrap().into_clubs().unwrap();
        assert!(seen.is_enrolled("C1"));
        let stored = coord.store().get(&key).data.unwrap().into_clubs().unwrap();
        assert!(stored.is_enrolled("C1"));
    }
}
