//! Per-domain time-to-live rules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::Domain;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// True if an entry fetched at `last_fetched_at` must be refetched at `now`.
///
/// Never-fetched entries are always stale. An entry is still fresh at exactly
/// `ttl_minutes` of age and stale one millisecond later.
pub fn is_stale(last_fetched_at: Option<DateTime<Utc>>, ttl_minutes: u64, now: DateTime<Utc>) -> bool {
    match last_fetched_at {
        None => true,
        Some(at) => {
            let ttl_ms = i64::try_from(ttl_minutes)
                .unwrap_or(i64::MAX / MILLIS_PER_MINUTE)
                .saturating_mul(MILLIS_PER_MINUTE);
            (now - at).num_milliseconds() > ttl_ms
        }
    }
}

/// TTL per domain, starting from the built-in windows.
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    overrides: HashMap<Domain, u64>,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl StalenessPolicy {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn with_ttl(mut self, domain: Domain, minutes: u64) -> Self {
        self.overrides.insert(domain, minutes);
        self
    }

    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = (&'a Domain, &'a u64)>) -> Self {
        for (domain, minutes) in overrides {
            self.overrides.insert(*domain, *minutes);
        }
        self
    }

    pub fn ttl_minutes(&self, domain: Domain) -> u64 {
        self.overrides
            .get(&domain)
            .copied()
            .unwrap_or_else(|| domain.default_ttl_minutes())
    }

    pub fn is_stale(&self, domain: Domain, last_fetched_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        is_stale(last_fetched_at, self.ttl_minutes(domain), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_never_fetched_is_stale_for_every_domain() {
        let policy = StalenessPolicy::new();
        let now = Utc::now();
        for domain in Domain::ALL {
            assert!(policy.is_stale(domain, None, now));
        }
        assert!(is_stale(None, 0, now));
    }

    #[test]
    fn test_staleness_boundary_is_exclusive() {
        let fetched = Utc::now();
        assert!(!is_stale(Some(fetched), 5, fetched));
        assert!(!is_stale(Some(fetched), 5, fetched + Duration::minutes(5)));
        assert!(is_stale(Some(fetched), 5, fetched + Duration::minutes(5) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_staleness_is_monotonic() {
        let fetched = Utc::now();
        let mut was_stale = false;
        for second in 0..600 {
            let stale = is_stale(Some(fetched), 3, fetched + Duration::seconds(second));
            assert!(!was_stale || stale, "became fresh again at {}s", second);
            was_stale = stale;
        }
        assert!(was_stale);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let policy = StalenessPolicy::new().with_ttl(Domain::Clubs, 30);
        assert_eq!(policy.ttl_minutes(Domain::Clubs), 30);
        assert_eq!(policy.ttl_minutes(Domain::LeaveRequests), 3);
    }
}
