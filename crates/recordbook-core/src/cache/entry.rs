use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached domain: last-known server data plus fetch bookkeeping.
///
/// `data` stays `None` until the first successful fetch. A failed fetch sets
/// `error` but never clears `data`, so views keep showing the last good copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCacheEntry<T> {
    pub data: Option<T>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for DomainCacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_fetched_at: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> DomainCacheEntry<T> {
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_fetched_at.map(|at| (now - at).num_minutes())
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let Some(minutes) = self.age_minutes(now) else {
            return "never".to_string();
        };
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DomainCacheEntry<U> {
        DomainCacheEntry {
            data: self.data.map(f),
            last_fetched_at: self.last_fetched_at,
            loading: self.loading,
            error: self.error,
        }
    }
}
