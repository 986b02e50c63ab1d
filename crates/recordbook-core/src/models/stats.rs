//! Review counters and the client/server merge rule.

use serde::{Deserialize, Serialize};

use super::{Submission, SubmissionStatus};

/// Aggregate review counts for a list of submissions.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total: u32,
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
}

impl ReviewStats {
    /// Count the submissions we actually hold.
    pub fn derive<'a>(items: impl IntoIterator<Item = &'a Submission>) -> Self {
        let mut stats = ReviewStats::default();
        for item in items {
            stats.total += 1;
            match item.status {
                SubmissionStatus::Pending => stats.pending += 1,
                SubmissionStatus::Approved => stats.approved += 1,
                SubmissionStatus::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    /// Move one submission from `from` to `to`. Total is unchanged.
    pub fn shift(&mut self, from: SubmissionStatus, to: SubmissionStatus) {
        if from == to {
            return;
        }
        let from_slot = self.slot(from);
        *from_slot = from_slot.saturating_sub(1);
        *self.slot(to) += 1;
    }

    fn slot(&mut self, status: SubmissionStatus) -> &mut u32 {
        match status {
            SubmissionStatus::Pending => &mut self.pending,
            SubmissionStatus::Approved => &mut self.approved,
            SubmissionStatus::Rejected => &mut self.rejected,
        }
    }
}

/// Counters as reported by the server. Any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub total: Option<u32>,
    pub pending: Option<u32>,
    pub approved: Option<u32>,
    pub rejected: Option<u32>,
}

/// Combine client-derived counts with server counts.
///
/// The server is authoritative per field: every field it reports replaces the
/// derived value, every field it omits falls back to the derived value. The
/// derived counts only see the page that was loaded, the server sees all rows.
pub fn merge_stats(derived: ReviewStats, server: Option<&ServerStats>) -> ReviewStats {
    let Some(server) = server else {
        return derived;
    };
    ReviewStats {
        total: server.total.unwrap_or(derived.total),
        pending: server.pending.unwrap_or(derived.pending),
        approved: server.approved.unwrap_or(derived.approved),
        rejected: server.rejected.unwrap_or(derived.rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_without_server_keeps_derived() {
        let derived = ReviewStats { total: 3, pending: 1, approved: 1, rejected: 1 };
        assert_eq!(merge_stats(derived, None), derived);
    }

    #[test]
    fn test_merge_server_wins_per_field() {
        let derived = ReviewStats { total: 3, pending: 1, approved: 1, rejected: 1 };
        let server = ServerStats {
            total: Some(40),
            pending: Some(12),
            approved: None,
            rejected: Some(0),
        };
        let merged = merge_stats(derived, Some(&server));
        assert_eq!(merged, ReviewStats { total: 40, pending: 12, approved: 1, rejected: 0 });
    }

    #[test]
    fn test_shift_moves_one_count() {
        let mut stats = ReviewStats { total: 5, pending: 2, approved: 3, rejected: 0 };
        stats.shift(SubmissionStatus::Pending, SubmissionStatus::Rejected);
        assert_eq!(stats, ReviewStats { total: 5, pending: 1, approved: 3, rejected: 1 });

        let mut empty = ReviewStats::default();
        empty.shift(SubmissionStatus::Pending, SubmissionStatus::Approved);
        assert_eq!(empty.pending, 0);
        assert_eq!(empty.approved, 1);
    }
}
