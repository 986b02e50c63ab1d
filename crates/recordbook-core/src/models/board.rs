use serde::{Deserialize, Serialize};

use super::stats::{merge_stats, ReviewStats, ServerStats};
use super::{ReviewPatch, Submission, SubmissionStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// A list of reviewable submissions together with its counters.
///
/// Used for both sides of the review workflow: the student's own approvals
/// and leave requests, and the faculty queues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewBoard {
    pub items: Vec<Submission>,
    pub stats: ReviewStats,
    pub pagination: Option<Pagination>,
}

impl ReviewBoard {
    /// Build a board from loaded items, letting server counters override the
    /// client-derived ones.
    pub fn new(
        items: Vec<Submission>,
        server_stats: Option<&ServerStats>,
        pagination: Option<Pagination>,
    ) -> Self {
        let stats = merge_stats(ReviewStats::derive(&items), server_stats);
        Self {
            items,
            stats,
            pagination,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Submission> {
        self.items.iter().find(|s| s.id == id)
    }

    pub fn with_status(&self, status: SubmissionStatus) -> impl Iterator<Item = &Submission> {
        self.items.iter().filter(move |s| s.status == status)
    }

    /// Apply a review patch to the item with `id`, keeping the counters in
    /// step. Returns the number of items changed (0 or 1).
    pub fn apply_review(&mut self, id: &str, patch: &ReviewPatch) -> usize {
        let Some(item) = self.items.iter_mut().find(|s| s.id == id) else {
            return 0;
        };
        let before = item.status;
        if !item.apply_review(patch) {
            return 0;
        }
        self.stats.shift(before, item.status);
        1
    }
}
