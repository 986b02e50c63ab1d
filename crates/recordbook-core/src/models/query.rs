use serde::{Deserialize, Serialize};

use super::SubmissionStatus;

/// Default page size of the faculty leave-request list.
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter, paging, and sort parameters of the faculty leave-request list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaveQuery {
    pub status: Option<SubmissionStatus>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for LeaveQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort_by: "submittedAt".to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl LeaveQuery {
    pub fn pending() -> Self {
        Self {
            status: Some(SubmissionStatus::Pending),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Query-string pairs in a fixed order, so equal queries share a cache key.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("sortBy", self.sort_by.clone()));
        pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        pairs
    }

    pub fn canonical(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_is_stable() {
        assert_eq!(
            LeaveQuery::pending().canonical(),
            "status=pending&page=1&limit=10&sortBy=submittedAt&sortOrder=desc"
        );
        assert_eq!(
            LeaveQuery::default().page(0).canonical(),
            "page=1&limit=10&sortBy=submittedAt&sortOrder=desc"
        );
    }
}
