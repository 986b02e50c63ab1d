//! Cache domains, their keys, and the normalized data each one holds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    ClubDirectory, FacultyDashboard, LeaveQuery, ResultsSheet, ReviewBoard, ReviewPatch,
    StudentHome, Submission,
};

/// Leave lists and approval lists change often during review periods.
const REVIEW_LIST_TTL_MINUTES: u64 = 3;

/// Dashboard summaries tolerate a little more lag.
const SUMMARY_TTL_MINUTES: u64 = 5;

/// A named slice of cached application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    StudentHome,
    StudentApprovals,
    StudentLeaveRequests,
    FacultyDashboard,
    LeaveRequests,
    Clubs,
    Results,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::StudentHome,
        Domain::StudentApprovals,
        Domain::StudentLeaveRequests,
        Domain::FacultyDashboard,
        Domain::LeaveRequests,
        Domain::Clubs,
        Domain::Results,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::StudentHome => "studentHome",
            Domain::StudentApprovals => "studentApprovals",
            Domain::StudentLeaveRequests => "studentLeaveRequests",
            Domain::FacultyDashboard => "facultyDashboard",
            Domain::LeaveRequests => "leaveRequests",
            Domain::Clubs => "clubs",
            Domain::Results => "results",
        }
    }

    pub fn default_ttl_minutes(&self) -> u64 {
        match self {
            Domain::StudentApprovals | Domain::StudentLeaveRequests | Domain::LeaveRequests => {
                REVIEW_LIST_TTL_MINUTES
            }
            Domain::StudentHome | Domain::FacultyDashboard | Domain::Clubs | Domain::Results => {
                SUMMARY_TTL_MINUTES
            }
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one cache entry: a domain plus its canonical query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainKey {
    pub domain: Domain,
    pub params: String,
}

impl DomainKey {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            params: String::new(),
        }
    }

    pub fn with_params(domain: Domain, params: impl Into<String>) -> Self {
        Self {
            domain,
            params: params.into(),
        }
    }

    pub fn leave_requests(query: &LeaveQuery) -> Self {
        Self::with_params(Domain::LeaveRequests, query.canonical())
    }
}

impl From<Domain> for DomainKey {
    fn from(domain: Domain) -> Self {
        Self::new(domain)
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.domain)
        } else {
            write!(f, "{}?{}", self.domain, self.params)
        }
    }
}

/// In-place update applied to one entity of a domain.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPatch {
    /// Review outcome for the submission with the patched id.
    Review(ReviewPatch),
    /// Join or leave the club with the patched id.
    Membership { joined: bool },
}

/// Normalized payload of a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainData {
    StudentHome(StudentHome),
    StudentApprovals(ReviewBoard),
    StudentLeaveRequests(ReviewBoard),
    FacultyDashboard(FacultyDashboard),
    LeaveRequests(ReviewBoard),
    Clubs(ClubDirectory),
    Results(ResultsSheet),
}

impl DomainData {
    pub fn domain(&self) -> Domain {
        match self {
            DomainData::StudentHome(_) => Domain::StudentHome,
            DomainData::StudentApprovals(_) => Domain::StudentApprovals,
            DomainData::StudentLeaveRequests(_) => Domain::StudentLeaveRequests,
            DomainData::FacultyDashboard(_) => Domain::FacultyDashboard,
            DomainData::LeaveRequests(_) => Domain::LeaveRequests,
            DomainData::Clubs(_) => Domain::Clubs,
            DomainData::Results(_) => Domain::Results,
        }
    }

    fn review_board(&self) -> Option<&ReviewBoard> {
        match self {
            DomainData::StudentHome(home) => Some(&home.approvals),
            DomainData::FacultyDashboard(dash) => Some(&dash.queue),
            DomainData::StudentApprovals(board)
            | DomainData::StudentLeaveRequests(board)
            | DomainData::LeaveRequests(board) => Some(board),
            DomainData::Clubs(_) | DomainData::Results(_) => None,
        }
    }

    fn review_board_mut(&mut self) -> Option<&mut ReviewBoard> {
        match self {
            DomainData::StudentHome(home) => Some(&mut home.approvals),
            DomainData::FacultyDashboard(dash) => Some(&mut dash.queue),
            DomainData::StudentApprovals(board)
            | DomainData::StudentLeaveRequests(board)
            | DomainData::LeaveRequests(board) => Some(board),
            DomainData::Clubs(_) | DomainData::Results(_) => None,
        }
    }

    pub fn find_submission(&self, id: &str) -> Option<&Submission> {
        self.review_board().and_then(|board| board.find(id))
    }

    /// Apply `patch` to the entity `id`. Returns the number of entities changed.
    pub fn apply_patch(&mut self, id: &str, patch: &EntityPatch) -> usize {
        match patch {
            EntityPatch::Review(review) => self
                .review_board_mut()
                .map(|board| board.apply_review(id, review))
                .unwrap_or(0),
            EntityPatch::Membership { joined } => match self {
                DomainData::Clubs(directory) => usize::from(directory.set_membership(id, *joined)),
                _ => 0,
            },
        }
    }

    pub fn into_board(self) -> Option<ReviewBoard> {
        match self {
            DomainData::StudentApprovals(board)
            | DomainData::StudentLeaveRequests(board)
            | DomainData::LeaveRequests(board) => Some(board),
            _ => None,
        }
    }

    pub fn into_student_home(self) -> Option<StudentHome> {
        match self {
            DomainData::StudentHome(home) => Some(home),
            _ => None,
        }
    }

    pub fn into_faculty_dashboard(self) -> Option<FacultyDashboard> {
        match self {
            DomainData::FacultyDashboard(dash) => Some(dash),
            _ => None,
        }
    }

    pub fn into_clubs(self) -> Option<ClubDirectory> {
        match self {
            DomainData::Clubs(directory) => Some(directory),
            _ => None,
        }
    }

    pub fn into_results(self) -> Option<ResultsSheet> {
        match self {
            DomainData::Results(sheet) => Some(sheet),
            _ => None,
        }
    }
}
