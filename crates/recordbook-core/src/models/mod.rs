//! Data models for portal entities.
//!
//! This module contains the domain types every other layer works with:
//!
//! - `Actor`, `Role`: who is signed in
//! - `Submission`, `SubmissionPayload`: reviewable student records, including
//!   leave requests, and the `Pending -> Approved | Rejected` status
//! - `ReviewBoard`, `ReviewStats`: review lists and their counters
//! - `StudentHome`, `FacultyDashboard`: home screen summaries
//! - `ClubDirectory`, `Enrollment`: club membership
//! - `ResultsSheet`: semester results

pub mod actor;
pub mod board;
pub mod club;
pub mod dashboard;
pub mod dates;
pub mod query;
pub mod results;
pub mod stats;
pub mod submission;

pub use actor::{Actor, Role};
pub use board::{Pagination, ReviewBoard};
pub use club::{Club, ClubDirectory, ClubRole, Enrollment};
pub use dashboard::{
    AchievementCounts, Announcement, FacultyDashboard, FacultyProfile, StudentHome, StudentProfile,
};
pub use query::{LeaveQuery, SortOrder};
pub use results::{ResultsSheet, SemesterResult, SubjectResult};
pub use stats::{merge_stats, ReviewStats, ServerStats};
pub use submission::{
    Decision, ReviewPatch, Submission, SubmissionKind, SubmissionPayload, SubmissionStatus,
};
