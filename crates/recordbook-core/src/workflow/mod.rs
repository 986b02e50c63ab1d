//! Write paths that keep the cache consistent with the server.
//!
//! - `ApprovalService`: faculty decisions (`Pending -> Approved | Rejected`)
//!   and new student submissions
//! - `EnrollmentFlow`: club enrollment with optimistic membership and rollback
//! - `Notices`: transient messages raised when a write fails

pub mod approval;
pub mod enrollment;
pub mod notice;

pub use approval::{review_domain, student_domains, ApprovalService};
pub use enrollment::{EnrollmentFlow, EnrollmentOutcome};
pub use notice::{Notice, NoticeLevel, Notices};
