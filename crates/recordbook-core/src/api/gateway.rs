//! The request gateway contract.
//!
//! Everything above the `api` module talks to the backend through this trait,
//! so the cache and the workflows can run against [`ApiClient`](super::ApiClient)
//! in production and against an in-memory fake in tests.

use async_trait::async_trait;

use super::wire::{
    ApprovalReviewBody, ApprovalsResponse, ClubsResponse, EnrollmentRequest, EnrollmentResponse,
    FacultyHomeResponse, LeaveRequestsResponse, LeaveReviewBody, ReviewResponse,
    StudentHomeResponse, SubmissionRecord,
};
use crate::error::ClientResult;
use crate::models::{LeaveQuery, ResultsSheet, SubmissionPayload};

#[async_trait]
pub trait RecordGateway: Send + Sync {
    // ===== Student reads =====

    async fn student_home(&self) -> ClientResult<StudentHomeResponse>;

    async fn student_approvals(&self) -> ClientResult<ApprovalsResponse>;

    async fn student_leave_requests(&self) -> ClientResult<LeaveRequestsResponse>;

    async fn results(&self) -> ClientResult<ResultsSheet>;

    async fn clubs(&self) -> ClientResult<ClubsResponse>;

    // ===== Faculty reads =====

    async fn faculty_home(&self) -> ClientResult<FacultyHomeResponse>;

    async fn faculty_leave_requests(&self, query: &LeaveQuery) -> ClientResult<LeaveRequestsResponse>;

    // ===== Writes =====

    async fn review_leave_request(
        &self,
        student_id: &str,
        request_id: &str,
        body: &LeaveReviewBody,
    ) -> ClientResult<ReviewResponse>;

    async fn review_submission(
        &self,
        student_id: &str,
        submission_id: &str,
        body: &ApprovalReviewBody,
    ) -> ClientResult<ReviewResponse>;

    /// Create a submission. Leave payloads go to the leave request endpoint,
    /// every other kind to the submissions endpoint.
    async fn create_submission(&self, payload: &SubmissionPayload) -> ClientResult<SubmissionRecord>;

    async fn enroll(&self, request: &EnrollmentRequest) -> ClientResult<EnrollmentResponse>;
}
