//! Faculty review decisions and student submissions.
//!
//! Both sides of the review workflow see the same record through different
//! cache entries: faculty through `LeaveRequests` and `FacultyDashboard`,
//! students through `StudentLeaveRequests`, `StudentApprovals`, and
//! `StudentHome`. A decision patches the faculty entry it was made from and
//! invalidates the rest, so both sides see the new status on their next read.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::wire::{ApprovalReviewBody, LeaveReviewBody};
use crate::api::RecordGateway;
use crate::cache::{Domain, DomainStore, EntityPatch};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    Actor, Decision, ReviewPatch, Submission, SubmissionKind, SubmissionPayload, SubmissionStatus,
};

/// Faculty-side cache entry that holds submissions of `kind`.
pub fn review_domain(kind: SubmissionKind) -> Domain {
    match kind {
        SubmissionKind::Leave => Domain::LeaveRequests,
        _ => Domain::FacultyDashboard,
    }
}

/// Student-side entries showing submissions of `kind`.
pub fn student_domains(kind: SubmissionKind) -> [Domain; 2] {
    match kind {
        SubmissionKind::Leave => [Domain::StudentLeaveRequests, Domain::StudentHome],
        _ => [Domain::StudentApprovals, Domain::StudentHome],
    }
}

#[derive(Clone)]
pub struct ApprovalService {
    gateway: Arc<dyn RecordGateway>,
    store: DomainStore,
}

impl ApprovalService {
    pub fn new(gateway: Arc<dyn RecordGateway>, store: DomainStore) -> Self {
        Self { gateway, store }
    }

    /// Record a faculty decision on a pending submission.
    ///
    /// Role, transition, and remark checks all happen before the gateway is
    /// called; a failed check sends nothing and changes nothing. On success
    /// `submission` is updated in place and the applied patch is returned.
    ///
    /// A 2xx reply that can't be read still means the server recorded the
    /// decision: the requested status is applied locally and every entry
    /// showing the submission is marked for refetch.
    pub async fn decide(
        &self,
        actor: &Actor,
        submission: &mut Submission,
        decision: Decision,
        remarks: &str,
    ) -> ClientResult<ReviewPatch> {
        if !actor.is_faculty() {
            return Err(ClientError::PermissionDenied {
                role: actor.role,
                action: "review submissions",
            });
        }

        let target = submission.status.transition(&submission.id, decision)?;

        let kind = submission.kind();
        let domain = review_domain(kind);
        if let Some(cached) = self.store.find_submission(domain, &submission.id) {
            // Another view may already have decided this one.
            cached.status.transition(&submission.id, decision)?;
        }

        let remarks = remarks.trim();
        if decision.requires_remarks() && remarks.is_empty() {
            return Err(ClientError::Validation(
                "Remarks are required when rejecting a submission".to_string(),
            ));
        }

        debug!(id = %submission.id, kind = %kind, status = %target, "Sending review decision");
        let sent = match kind {
            SubmissionKind::Leave => {
                let body = LeaveReviewBody {
                    status: target,
                    approval_remarks: remarks.to_string(),
                };
                self.gateway
                    .review_leave_request(&submission.owner_id, &submission.id, &body)
                    .await
            }
            _ => {
                let body = ApprovalReviewBody {
                    status: target,
                    remarks: remarks.to_string(),
                };
                self.gateway
                    .review_submission(&submission.owner_id, &submission.id, &body)
                    .await
            }
        };

        // InvalidResponse only comes back for bodies of successful replies.
        let acknowledged = match sent {
            Ok(response) => response.into_patch(),
            Err(e @ ClientError::InvalidResponse(_)) => Err(e),
            Err(e) => return Err(e),
        };
        let (mut patch, confirmed) = match acknowledged {
            Ok(patch) => (patch, true),
            Err(e) => {
                warn!(id = %submission.id, error = %e, "Unreadable review acknowledgement, assuming {}", target);
                let patch = ReviewPatch {
                    status: Some(target),
                    ..ReviewPatch::default()
                };
                (patch, false)
            }
        };
        patch.reviewed_at.get_or_insert_with(|| self.store.now());
        patch.reviewed_by.get_or_insert_with(|| actor.id.clone());
        if patch.remarks.is_none() && !remarks.is_empty() {
            patch.remarks = Some(remarks.to_string());
        }

        submission.apply_review(&patch);
        let patched = self
            .store
            .patch(domain, &submission.id, &EntityPatch::Review(patch.clone()));
        if confirmed {
            self.store.invalidate_except(domain, &submission.id);
        } else {
            self.store.invalidate(domain);
        }
        for student_domain in student_domains(kind) {
            self.store.invalidate(student_domain);
        }

        info!(
            id = %submission.id,
            status = %submission.status,
            patched,
            "Review decision recorded"
        );
        Ok(patch)
    }

    /// Create a new submission or leave request for the signed-in student.
    pub async fn submit(&self, actor: &Actor, payload: SubmissionPayload) -> ClientResult<Submission> {
        if !actor.is_student() {
            return Err(ClientError::PermissionDenied {
                role: actor.role,
                action: "create submissions",
            });
        }
        payload.validate()?;

        let kind = payload.kind();
        let record = self.gateway.create_submission(&payload).await?;

        for domain in student_domains(kind) {
            self.store.invalidate(domain);
        }
        self.store.invalidate(review_domain(kind));

        let id = record
            .record_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidResponse("created record has no id".to_string()))?;
        let submission = Submission {
            status: record
                .status
                .as_deref()
                .and_then(SubmissionStatus::parse)
                .unwrap_or(SubmissionStatus::Pending),
            submitted_at: record.submitted_at.unwrap_or_else(|| self.store.now()),
            owner_id: record.owner_id.unwrap_or_else(|| actor.id.clone()),
            id,
            reviewed_at: None,
            reviewed_by: None,
            remarks: None,
            payload,
        };

        info!(id = %submission.id, kind = %kind, "Submission created");
        Ok(submission)
    }
}
