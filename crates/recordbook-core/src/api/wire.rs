//! Wire types for the portal REST API and their normalization into models.
//!
//! Response structs mirror the JSON the backend sends (camelCase keys, ids
//! under `_id`, `id`, or both). Nothing in this module reaches the domain
//! store directly: every response goes through a `normalize` step first.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::models::{
    AchievementCounts, Announcement, Club, ClubDirectory, ClubRole, Enrollment, FacultyDashboard,
    FacultyProfile, Pagination, ResultsSheet, ReviewBoard, ReviewPatch, ServerStats, StudentHome,
    StudentProfile, Submission, SubmissionKind, SubmissionPayload, SubmissionStatus,
};

// ============================================================================
// Record ids
// ============================================================================

/// Models whose id may arrive as `_id` instead of (or alongside) `id`.
pub trait RecordId {
    fn id_mut(&mut self) -> &mut String;
}

impl RecordId for Club {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

impl RecordId for StudentProfile {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

impl RecordId for FacultyProfile {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

impl RecordId for Announcement {
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
}

/// A document with its `_id` read separately, so `_id` and `id` can both be
/// present without tripping serde's duplicate field check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keyed<T> {
    #[serde(rename = "_id", default)]
    object_id: Option<String>,
    #[serde(flatten)]
    record: T,
}

impl<T: RecordId> Keyed<T> {
    /// The record with `id` filled from `_id` when it was missing.
    pub fn into_inner(mut self) -> T {
        if let Some(object_id) = self.object_id {
            let id = self.record.id_mut();
            if id.is_empty() {
                *id = object_id;
            }
        }
        self.record
    }
}

/// Unwrap a list of keyed records, dropping any with no id at all.
fn unkey<T: RecordId>(records: Vec<Keyed<T>>, what: &str) -> Vec<T> {
    let total = records.len();
    let items: Vec<T> = records
        .into_iter()
        .map(Keyed::into_inner)
        .filter_map(|mut record| {
            let has_id = !record.id_mut().is_empty();
            has_id.then_some(record)
        })
        .collect();
    if items.len() != total {
        warn!(dropped = total - items.len(), what, "Dropping records without an id");
    }
    items
}

// ============================================================================
// Submission records
// ============================================================================

/// A submission or leave request as it appears in any list response.
///
/// Type-specific fields are collected in `details` and only interpreted once
/// the record type is known.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(rename = "type", alias = "submissionType", default)]
    pub kind: Option<String>,
    #[serde(rename = "studentId", alias = "ownerId", default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(alias = "createdAt", default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(alias = "approvalRemarks", default)]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Values a list response implies for records that leave them out.
///
/// Leave request lists carry no type tag, the student-side lists carry no
/// owner, and the bucketed approval lists imply the status.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDefaults<'a> {
    pub kind: Option<SubmissionKind>,
    pub status: Option<SubmissionStatus>,
    pub owner_id: Option<&'a str>,
}

impl<'a> RecordDefaults<'a> {
    pub fn leave() -> Self {
        Self {
            kind: Some(SubmissionKind::Leave),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn owned_by(mut self, owner_id: Option<&'a str>) -> Self {
        self.owner_id = owner_id;
        self
    }
}

impl SubmissionRecord {
    /// `id` if present, else `_id`.
    pub fn record_id(&self) -> Option<&str> {
        Some(self.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.object_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Convert into a [`Submission`], failing on a missing id, an unknown or
    /// missing type, and type-specific fields that don't fit the payload.
    pub fn normalize(self, defaults: RecordDefaults<'_>) -> ClientResult<Submission> {
        let id = self
            .record_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidResponse("record has no id".to_string()))?;
        let kind = match self.kind.as_deref() {
            Some(raw) => SubmissionKind::parse(raw).ok_or_else(|| {
                ClientError::InvalidResponse(format!(
                    "record {} has unknown submission type '{}'",
                    id, raw
                ))
            })?,
            None => defaults.kind.ok_or_else(|| {
                ClientError::InvalidResponse(format!("record {} has no submission type", id))
            })?,
        };

        let status = self
            .status
            .as_deref()
            .and_then(SubmissionStatus::parse)
            .or(defaults.status)
            .unwrap_or(SubmissionStatus::Pending);

        let mut fields = self.details;
        // Some endpoints nest the type-specific fields one level down.
        if let Some(Value::Object(nested)) = fields.remove("details") {
            for (key, value) in nested {
                fields.entry(key).or_insert(value);
            }
        }
        fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));

        let payload: SubmissionPayload =
            serde_json::from_value(Value::Object(fields)).map_err(|e| {
                ClientError::InvalidResponse(format!("record {} ({}): {}", id, kind, e))
            })?;

        Ok(Submission {
            owner_id: self
                .owner_id
                .or_else(|| defaults.owner_id.map(str::to_string))
                .unwrap_or_default(),
            submitted_at: self.submitted_at.unwrap_or_default(),
            id,
            status,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            remarks: self.remarks,
            payload,
        })
    }
}

/// Normalize a list of records, dropping the ones that can't be interpreted.
pub fn normalize_records(
    records: Vec<SubmissionRecord>,
    defaults: RecordDefaults<'_>,
) -> Vec<Submission> {
    let total = records.len();
    let items: Vec<Submission> = records
        .into_iter()
        .filter_map(|record| match record.normalize(defaults) {
            Ok(submission) => Some(submission),
            Err(e) => {
                warn!(error = %e, "Dropping unrecognized record");
                None
            }
        })
        .collect();
    if items.len() != total {
        debug!(kept = items.len(), total, "Normalized record list");
    }
    items
}

// ============================================================================
// List & dashboard responses
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalsResponse {
    pub pending_approvals: Vec<SubmissionRecord>,
    pub rejected_approvals: Vec<SubmissionRecord>,
    pub approved_approvals: Vec<SubmissionRecord>,
    pub stats: Option<ServerStats>,
}

impl ApprovalsResponse {
    fn into_items(self, owner_id: Option<&str>) -> Vec<Submission> {
        let defaults = RecordDefaults::default().owned_by(owner_id);
        let mut items = normalize_records(
            self.pending_approvals,
            defaults.with_status(SubmissionStatus::Pending),
        );
        items.extend(normalize_records(
            self.approved_approvals,
            defaults.with_status(SubmissionStatus::Approved),
        ));
        items.extend(normalize_records(
            self.rejected_approvals,
            defaults.with_status(SubmissionStatus::Rejected),
        ));
        items
    }

    pub fn normalize(self, owner_id: &str) -> ReviewBoard {
        let stats = self.stats;
        ReviewBoard::new(self.into_items(Some(owner_id)), stats.as_ref(), None)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaveRequestsResponse {
    pub leave_requests: Vec<SubmissionRecord>,
    pub stats: Option<ServerStats>,
    pub pagination: Option<Pagination>,
}

impl LeaveRequestsResponse {
    /// `owner_id` is the signed-in student for the student-side list; faculty
    /// lists carry the owner on every record.
    pub fn normalize(self, owner_id: Option<&str>) -> ReviewBoard {
        let items = normalize_records(self.leave_requests, RecordDefaults::leave().owned_by(owner_id));
        ReviewBoard::new(items, self.stats.as_ref(), self.pagination)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentHomeResponse {
    pub student: Keyed<StudentProfile>,
    pub counts: AchievementCounts,
    pub pending_approvals: Vec<SubmissionRecord>,
    pub rejected_approvals: Vec<SubmissionRecord>,
    pub approved_approvals: Vec<SubmissionRecord>,
    pub announcements: Vec<Keyed<Announcement>>,
}

impl StudentHomeResponse {
    pub fn normalize(self) -> StudentHome {
        let student = self.student.into_inner();
        let approvals = ApprovalsResponse {
            pending_approvals: self.pending_approvals,
            rejected_approvals: self.rejected_approvals,
            approved_approvals: self.approved_approvals,
            stats: None,
        }
        .normalize(&student.id);
        StudentHome {
            student,
            counts: self.counts,
            approvals,
            announcements: unkey(self.announcements, "announcement"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacultyHomeResponse {
    pub faculty: Keyed<FacultyProfile>,
    pub stats: Option<ServerStats>,
    pub pending_approvals: Vec<SubmissionRecord>,
}

impl FacultyHomeResponse {
    pub fn normalize(self) -> FacultyDashboard {
        let items = normalize_records(
            self.pending_approvals,
            RecordDefaults::default().with_status(SubmissionStatus::Pending),
        );
        FacultyDashboard {
            faculty: self.faculty.into_inner(),
            queue: ReviewBoard::new(items, self.stats.as_ref(), None),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubsResponse {
    pub clubs: Vec<Keyed<Club>>,
    pub enrolled_club_ids: Vec<String>,
}

impl ClubsResponse {
    pub fn normalize(self) -> ClubDirectory {
        let clubs = unkey(self.clubs, "club");
        let enrolled: BTreeSet<String> = self.enrolled_club_ids.into_iter().collect();
        let unknown = enrolled
            .iter()
            .filter(|id| !clubs.iter().any(|c| &c.id == *id))
            .count();
        if unknown > 0 {
            debug!(unknown, "Enrolled club ids missing from the club list");
        }
        ClubDirectory { clubs, enrolled }
    }
}

/// Semesters are kept in ascending order regardless of how they arrive.
pub fn normalize_results(mut sheet: ResultsSheet) -> ResultsSheet {
    sheet.semesters.sort_by_key(|s| s.semester);
    sheet
}

// ============================================================================
// Review decisions
// ============================================================================

/// Body for `PUT /faculty/leave-requests/{studentId}/{requestId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveReviewBody {
    pub status: SubmissionStatus,
    pub approval_remarks: String,
}

/// Body for `PUT /faculty/approvals/{studentId}/{submissionId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalReviewBody {
    pub status: SubmissionStatus,
    pub remarks: String,
}

/// Server acknowledgement of a review decision, for either endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(alias = "leaveRequestId", alias = "approvalId", default)]
    pub id: Option<String>,
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(alias = "approvalRemarks", default)]
    pub remarks: Option<String>,
}

impl ReviewResponse {
    pub fn into_patch(self) -> ClientResult<ReviewPatch> {
        let status = SubmissionStatus::parse(&self.status).ok_or_else(|| {
            ClientError::InvalidResponse(format!("unknown review status '{}'", self.status))
        })?;
        Ok(ReviewPatch {
            status: Some(status),
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            remarks: self.remarks.filter(|r| !r.trim().is_empty()),
        })
    }
}

// ============================================================================
// Enrollment
// ============================================================================

/// Body for `POST /api/enrollments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub club_id: String,
    pub role: ClubRole,
    pub amount_paid: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub enrollment: Option<Enrollment>,
}

impl EnrollmentResponse {
    /// A 2xx response can still refuse the enrollment with `ok: false`.
    pub fn into_result(self) -> ClientResult<Option<Enrollment>> {
        if self.ok {
            Ok(self.enrollment)
        } else {
            Err(ClientError::Validation(
                self.message
                    .unwrap_or_else(|| "enrollment was not accepted".to_string()),
            ))
        }
    }
}
