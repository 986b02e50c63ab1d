//! Student submissions and the review state they move through.
//!
//! Every reviewable record (certificates, workshops, club memberships,
//! internships, projects, and leave requests) is a [`Submission`]. The
//! record type is carried by the [`SubmissionPayload`] variant, so code that
//! needs type-specific fields matches on the payload instead of comparing
//! type strings.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::dates;
use crate::error::{ClientError, ClientResult};

// ============================================================================
// Status & Decisions
// ============================================================================

/// Review status of a submission. `Approved` and `Rejected` are terminal.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" | "accepted" => Some(SubmissionStatus::Approved),
            "rejected" | "declined" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }

    /// Resolve the status a decision moves `id` into.
    ///
    /// Only `Pending` has outgoing transitions; there is no path back out of a
    /// terminal status.
    pub fn transition(self, id: &str, decision: Decision) -> ClientResult<SubmissionStatus> {
        match self {
            SubmissionStatus::Pending => Ok(decision.target_status()),
            SubmissionStatus::Approved | SubmissionStatus::Rejected => {
                Err(ClientError::InvalidTransition {
                    id: id.to_string(),
                    from: self,
                })
            }
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A faculty review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" => Some(Decision::Approve),
            "reject" | "rejected" => Some(Decision::Reject),
            _ => None,
        }
    }

    pub fn target_status(&self) -> SubmissionStatus {
        match self {
            Decision::Approve => SubmissionStatus::Approved,
            Decision::Reject => SubmissionStatus::Rejected,
        }
    }

    /// Rejections must explain themselves to the student.
    pub fn requires_remarks(&self) -> bool {
        matches!(self, Decision::Reject)
    }
}

// ============================================================================
// Kinds & Payloads
// ============================================================================

/// Record type of a submission, derived from its payload.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Certificate,
    Workshop,
    Club,
    Internship,
    Project,
    Leave,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 6] = [
        SubmissionKind::Certificate,
        SubmissionKind::Workshop,
        SubmissionKind::Club,
        SubmissionKind::Internship,
        SubmissionKind::Project,
        SubmissionKind::Leave,
    ];

    /// Parse the type tag used on the wire. Plural forms appear on some
    /// list endpoints.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "certificate" | "certificates" => Some(SubmissionKind::Certificate),
            "workshop" | "workshops" => Some(SubmissionKind::Workshop),
            "club" | "clubs" => Some(SubmissionKind::Club),
            "internship" | "internships" => Some(SubmissionKind::Internship),
            "project" | "projects" => Some(SubmissionKind::Project),
            "leave" | "leaves" | "leave-request" => Some(SubmissionKind::Leave),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Certificate => "certificate",
            SubmissionKind::Workshop => "workshop",
            SubmissionKind::Club => "club",
            SubmissionKind::Internship => "internship",
            SubmissionKind::Project => "project",
            SubmissionKind::Leave => "leave",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubmissionKind::Certificate => "Certificate",
            SubmissionKind::Workshop => "Workshop",
            SubmissionKind::Club => "Club",
            SubmissionKind::Internship => "Internship",
            SubmissionKind::Project => "Project",
            SubmissionKind::Leave => "Leave",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Type-specific fields of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SubmissionPayload {
    Certificate {
        title: String,
        issuer: String,
        #[serde(default, with = "dates::flexible_opt")]
        issued_on: Option<NaiveDate>,
        #[serde(default)]
        certificate_url: Option<String>,
    },
    Workshop {
        title: String,
        organizer: String,
        #[serde(with = "dates::flexible")]
        start_date: NaiveDate,
        #[serde(default, with = "dates::flexible_opt")]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        certificate_url: Option<String>,
    },
    Club {
        club_name: String,
        position: String,
        #[serde(default, with = "dates::flexible_opt")]
        joined_on: Option<NaiveDate>,
    },
    Internship {
        organization: String,
        role: String,
        #[serde(with = "dates::flexible")]
        start_date: NaiveDate,
        #[serde(default, with = "dates::flexible_opt")]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        stipend: Option<u32>,
    },
    Project {
        title: String,
        description: String,
        #[serde(default)]
        repository_url: Option<String>,
        #[serde(default)]
        technologies: Vec<String>,
    },
    Leave {
        leave_type: String,
        reason: String,
        #[serde(with = "dates::flexible")]
        from_date: NaiveDate,
        #[serde(with = "dates::flexible")]
        to_date: NaiveDate,
    },
}

impl SubmissionPayload {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            SubmissionPayload::Certificate { .. } => SubmissionKind::Certificate,
            SubmissionPayload::Workshop { .. } => SubmissionKind::Workshop,
            SubmissionPayload::Club { .. } => SubmissionKind::Club,
            SubmissionPayload::Internship { .. } => SubmissionKind::Internship,
            SubmissionPayload::Project { .. } => SubmissionKind::Project,
            SubmissionPayload::Leave { .. } => SubmissionKind::Leave,
        }
    }

    /// Short human-readable headline for lists.
    pub fn headline(&self) -> String {
        match self {
            SubmissionPayload::Certificate { title, issuer, .. } => format!("{} ({})", title, issuer),
            SubmissionPayload::Workshop { title, organizer, .. } => format!("{} ({})", title, organizer),
            SubmissionPayload::Club { club_name, position, .. } => format!("{} - {}", club_name, position),
            SubmissionPayload::Internship { organization, role, .. } => format!("{} at {}", role, organization),
            SubmissionPayload::Project { title, .. } => title.clone(),
            SubmissionPayload::Leave { leave_type, from_date, to_date, .. } => {
                format!("{} leave {} to {}", leave_type, from_date, to_date)
            }
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let required: Vec<(&'static str, &str)> = match self {
            SubmissionPayload::Certificate { title, issuer, .. } => {
                vec![("title", title.as_str()), ("issuer", issuer.as_str())]
            }
            SubmissionPayload::Workshop { title, organizer, .. } => {
                vec![("title", title.as_str()), ("organizer", organizer.as_str())]
            }
            SubmissionPayload::Club { club_name, position, .. } => {
                vec![("clubName", club_name.as_str()), ("position", position.as_str())]
            }
            SubmissionPayload::Internship { organization, role, .. } => {
                vec![("organization", organization.as_str()), ("role", role.as_str())]
            }
            SubmissionPayload::Project { title, description, .. } => {
                vec![("title", title.as_str()), ("description", description.as_str())]
            }
            SubmissionPayload::Leave { leave_type, reason, .. } => {
                vec![("leaveType", leave_type.as_str()), ("reason", reason.as_str())]
            }
        };
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            SubmissionPayload::Workshop { start_date, end_date: Some(end), .. }
            | SubmissionPayload::Internship { start_date, end_date: Some(end), .. } => {
                Some((*start_date, *end))
            }
            SubmissionPayload::Leave { from_date, to_date, .. } => Some((*from_date, *to_date)),
            _ => None,
        }
    }

    /// Check the required fields of this record type before it is sent.
    pub fn validate(&self) -> ClientResult<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ClientError::Validation(format!(
                "{} submission is missing required fields: {}",
                self.kind(),
                missing.join(", ")
            )));
        }
        if let Some((start, end)) = self.date_range() {
            if end < start {
                return Err(ClientError::Validation(format!(
                    "{} submission ends ({}) before it starts ({})",
                    self.kind(),
                    end,
                    start
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub owner_id: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub remarks: Option<String>,
    pub payload: SubmissionPayload,
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        self.payload.kind()
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    /// Merge a partial review update into this submission.
    /// Returns true if any field changed.
    pub fn apply_review(&mut self, patch: &ReviewPatch) -> bool {
        let mut changed = false;
        if let Some(status) = patch.status {
            changed |= self.status != status;
            self.status = status;
        }
        if let Some(reviewed_at) = patch.reviewed_at {
            changed |= self.reviewed_at != Some(reviewed_at);
            self.reviewed_at = Some(reviewed_at);
        }
        if let Some(ref reviewed_by) = patch.reviewed_by {
            changed |= self.reviewed_by.as_ref() != Some(reviewed_by);
            self.reviewed_by = Some(reviewed_by.clone());
        }
        if let Some(ref remarks) = patch.remarks {
            changed |= self.remarks.as_ref() != Some(remarks);
            self.remarks = Some(remarks.clone());
        }
        changed
    }
}

/// Partial update produced by a review decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPatch {
    pub status: Option<SubmissionStatus>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub remarks: Option<String>,
}
