//! Dashboard summaries for the student and faculty home screens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewBoard;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub semester: Option<u8>,
}

/// Per-category achievement counts shown on the student home screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementCounts {
    pub certificates: u32,
    pub workshops: u32,
    pub clubs: u32,
    pub internships: u32,
    pub projects: u32,
}

impl AchievementCounts {
    pub fn total(&self) -> u32 {
        self.certificates + self.workshops + self.clubs + self.internships + self.projects
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, alias = "message")]
    pub body: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentHome {
    pub student: StudentProfile,
    pub counts: AchievementCounts,
    pub approvals: ReviewBoard,
    pub announcements: Vec<Announcement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacultyProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
}

/// Faculty home: profile plus the queue of submissions awaiting review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacultyDashboard {
    pub faculty: FacultyProfile,
    pub queue: ReviewBoard,
}
