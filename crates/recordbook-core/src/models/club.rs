use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub coordinator: Option<String>,
    #[serde(default)]
    pub member_count: Option<u32>,
    #[serde(default, alias = "membershipFee")]
    pub fee: Option<u32>,
}

impl Club {
    pub fn display_fee(&self) -> String {
        match self.fee {
            Some(0) | None => "Free".to_string(),
            Some(fee) => format!("{} INR", fee),
        }
    }
}

/// Membership role a student takes when joining a club.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClubRole {
    Member,
    Coordinator,
    Volunteer,
}

impl ClubRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" => Some(ClubRole::Member),
            "coordinator" | "lead" => Some(ClubRole::Coordinator),
            "volunteer" => Some(ClubRole::Volunteer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClubRole::Member => "member",
            ClubRole::Coordinator => "coordinator",
            ClubRole::Volunteer => "volunteer",
        }
    }
}

impl fmt::Display for ClubRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's membership in a club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student_id: String,
    pub club_id: String,
    pub role: ClubRole,
    pub joined_on: NaiveDate,
    pub amount_paid: u32,
}

/// All clubs plus the set the signed-in student belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubDirectory {
    pub clubs: Vec<Club>,
    pub enrolled: BTreeSet<String>,
}

impl ClubDirectory {
    pub fn is_enrolled(&self, club_id: &str) -> bool {
        self.enrolled.contains(club_id)
    }

    pub fn find(&self, club_id: &str) -> Option<&Club> {
        self.clubs.iter().find(|c| c.id == club_id)
    }

    pub fn enrolled_clubs(&self) -> impl Iterator<Item = &Club> {
        self.clubs.iter().filter(|c| self.enrolled.contains(&c.id))
    }

    /// Add or remove `club_id` from the enrolled set.
    /// Returns true if membership changed.
    pub fn set_membership(&mut self, club_id: &str, joined: bool) -> bool {
        if joined {
            self.enrolled.insert(club_id.to_string())
        } else {
            self.enrolled.remove(club_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_membership_reports_change() {
        let mut dir = ClubDirectory::default();
        assert!(dir.set_membership("C1", true));
        assert!(!dir.set_membership("C1", true));
        assert!(dir.is_enrolled("C1"));
        assert!(dir.set_membership("C1", false));
        assert!(!dir.set_membership("C1", false));
        assert!(dir.enrolled.is_empty());
    }

    #[test]
    fn test_display_fee() {
        let mut club = Club {
            id: "C1".to_string(),
            name: "Robotics".to_string(),
            description: None,
            category: None,
            coordinator: None,
            member_count: None,
            fee: None,
        };
        assert_eq!(club.display_fee(), "Free");
        club.fee = Some(250);
        assert_eq!(club.display_fee(), "250 INR");
    }
}
