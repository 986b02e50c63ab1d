use std::fmt;

use serde::{Deserialize, Serialize};

/// The two account roles of the portal.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "faculty" => Some(Role::Faculty),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Student => "Student",
            Role::Faculty => "Faculty",
        };
        f.write_str(label)
    }
}

/// The signed-in user on whose behalf requests are made.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Student,
        }
    }

    pub fn faculty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Faculty,
        }
    }

    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}
