use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Actor;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Portal tokens are issued for a day.
const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Who is signed in and when the token was issued.
///
/// The token itself lives in the OS keychain (see [`TokenStore`](super::TokenStore)),
/// never in this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(actor: Actor, created_at: DateTime<Utc>) -> Self {
        Self { actor, created_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(TOKEN_LIFETIME_HOURS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_minutes().max(0)
    }
}

pub struct Session {
    data_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data: None,
        }
    }

    /// Load the session from disk. Returns false when there is no session or
    /// it has expired.
    pub fn load(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;

            if !data.is_expired(now) {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(&path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.data.as_ref().map(|d| &d.actor)
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_expired(now))
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(Actor::faculty("FAC1"), now));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load(now).unwrap());
        assert_eq!(reloaded.actor(), Some(&Actor::faculty("FAC1")));
        assert!(reloaded.is_valid(now));
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let issued = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS + 1);

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(Actor::student("STU1"), issued));
        session.save().unwrap();
        assert!(!session.is_valid(Utc::now()));

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(!reloaded.load(Utc::now()).unwrap());
        assert!(reloaded.actor().is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(Actor::student("STU1"), now));
        session.save().unwrap();

        session.clear().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(!Session::new(dir.path().to_path_buf()).load(now).unwrap());
    }

    #[test]
    fn test_minutes_until_expiry() {
        let now = Utc::now();
        let data = SessionData::new(Actor::student("STU1"), now - Duration::hours(23));
        assert_eq!(data.minutes_until_expiry(now), 60);
        assert_eq!(data.minutes_until_expiry(now + Duration::hours(2)), 0);
    }
}
