//! Session identity and persisted client-local state.
//!
//! The session pairs the authenticated user with the identity whose
//! loadout is on screen; slot edits are allowed only when the two match.
//! `LocalState` is the non-authoritative convenience file under
//! `~/.loadout/`: session token, API endpoint, household roster, last
//! viewed user, theme, and the active countdown-timer snapshot.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timer::TimerSnapshot;

/// Who is logged in, and whose loadout is being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub current_user: String,
    pub viewing_user: String,
}

impl Session {
    pub fn new(current_user: impl Into<String>) -> Self {
        let current_user = current_user.into();
        Session {
            viewing_user: current_user.clone(),
            current_user,
        }
    }

    /// Loadout slots are editable only on your own board.
    pub fn can_edit_loadout(&self) -> bool {
        !self.current_user.is_empty() && self.current_user == self.viewing_user
    }
}

/// Client-local state, persisted as JSON. Nothing in here is
/// server-authoritative.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub expires_at: i64,
    /// Household roster: short name -> email, so commands can say
    /// `--who steph` instead of spelling out addresses.
    #[serde(default)]
    pub roster: BTreeMap<String, String>,
    #[serde(default)]
    pub last_viewed: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub timer: Option<TimerSnapshot>,
}

impl LocalState {
    /// Load from file, starting fresh when missing or unparseable. A stale
    /// timer snapshot is dropped here so no caller ever sees one.
    pub fn load(path: &Path, now: i64) -> Self {
        if !path.exists() {
            return LocalState::default();
        }
        let mut buf = String::new();
        let mut state: LocalState = match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error parsing state file, starting fresh: {e}");
                    LocalState::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading state file, starting fresh: {e}");
                LocalState::default()
            }
        };
        if state.timer.as_ref().is_some_and(|t| t.is_stale(now)) {
            state.timer = None;
        }
        state
    }

    /// Save to file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).expect("state serializes");
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty()
    }

    /// Forget the session token; the auth-expiry policy.
    pub fn clear_token(&mut self) {
        self.token.clear();
        self.expires_at = 0;
    }

    /// Resolve a roster name or literal email to an email. `all` is passed
    /// through for the assignee filter.
    pub fn resolve_user(&self, who: &str) -> String {
        let key = who.trim();
        if let Some(email) = self.roster.get(&key.to_ascii_lowercase()) {
            return email.clone();
        }
        key.to_string()
    }

    /// The identity whose loadout should come up first: the last one
    /// viewed, defaulting to the logged-in user.
    pub fn initial_viewed_user(&self) -> String {
        if self.last_viewed.is_empty() {
            self.user_email.clone()
        } else {
            self.last_viewed.clone()
        }
    }
}

/// State directory: `$LOADOUT_HOME` or `~/.loadout`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LOADOUT_HOME") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".loadout")
}

/// Path of the state file inside a state directory.
pub fn state_file(dir: &Path) -> PathBuf {
    dir.join("state.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loadout_editable_only_on_own_board() {
        let mut s = Session::new("john@example.com");
        assert!(s.can_edit_loadout());
        s.viewing_user = "steph@example.com".into();
        assert!(!s.can_edit_loadout());
        assert!(!Session::default().can_edit_loadout());
    }

    #[test]
    fn state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_file(dir.path());
        let mut state = LocalState {
            api_url: "https://records.example.com/api".into(),
            token: "tok-123".into(),
            user_email: "john@example.com".into(),
            theme: "ember".into(),
            ..LocalState::default()
        };
        state.roster.insert("steph".into(), "steph@example.com".into());
        state.save(&path).unwrap();

        let loaded = LocalState::load(&path, 0);
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(loaded.theme, "ember");
        assert_eq!(loaded.resolve_user("steph"), "steph@example.com");
        assert_eq!(loaded.resolve_user("megan@example.com"), "megan@example.com");
    }

    #[test]
    fn missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::load(&state_file(dir.path()), 0);
        assert!(!state.is_logged_in());
    }

    #[test]
    fn stale_timer_is_discarded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_file(dir.path());
        let state = LocalState {
            timer: Some(TimerSnapshot::new("t1", "Deep work", 1_000, 25)),
            ..LocalState::default()
        };
        state.save(&path).unwrap();

        // Within the grace window the timer survives a reload.
        let fresh = LocalState::load(&path, 1_000 + 30 * 60);
        assert!(fresh.timer.is_some());

        let stale = LocalState::load(&path, 1_000 + (25 + 60) * 60 + 1);
        assert!(stale.timer.is_none());
    }
}
