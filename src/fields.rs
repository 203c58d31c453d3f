//! Enumerations and field types for missions, quests and the loadout.
//!
//! This module defines the structured field types shared across the crate:
//! mission priority and challenge ratings, entity status values, the daily
//! energy level, sort keys, and the quest completion mode. It also holds the
//! ordering ranks derived from them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Mission priority, highest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

/// Effort rating on a mission, independent of priority. Drives the loadout
/// point budget and the alternate inbox sort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Challenge {
    Low,
    Medium,
    High,
}

/// Entity lifecycle status. Quests only ever use `Open` and `Done`;
/// missions additionally use `Archived` and `Canceled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Done,
    Archived,
    Canceled,
}

/// User-selected daily capacity tier. Maps to a point budget for the loadout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Light,
    Medium,
    Heavy,
}

/// What to do with a quest's open missions when the quest is completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestCompletionMode {
    /// Complete all open missions in the quest as well.
    CascadeDone,
    /// Clear `quest_id` on open missions, returning them to the inbox pool.
    DetachOpen,
}

/// Available sort keys for the inbox list.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    Challenge,
    DueDate,
    Quest,
}

/// Ordering rank for a priority: urgent sorts first.
pub fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::Urgent => 0,
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
    }
}

/// Ordering rank for a challenge rating. A mission with no challenge set
/// ranks as `High` — the least urgent to pick up, and the same default the
/// point weights use.
pub fn challenge_rank(c: Option<Challenge>) -> u8 {
    match c {
        Some(Challenge::Low) => 0,
        Some(Challenge::Medium) => 1,
        Some(Challenge::High) | None => 2,
    }
}

impl EnergyLevel {
    /// Point budget for the tier: light=7, medium=10, heavy=12.
    pub fn points_limit(self) -> u32 {
        match self {
            EnergyLevel::Light => 7,
            EnergyLevel::Medium => 10,
            EnergyLevel::Heavy => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnergyLevel::Light => "light",
            EnergyLevel::Medium => "medium",
            EnergyLevel::Heavy => "heavy",
        }
    }
}

/// Format a priority for table display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Urgent => "urgent",
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

/// Format a challenge rating for table display.
pub fn format_challenge(c: Option<Challenge>) -> &'static str {
    match c {
        Some(Challenge::Low) => "low",
        Some(Challenge::Medium) => "medium",
        Some(Challenge::High) => "high",
        None => "-",
    }
}

/// Format a status for table display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Open => "open",
        Status::Done => "done",
        Status::Archived => "archived",
        Status::Canceled => "canceled",
    }
}

/// Parse a priority from free text, e.g. a bulk-import marker.
pub fn parse_priority(s: &str) -> Option<Priority> {
    match s.to_ascii_lowercase().as_str() {
        "urgent" => Some(Priority::Urgent),
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}
