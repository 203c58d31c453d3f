//! Mission, quest and loadout-config entities, plus their wire shapes.
//!
//! Two representations exist per entity. The domain struct (`Mission`,
//! `Quest`) is what the store owns and the views read: typed fields, with
//! the record store's empty-string convention kept only where a field is
//! genuinely tri-state on the wire (`quest_id`, `today_slot`). The record
//! struct (`MissionRecord`, `QuestRecord`) mirrors a server response where
//! every field is optional, and carries the merge rule: a field the server
//! actually returned wins, a field it omitted never erases local state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{Challenge, EnergyLevel, Priority, Status};

/// An atomic, completable unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    pub task_id: String,
    pub title: String,
    pub notes: String,
    pub priority: Priority,
    pub challenge: Option<Challenge>,
    pub assignee: String,
    pub status: Status,
    pub due_date: Option<NaiveDate>,
    /// Owning quest id; empty means not nested under any quest.
    pub quest_id: String,
    /// Loadout slot ordinal; empty means not in any loadout.
    pub today_slot: String,
    pub today_set_at: String,
    /// Loadout owner, distinct from `assignee`. Legacy records leave this
    /// empty and fall back to `assignee` when resolving loadout membership.
    pub today_user: String,
    pub completed_at: String,
    pub created_at: String,
    pub created_by: String,
    pub updated_at: String,
    pub updated_by: String,
}

impl Default for Mission {
    fn default() -> Self {
        Mission {
            task_id: String::new(),
            title: String::new(),
            notes: String::new(),
            priority: Priority::Medium,
            challenge: None,
            assignee: String::new(),
            status: Status::Open,
            due_date: None,
            quest_id: String::new(),
            today_slot: String::new(),
            today_set_at: String::new(),
            today_user: String::new(),
            completed_at: String::new(),
            created_at: String::new(),
            created_by: String::new(),
            updated_at: String::new(),
            updated_by: String::new(),
        }
    }
}

/// A longer-lived goal container that can hold missions and be tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct Quest {
    pub quest_id: String,
    pub title: String,
    pub notes: String,
    pub assignee: String,
    pub leader_email: String,
    pub status: Status,
    pub is_tracked: bool,
    pub tracked_at: String,
    pub completed_at: String,
    /// Hex color; missions in this quest render with it. Empty = none.
    pub color: String,
    pub created_at: String,
    pub created_by: String,
    pub updated_at: String,
    pub updated_by: String,
}

impl Default for Quest {
    fn default() -> Self {
        Quest {
            quest_id: String::new(),
            title: String::new(),
            notes: String::new(),
            assignee: String::new(),
            leader_email: String::new(),
            status: Status::Open,
            is_tracked: false,
            tracked_at: String::new(),
            completed_at: String::new(),
            color: String::new(),
            created_at: String::new(),
            created_by: String::new(),
            updated_at: String::new(),
            updated_by: String::new(),
        }
    }
}

/// Per-user daily capacity setting, server-confirmed.
///
/// `points_used > points_limit` is the "overloaded" signal; it is a pure
/// display condition and never blocks a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutConfig {
    pub energy_level: EnergyLevel,
    pub points_used: u32,
    pub points_limit: u32,
}

fn parse_challenge(s: &str) -> Option<Challenge> {
    match s {
        "low" => Some(Challenge::Low),
        "medium" => Some(Challenge::Medium),
        "high" => Some(Challenge::High),
        _ => None,
    }
}

fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// A mission as the server returns it: every field optional, so a partial
/// response can be told apart from one that explicitly clears a field
/// (present-but-empty clears, absent keeps the local value).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MissionRecord {
    pub task_id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub challenge: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<Status>,
    pub due_date: Option<String>,
    pub quest_id: Option<String>,
    pub today_slot: Option<String>,
    pub today_set_at: Option<String>,
    pub today_user: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_at: Option<String>,
    pub updated_by: Option<String>,
}

impl MissionRecord {
    /// Merge the server-confirmed fields into a locally-held mission.
    pub fn merge_into(&self, m: &mut Mission) {
        if let Some(v) = &self.title {
            m.title = v.clone();
        }
        if let Some(v) = &self.notes {
            m.notes = v.clone();
        }
        if let Some(v) = self.priority {
            m.priority = v;
        }
        if let Some(v) = &self.challenge {
            m.challenge = parse_challenge(v);
        }
        if let Some(v) = &self.assignee {
            m.assignee = v.clone();
        }
        if let Some(v) = self.status {
            m.status = v;
        }
        if let Some(v) = &self.due_date {
            m.due_date = parse_wire_date(v);
        }
        if let Some(v) = &self.quest_id {
            m.quest_id = v.clone();
        }
        if let Some(v) = &self.today_slot {
            m.today_slot = v.clone();
        }
        if let Some(v) = &self.today_set_at {
            m.today_set_at = v.clone();
        }
        if let Some(v) = &self.today_user {
            m.today_user = v.clone();
        }
        if let Some(v) = &self.completed_at {
            m.completed_at = v.clone();
        }
        if let Some(v) = &self.created_at {
            m.created_at = v.clone();
        }
        if let Some(v) = &self.created_by {
            m.created_by = v.clone();
        }
        if let Some(v) = &self.updated_at {
            m.updated_at = v.clone();
        }
        if let Some(v) = &self.updated_by {
            m.updated_by = v.clone();
        }
    }

    /// Build a full mission from a complete record (list responses).
    pub fn into_mission(self) -> Mission {
        let mut m = Mission {
            task_id: self.task_id.clone(),
            ..Mission::default()
        };
        self.merge_into(&mut m);
        m
    }
}

/// A quest as the server returns it. Same merge semantics as
/// [`MissionRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestRecord {
    pub quest_id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub assignee: Option<String>,
    pub leader_email: Option<String>,
    pub status: Option<Status>,
    pub is_tracked: Option<bool>,
    pub tracked_at: Option<String>,
    pub completed_at: Option<String>,
    pub color: Option<String>,
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_at: Option<String>,
    pub updated_by: Option<String>,
}

impl QuestRecord {
    /// Merge the server-confirmed fields into a locally-held quest.
    pub fn merge_into(&self, q: &mut Quest) {
        if let Some(v) = &self.title {
            q.title = v.clone();
        }
        if let Some(v) = &self.notes {
            q.notes = v.clone();
        }
        if let Some(v) = &self.assignee {
            q.assignee = v.clone();
        }
        if let Some(v) = &self.leader_email {
            q.leader_email = v.clone();
        }
        if let Some(v) = self.status {
            q.status = v;
        }
        if let Some(v) = self.is_tracked {
            q.is_tracked = v;
        }
        if let Some(v) = &self.tracked_at {
            q.tracked_at = v.clone();
        }
        if let Some(v) = &self.completed_at {
            q.completed_at = v.clone();
        }
        if let Some(v) = &self.color {
            q.color = v.clone();
        }
        if let Some(v) = &self.created_at {
            q.created_at = v.clone();
        }
        if let Some(v) = &self.created_by {
            q.created_by = v.clone();
        }
        if let Some(v) = &self.updated_at {
            q.updated_at = v.clone();
        }
        if let Some(v) = &self.updated_by {
            q.updated_by = v.clone();
        }
    }

    /// Build a full quest from a complete record (list responses).
    pub fn into_quest(self) -> Quest {
        let mut q = Quest {
            quest_id: self.quest_id.clone(),
            ..Quest::default()
        };
        self.merge_into(&mut q);
        q
    }
}

/// Input for `createMission`. Omitted fields take server defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMissionInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
}

/// Field patch for `updateMission`. `None` fields are left untouched, both
/// locally and on the server; empty strings explicitly clear where the wire
/// supports clearing (`due_date`, `quest_id`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MissionPatch {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
}

impl MissionPatch {
    pub fn new(task_id: impl Into<String>) -> Self {
        MissionPatch {
            task_id: task_id.into(),
            ..MissionPatch::default()
        }
    }

    /// Apply the patch to a mission, the optimistic half of an update.
    pub fn apply_to(&self, m: &mut Mission) {
        if let Some(v) = &self.title {
            m.title = v.clone();
        }
        if let Some(v) = &self.notes {
            m.notes = v.clone();
        }
        if let Some(v) = self.priority {
            m.priority = v;
        }
        if let Some(v) = self.challenge {
            m.challenge = Some(v);
        }
        if let Some(v) = &self.assignee {
            m.assignee = v.clone();
        }
        if let Some(v) = self.status {
            m.status = v;
        }
        if let Some(v) = &self.due_date {
            m.due_date = parse_wire_date(v);
        }
        if let Some(v) = &self.quest_id {
            m.quest_id = v.clone();
        }
    }
}

/// Input for `createQuest`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateQuestInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Field patch for `updateQuest`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestPatch {
    pub quest_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl QuestPatch {
    pub fn new(quest_id: impl Into<String>) -> Self {
        QuestPatch {
            quest_id: quest_id.into(),
            ..QuestPatch::default()
        }
    }

    /// Apply the patch to a quest, the optimistic half of an update.
    pub fn apply_to(&self, q: &mut Quest) {
        if let Some(v) = &self.title {
            q.title = v.clone();
        }
        if let Some(v) = &self.notes {
            q.notes = v.clone();
        }
        if let Some(v) = &self.assignee {
            q.assignee = v.clone();
        }
        if let Some(v) = &self.leader_email {
            q.leader_email = v.clone();
        }
        if let Some(v) = self.status {
            q.status = v;
        }
        if let Some(v) = &self.color {
            q.color = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mission() -> Mission {
        Mission {
            task_id: "t1".into(),
            title: "Fix the gate latch".into(),
            notes: "east side".into(),
            priority: Priority::High,
            challenge: Some(Challenge::Medium),
            assignee: "john@example.com".into(),
            today_slot: "3".into(),
            today_user: "john@example.com".into(),
            ..Mission::default()
        }
    }

    #[test]
    fn partial_record_keeps_omitted_fields() {
        let mut m = mission();
        let rec = MissionRecord {
            task_id: "t1".into(),
            status: Some(Status::Done),
            updated_at: Some("2026-08-30T10:00:00Z".into()),
            ..MissionRecord::default()
        };
        rec.merge_into(&mut m);
        assert_eq!(m.status, Status::Done);
        assert_eq!(m.updated_at, "2026-08-30T10:00:00Z");
        // Omitted fields retain their optimistic values.
        assert_eq!(m.title, "Fix the gate latch");
        assert_eq!(m.today_slot, "3");
        assert_eq!(m.challenge, Some(Challenge::Medium));
    }

    #[test]
    fn present_but_empty_field_clears() {
        let mut m = mission();
        let rec = MissionRecord {
            task_id: "t1".into(),
            today_slot: Some(String::new()),
            challenge: Some(String::new()),
            ..MissionRecord::default()
        };
        rec.merge_into(&mut m);
        assert_eq!(m.today_slot, "");
        assert_eq!(m.challenge, None);
    }

    #[test]
    fn record_into_mission_parses_typed_fields() {
        let rec = MissionRecord {
            task_id: "t9".into(),
            title: Some("Water plants".into()),
            priority: Some(Priority::Low),
            challenge: Some("low".into()),
            due_date: Some("2026-09-02".into()),
            ..MissionRecord::default()
        };
        let m = rec.into_mission();
        assert_eq!(m.task_id, "t9");
        assert_eq!(m.priority, Priority::Low);
        assert_eq!(m.challenge, Some(Challenge::Low));
        assert_eq!(m.due_date, NaiveDate::from_ymd_opt(2026, 9, 2));
        assert_eq!(m.status, Status::Open);
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut m = mission();
        let patch = MissionPatch {
            title: Some("Fix the latch".into()),
            due_date: Some("2026-09-01".into()),
            ..MissionPatch::new("t1")
        };
        patch.apply_to(&mut m);
        assert_eq!(m.title, "Fix the latch");
        assert_eq!(m.due_date, NaiveDate::from_ymd_opt(2026, 9, 1));
        assert_eq!(m.priority, Priority::High);
    }

    #[test]
    fn patch_empty_due_date_clears() {
        let mut m = mission();
        m.due_date = NaiveDate::from_ymd_opt(2026, 8, 1);
        let patch = MissionPatch {
            due_date: Some(String::new()),
            ..MissionPatch::new("t1")
        };
        patch.apply_to(&mut m);
        assert_eq!(m.due_date, None);
    }

    #[test]
    fn create_input_serializes_sparsely() {
        let input = CreateMissionInput {
            title: "Buy groceries".into(),
            priority: Some(Priority::High),
            ..CreateMissionInput::default()
        };
        let v = serde_json::to_value(&input).unwrap();
        assert_eq!(v, serde_json::json!({"title": "Buy groceries", "priority": "high"}));
    }
}
