//! Entity store with optimistic mutation.
//!
//! Every user-initiated write follows one protocol: snapshot the
//! collections, apply the change locally, fire the gateway call, then
//! either reconcile the server's confirmed record into the local entity or
//! restore the snapshot wholesale. The caller sees the change immediately
//! and never sees a half-applied state after a failure.
//!
//! The store owns communication with the toast sink: exactly one toast per
//! mutation, success or failure. Read-only refreshes are silent.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::debug;

use crate::budget::local_points;
use crate::fields::{EnergyLevel, QuestCompletionMode, Status};
use crate::gateway::{ApiError, Gateway};
use crate::import::parse_block;
use crate::mission::{
    CreateMissionInput, CreateQuestInput, LoadoutConfig, Mission, MissionPatch, Quest, QuestPatch,
};
use crate::notify::Notifier;
use crate::session::Session;
use crate::slot::next_ordinal;
use crate::views;

/// Default cap on simultaneously tracked quests.
pub const DEFAULT_TRACKED_LIMIT: usize = 3;
/// When the cap is lifted, warn past this many tracked quests instead of
/// rejecting.
pub const TRACKED_SOFT_CAP: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("unknown mission: {0}")]
    UnknownMission(String),
    #[error("unknown quest: {0}")]
    UnknownQuest(String),
    /// Rejected locally; no gateway call was made.
    #[error("tracking limit reached ({0} quests)")]
    TrackedLimit(usize),
    /// Rejected locally; only the signed-in user's loadout is editable.
    #[error("viewing {0}'s board; only your own loadout is editable")]
    ForeignLoadout(String),
    /// Rejected locally; a quest with open missions needs a completion
    /// mode before anything goes over the wire.
    #[error("quest has {0} open missions; choose cascade_done or detach_open")]
    OpenMissions(usize),
}

/// The locally-held entity collections. Cloned whole as the rollback
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    /// Open (and canceled-in-session) missions.
    pub missions: Vec<Mission>,
    /// Completed missions, kept separately for the accomplished view.
    pub completed: Vec<Mission>,
    pub quests: Vec<Quest>,
}

impl Collections {
    pub fn mission(&self, task_id: &str) -> Option<&Mission> {
        self.missions.iter().find(|m| m.task_id == task_id)
    }

    pub fn mission_mut(&mut self, task_id: &str) -> Option<&mut Mission> {
        self.missions.iter_mut().find(|m| m.task_id == task_id)
    }

    pub fn quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.quest_id == quest_id)
    }

    pub fn quest_mut(&mut self, quest_id: &str) -> Option<&mut Quest> {
        self.quests.iter_mut().find(|q| q.quest_id == quest_id)
    }
}

/// Await a gateway call; on failure restore the pre-mutation snapshot.
///
/// Takes the future rather than the gateway so callers can hold the
/// collections mutably while the (lazy, not yet polled) call borrows the
/// gateway.
async fn with_rollback<T, F>(
    collections: &mut Collections,
    snapshot: Collections,
    fut: F,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match fut.await {
        Ok(v) => Ok(v),
        Err(err) => {
            debug!("rolling back optimistic mutation");
            *collections = snapshot;
            Err(err)
        }
    }
}

/// The client-side state controller: collections, loadout config and
/// session, mutated through the optimistic protocol against a [`Gateway`].
pub struct Store<G, N> {
    gateway: G,
    pub notifier: N,
    pub collections: Collections,
    pub loadout: Option<LoadoutConfig>,
    pub session: Session,
    /// `None` lifts the cap (the soft warning still applies).
    pub tracked_limit: Option<usize>,
}

impl<G: Gateway, N: Notifier> Store<G, N> {
    pub fn new(gateway: G, notifier: N, session: Session) -> Self {
        Store {
            gateway,
            notifier,
            collections: Collections::default(),
            loadout: None,
            session,
            tracked_limit: Some(DEFAULT_TRACKED_LIMIT),
        }
    }

    // ---- refreshes (silent) ----

    pub async fn refresh_missions(&mut self) -> Result<(), StoreError> {
        self.collections.missions = self.gateway.get_missions(Some("open"), None).await?;
        Ok(())
    }

    pub async fn refresh_completed(&mut self) -> Result<(), StoreError> {
        self.collections.completed = self.gateway.get_missions(Some("done"), None).await?;
        Ok(())
    }

    pub async fn refresh_quests(&mut self) -> Result<(), StoreError> {
        self.collections.quests = self.gateway.get_quests(None, None).await?;
        Ok(())
    }

    pub async fn refresh_loadout(&mut self) -> Result<(), StoreError> {
        self.loadout = Some(self.gateway.get_loadout_config().await?);
        Ok(())
    }

    pub async fn refresh_all(&mut self) -> Result<(), StoreError> {
        self.refresh_missions().await?;
        self.refresh_completed().await?;
        self.refresh_quests().await?;
        self.refresh_loadout().await?;
        Ok(())
    }

    /// Loadout edits while viewing someone else's board are rejected before
    /// any gateway call.
    fn require_own_loadout(&mut self) -> Result<(), StoreError> {
        if self.session.can_edit_loadout() {
            return Ok(());
        }
        let viewing = self.session.viewing_user.clone();
        self.notifier.error(&format!(
            "Viewing {viewing}'s board; only your own loadout is editable"
        ));
        Err(StoreError::ForeignLoadout(viewing))
    }

    /// Best-effort budget resync after a mutation that moved points.
    async fn resync_loadout(&mut self) {
        if let Ok(config) = self.gateway.get_loadout_config().await {
            self.loadout = Some(config);
        }
    }

    // ---- missions ----

    /// Create is confirmed-first: the server mints the id, so there is no
    /// entity to mutate optimistically.
    pub async fn create_mission(&mut self, input: CreateMissionInput) -> Result<(), StoreError> {
        match self.gateway.create_mission(&input).await {
            Ok(record) => {
                self.collections.missions.push(record.into_mission());
                self.notifier.success("Mission created");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn update_mission(&mut self, patch: MissionPatch) -> Result<(), StoreError> {
        let snapshot = self.collections.clone();
        let m = self
            .collections
            .mission_mut(&patch.task_id)
            .ok_or_else(|| StoreError::UnknownMission(patch.task_id.clone()))?;
        patch.apply_to(m);

        let fut = self.gateway.update_mission(&patch);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(m) = self.collections.mission_mut(&patch.task_id) {
                    record.merge_into(m);
                }
                self.notifier.success("Mission updated");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Complete a mission, moving it into the accomplished collection. The
    /// loadout slot is kept on the history record even when the server
    /// clears it, so "accomplished today" can still show where it sat.
    pub async fn complete_mission(
        &mut self,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let snapshot = self.collections.clone();
        let idx = self
            .collections
            .missions
            .iter()
            .position(|m| m.task_id == task_id)
            .ok_or_else(|| StoreError::UnknownMission(task_id.to_string()))?;
        let mut m = self.collections.missions.remove(idx);
        m.status = Status::Done;
        m.completed_at = now.to_rfc3339();
        let slot = m.today_slot.clone();
        let today_user = m.today_user.clone();
        self.collections.completed.push(m);

        let fut = self.gateway.complete_mission(task_id);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(m) = self
                    .collections
                    .completed
                    .iter_mut()
                    .find(|m| m.task_id == task_id)
                {
                    record.merge_into(m);
                    if m.today_slot.is_empty() {
                        m.today_slot = slot;
                    }
                    if m.today_user.is_empty() {
                        m.today_user = today_user;
                    }
                }
                self.notifier.success("Mission completed");
                self.resync_loadout().await;
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn cancel_mission(&mut self, task_id: &str) -> Result<(), StoreError> {
        let snapshot = self.collections.clone();
        let m = self
            .collections
            .mission_mut(task_id)
            .ok_or_else(|| StoreError::UnknownMission(task_id.to_string()))?;
        m.status = Status::Canceled;

        let fut = self.gateway.cancel_mission(task_id);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(m) = self.collections.mission_mut(task_id) {
                    record.merge_into(m);
                }
                self.collections.missions.retain(|m| m.task_id != task_id);
                self.notifier.success("Mission canceled");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Place a mission in the viewed user's loadout. With no explicit slot
    /// the mission is appended after the highest occupied ordinal. With
    /// `swap_with`, the two missions exchange positions.
    pub async fn assign_today(
        &mut self,
        task_id: &str,
        slot: Option<&str>,
        swap_with: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.require_own_loadout()?;
        let user = self.session.viewing_user.clone();
        let snapshot = self.collections.clone();
        if self.collections.mission(task_id).is_none() {
            return Err(StoreError::UnknownMission(task_id.to_string()));
        }

        let target_slot = match slot {
            Some(s) => s.to_string(),
            None => {
                let occupied = views::loadout_missions(&self.collections.missions, &user);
                next_ordinal(occupied.iter().map(|m| m.today_slot.as_str()))
            }
        };

        // An explicit slot that is already taken swaps with its occupant,
        // so no two missions ever share an ordinal on one board.
        let swap_with = match (slot, swap_with) {
            (_, Some(other)) => Some(other.to_string()),
            (Some(s), None) => self
                .collections
                .missions
                .iter()
                .find(|m| {
                    m.task_id != task_id
                        && m.today_user == user
                        && m.today_slot.trim() == s.trim()
                })
                .map(|m| m.task_id.clone()),
            (None, None) => None,
        };

        if let Some(other_id) = swap_with.as_deref() {
            let prev = self
                .collections
                .mission(task_id)
                .map(|m| m.today_slot.clone())
                .unwrap_or_default();
            if let Some(other) = self.collections.mission_mut(other_id) {
                other.today_slot = prev;
                if other.today_slot.is_empty() {
                    other.today_set_at.clear();
                    other.today_user.clear();
                }
            }
        }
        if let Some(m) = self.collections.mission_mut(task_id) {
            m.today_slot = target_slot.clone();
            m.today_set_at = now.to_rfc3339();
            m.today_user = user.clone();
        }

        let over_budget = self.loadout.as_ref().and_then(|config| {
            let points = local_points(&self.collections.missions, &user);
            (points > config.points_limit).then_some((points, config.points_limit))
        });

        let fut = self
            .gateway
            .assign_today(task_id, Some(&target_slot), swap_with.as_deref());
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(outcome) => {
                if let Some(m) = self.collections.mission_mut(task_id) {
                    outcome.mission.merge_into(m);
                }
                if let Some(swapped) = &outcome.swapped {
                    if let Some(m) = self.collections.mission_mut(&swapped.task_id) {
                        swapped.merge_into(m);
                    }
                }
                match over_budget {
                    Some((points, limit)) => self.notifier.warn(&format!(
                        "Added to loadout; over budget: {points} of {limit} points"
                    )),
                    None => self.notifier.success("Added to loadout"),
                }
                self.resync_loadout().await;
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn clear_today(&mut self, task_id: &str) -> Result<(), StoreError> {
        self.require_own_loadout()?;
        let snapshot = self.collections.clone();
        let m = self
            .collections
            .mission_mut(task_id)
            .ok_or_else(|| StoreError::UnknownMission(task_id.to_string()))?;
        m.today_slot.clear();
        m.today_set_at.clear();
        m.today_user.clear();

        let fut = self.gateway.clear_today(task_id);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(m) = self.collections.mission_mut(task_id) {
                    record.merge_into(m);
                }
                self.notifier.success("Removed from loadout");
                self.resync_loadout().await;
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Parse a pasted block and create the missions it describes. Lines are
    /// attempted independently by the server; a mixed outcome is a warning,
    /// not a failure.
    pub async fn bulk_create(&mut self, text: &str, today: NaiveDate) -> Result<(), StoreError> {
        let inputs = parse_block(text, today);
        if inputs.is_empty() {
            self.notifier.warn("No missions found in input");
            return Ok(());
        }
        match self.gateway.bulk_create_missions(&inputs).await {
            Ok(outcome) => {
                for line in &outcome.results {
                    if let Some(record) = &line.task {
                        if line.success {
                            self.collections.missions.push(record.clone().into_mission());
                        }
                    }
                }
                if outcome.error_count == 0 {
                    self.notifier
                        .success(&format!("Imported {} missions", outcome.success_count));
                } else if outcome.success_count == 0 {
                    self.notifier.error("Import failed: no missions were created");
                } else {
                    self.notifier.warn(&format!(
                        "Imported {} of {} missions ({} failed)",
                        outcome.success_count, outcome.total, outcome.error_count
                    ));
                }
                self.resync_loadout().await;
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    // ---- loadout config ----

    pub async fn set_energy(&mut self, level: EnergyLevel) -> Result<(), StoreError> {
        let previous = self.loadout;
        if let Some(config) = &mut self.loadout {
            config.energy_level = level;
            config.points_limit = level.points_limit();
        }
        match self.gateway.set_energy_level(level).await {
            Ok(config) => {
                self.loadout = Some(config);
                self.notifier
                    .success(&format!("Energy set to {}", level.as_str()));
                Ok(())
            }
            Err(err) => {
                self.loadout = previous;
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    // ---- quests ----

    pub async fn create_quest(&mut self, input: CreateQuestInput) -> Result<(), StoreError> {
        match self.gateway.create_quest(&input).await {
            Ok(record) => {
                self.collections.quests.push(record.into_quest());
                self.notifier.success("Quest created");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn update_quest(&mut self, patch: QuestPatch) -> Result<(), StoreError> {
        let snapshot = self.collections.clone();
        let q = self
            .collections
            .quest_mut(&patch.quest_id)
            .ok_or_else(|| StoreError::UnknownQuest(patch.quest_id.clone()))?;
        patch.apply_to(q);

        let fut = self.gateway.update_quest(&patch);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(q) = self.collections.quest_mut(&patch.quest_id) {
                    record.merge_into(q);
                }
                self.notifier.success("Quest updated");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Toggle quest tracking. Turning tracking on is capped locally: past
    /// the limit the toggle is rejected before any gateway call.
    pub async fn toggle_quest_tracked(
        &mut self,
        quest_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let turning_on = !self
            .collections
            .quest(quest_id)
            .ok_or_else(|| StoreError::UnknownQuest(quest_id.to_string()))?
            .is_tracked;
        if turning_on {
            let tracked = views::tracked_quests(&self.collections.quests).len();
            match self.tracked_limit {
                Some(limit) if tracked >= limit => {
                    self.notifier
                        .error(&format!("You can track at most {limit} quests"));
                    return Err(StoreError::TrackedLimit(limit));
                }
                None if tracked >= TRACKED_SOFT_CAP => {
                    self.notifier
                        .warn(&format!("Tracking more than {TRACKED_SOFT_CAP} quests"));
                }
                _ => {}
            }
        }

        let snapshot = self.collections.clone();
        if let Some(q) = self.collections.quest_mut(quest_id) {
            q.is_tracked = !q.is_tracked;
            q.tracked_at = if q.is_tracked {
                now.to_rfc3339()
            } else {
                String::new()
            };
        }

        let fut = self.gateway.toggle_quest_tracked(quest_id);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(q) = self.collections.quest_mut(quest_id) {
                    record.merge_into(q);
                }
                let msg = if turning_on {
                    "Quest tracked"
                } else {
                    "Quest untracked"
                };
                self.notifier.success(msg);
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Complete a quest. `cascade_done` completes its open missions too;
    /// `detach_open` releases them to the inbox. A quest that still has
    /// open missions cannot be completed without picking one of the two.
    pub async fn complete_quest(
        &mut self,
        quest_id: &str,
        mode: Option<QuestCompletionMode>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let open_children = self
            .collections
            .missions
            .iter()
            .filter(|m| m.quest_id == quest_id && m.status == Status::Open)
            .count();
        if mode.is_none() && open_children > 0 {
            self.notifier.error(&format!(
                "Quest has {open_children} open missions; complete with cascade_done or detach_open"
            ));
            return Err(StoreError::OpenMissions(open_children));
        }

        let snapshot = self.collections.clone();
        let q = self
            .collections
            .quest_mut(quest_id)
            .ok_or_else(|| StoreError::UnknownQuest(quest_id.to_string()))?;
        q.status = Status::Done;
        q.completed_at = now.to_rfc3339();

        match mode {
            Some(QuestCompletionMode::CascadeDone) => {
                let mut i = 0;
                while i < self.collections.missions.len() {
                    let m = &mut self.collections.missions[i];
                    if m.quest_id == quest_id && m.status == Status::Open {
                        m.status = Status::Done;
                        m.completed_at = now.to_rfc3339();
                        let done = self.collections.missions.remove(i);
                        self.collections.completed.push(done);
                    } else {
                        i += 1;
                    }
                }
            }
            Some(QuestCompletionMode::DetachOpen) => {
                for m in &mut self.collections.missions {
                    if m.quest_id == quest_id && m.status == Status::Open {
                        m.quest_id.clear();
                    }
                }
            }
            None => {}
        }

        let fut = self.gateway.complete_quest(quest_id, mode);
        match with_rollback(&mut self.collections, snapshot, fut).await {
            Ok(record) => {
                if let Some(q) = self.collections.quest_mut(quest_id) {
                    record.merge_into(q);
                }
                self.notifier.success("Quest completed");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err.into())
            }
        }
    }
}
