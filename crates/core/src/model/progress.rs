use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AchievementId, SpotId, StationId};
use crate::scoring::{self, ScoreBreakdown};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameError {
    #[error("duration must be at least one minute")]
    InvalidDuration,

    #[error("game already finished")]
    AlreadyFinished,

    #[error("game has not finished yet")]
    NotFinished,

    #[error("spot {0} is not a checkpoint of this game")]
    UnknownCheckpoint(SpotId),

    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("invalid persisted game state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── EVENTS & VALUES ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationEventKind {
    Board,
    Alight,
}

impl StationEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "BOARD",
            Self::Alight => "ALIGHT",
        }
    }
}

impl fmt::Display for StationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single boarding or alighting, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEvent {
    pub kind: StationEventKind,
    pub station_id: StationId,
}

impl StationEvent {
    #[must_use]
    pub fn board(station_id: StationId) -> Self {
        Self {
            kind: StationEventKind::Board,
            station_id,
        }
    }

    #[must_use]
    pub fn alight(station_id: StationId) -> Self {
        Self {
            kind: StationEventKind::Alight,
            station_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    Completed,
    Abandoned,
}

impl EndReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        }
    }
}

/// Settings fixed at game setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    duration_min: u32,
}

impl GameConfig {
    /// # Errors
    ///
    /// Returns `GameError::InvalidDuration` for a zero-minute budget.
    pub fn new(duration_min: u32) -> Result<Self, GameError> {
        if duration_min == 0 {
            return Err(GameError::InvalidDuration);
        }
        Ok(Self { duration_min })
    }

    #[must_use]
    pub fn duration_min(&self) -> u32 {
        self.duration_min
    }
}

//
// ─── PERSISTED SHAPE ───────────────────────────────────────────────────────────
//

/// Raw persisted fields of a game, validated by `GameProgress::from_persisted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgressDraft {
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    pub duration_min: u32,
    pub visited_spot_ids: Vec<SpotId>,
    pub cp_spot_ids: Vec<SpotId>,
    pub reached_cp_ids: Vec<SpotId>,
    pub visited_station_events: Vec<StationEvent>,
    #[serde(default)]
    pub achievement_unlocked: Vec<Achievement>,
    #[serde(default)]
    pub achievement_bonus: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub penalty: i64,
    pub end_reason: Option<EndReason>,
}

//
// ─── GAME PROGRESS ─────────────────────────────────────────────────────────────
//

/// One play-through: timing, visits, station log and final outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameProgress {
    started_at_ms: i64,
    ended_at_ms: Option<i64>,
    config: GameConfig,
    visited_spot_ids: Vec<SpotId>,
    cp_spot_ids: Vec<SpotId>,
    reached_cp_ids: Vec<SpotId>,
    visited_station_events: Vec<StationEvent>,
    achievement_unlocked: Vec<Achievement>,
    achievement_bonus: i64,
    score: i64,
    penalty: i64,
    end_reason: Option<EndReason>,
}

impl GameProgress {
    /// Start a fresh game. Duplicate checkpoint ids are collapsed.
    #[must_use]
    pub fn new(started_at_ms: i64, config: GameConfig, cp_spot_ids: Vec<SpotId>) -> Self {
        Self {
            started_at_ms,
            ended_at_ms: None,
            config,
            visited_spot_ids: Vec::new(),
            cp_spot_ids: unique(cp_spot_ids),
            reached_cp_ids: Vec::new(),
            visited_station_events: Vec::new(),
            achievement_unlocked: Vec::new(),
            achievement_bonus: 0,
            score: 0,
            penalty: 0,
            end_reason: None,
        }
    }

    /// Rehydrate a game from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `GameError` if the draft breaks a record invariant.
    pub fn from_persisted(draft: GameProgressDraft) -> Result<Self, GameError> {
        let config = GameConfig::new(draft.duration_min)?;
        if let Some(ended) = draft.ended_at_ms {
            if ended < draft.started_at_ms {
                return Err(GameError::InvalidTimeRange);
            }
        }
        if draft.penalty < 0 {
            return Err(GameError::InvalidPersistedState("negative penalty".into()));
        }
        let cp_set: HashSet<&SpotId> = draft.cp_spot_ids.iter().collect();
        if let Some(stray) = draft.reached_cp_ids.iter().find(|id| !cp_set.contains(id)) {
            return Err(GameError::UnknownCheckpoint(stray.clone()));
        }
        if draft.end_reason.is_some() != draft.ended_at_ms.is_some() {
            return Err(GameError::InvalidPersistedState(
                "end_reason and ended_at must be set together".into(),
            ));
        }

        Ok(Self {
            started_at_ms: draft.started_at_ms,
            ended_at_ms: draft.ended_at_ms,
            config,
            visited_spot_ids: draft.visited_spot_ids,
            cp_spot_ids: unique(draft.cp_spot_ids),
            reached_cp_ids: unique(draft.reached_cp_ids),
            visited_station_events: draft.visited_station_events,
            achievement_unlocked: draft.achievement_unlocked,
            achievement_bonus: draft.achievement_bonus,
            score: draft.score,
            penalty: draft.penalty,
            end_reason: draft.end_reason,
        })
    }

    #[must_use]
    pub fn to_draft(&self) -> GameProgressDraft {
        GameProgressDraft {
            started_at_ms: self.started_at_ms,
            ended_at_ms: self.ended_at_ms,
            duration_min: self.config.duration_min(),
            visited_spot_ids: self.visited_spot_ids.clone(),
            cp_spot_ids: self.cp_spot_ids.clone(),
            reached_cp_ids: self.reached_cp_ids.clone(),
            visited_station_events: self.visited_station_events.clone(),
            achievement_unlocked: self.achievement_unlocked.clone(),
            achievement_bonus: self.achievement_bonus,
            score: self.score,
            penalty: self.penalty,
            end_reason: self.end_reason,
        }
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    #[must_use]
    pub fn ended_at_ms(&self) -> Option<i64> {
        self.ended_at_ms
    }

    #[must_use]
    pub fn config(&self) -> GameConfig {
        self.config
    }

    #[must_use]
    pub fn visited_spot_ids(&self) -> &[SpotId] {
        &self.visited_spot_ids
    }

    #[must_use]
    pub fn cp_spot_ids(&self) -> &[SpotId] {
        &self.cp_spot_ids
    }

    #[must_use]
    pub fn reached_cp_ids(&self) -> &[SpotId] {
        &self.reached_cp_ids
    }

    #[must_use]
    pub fn visited_station_events(&self) -> &[StationEvent] {
        &self.visited_station_events
    }

    #[must_use]
    pub fn achievement_unlocked(&self) -> &[Achievement] {
        &self.achievement_unlocked
    }

    #[must_use]
    pub fn achievement_bonus(&self) -> i64 {
        self.achievement_bonus
    }

    #[must_use]
    pub fn score(&self) -> i64 {
        self.score
    }

    #[must_use]
    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    #[must_use]
    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at_ms.is_some()
    }

    /// Finished normally; the only state in which results are shown or submitted.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_finished() && self.end_reason != Some(EndReason::Abandoned)
    }

    #[must_use]
    pub fn is_checkpoint(&self, spot_id: &SpotId) -> bool {
        self.cp_spot_ids.contains(spot_id)
    }

    #[must_use]
    pub fn has_reached(&self, spot_id: &SpotId) -> bool {
        self.reached_cp_ids.contains(spot_id)
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished);
        }
        Ok(())
    }

    /// Record a spot visit. Visiting a checkpoint spot also marks it reached.
    ///
    /// Returns `true` when this visit reached a checkpoint for the first time.
    ///
    /// # Errors
    ///
    /// Returns `GameError::AlreadyFinished` once the game is finalized.
    pub fn visit_spot(&mut self, spot_id: SpotId) -> Result<bool, GameError> {
        self.ensure_in_progress()?;
        let newly_reached = self.is_checkpoint(&spot_id) && !self.has_reached(&spot_id);
        if newly_reached {
            self.reached_cp_ids.push(spot_id.clone());
        }
        self.visited_spot_ids.push(spot_id);
        Ok(newly_reached)
    }

    /// Mark a checkpoint reached without recording a visit.
    ///
    /// # Errors
    ///
    /// Returns `GameError::UnknownCheckpoint` if the spot is not a checkpoint of this game.
    pub fn mark_checkpoint_reached(&mut self, spot_id: SpotId) -> Result<bool, GameError> {
        self.ensure_in_progress()?;
        if !self.is_checkpoint(&spot_id) {
            return Err(GameError::UnknownCheckpoint(spot_id));
        }
        if self.has_reached(&spot_id) {
            return Ok(false);
        }
        self.reached_cp_ids.push(spot_id);
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns `GameError::AlreadyFinished` once the game is finalized.
    pub fn record_station_event(&mut self, event: StationEvent) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        self.visited_station_events.push(event);
        Ok(())
    }

    /// Unlock an achievement; unlocking the same id twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `GameError::AlreadyFinished` once the game is finalized.
    pub fn unlock_achievement(&mut self, achievement: Achievement) -> Result<bool, GameError> {
        self.ensure_in_progress()?;
        if self
            .achievement_unlocked
            .iter()
            .any(|a| a.id == achievement.id)
        {
            return Ok(false);
        }
        self.achievement_unlocked.push(achievement);
        self.achievement_bonus = self
            .achievement_unlocked
            .iter()
            .map(|a| i64::from(a.points))
            .sum();
        Ok(true)
    }

    /// Finalize the game: fix the end time and compute score and penalty.
    ///
    /// # Errors
    ///
    /// Returns `GameError::AlreadyFinished` if called twice, or
    /// `GameError::InvalidTimeRange` if `ended_at_ms` precedes the start.
    pub fn finish(
        &mut self,
        ended_at_ms: i64,
        reason: EndReason,
    ) -> Result<ScoreBreakdown, GameError> {
        self.ensure_in_progress()?;
        if ended_at_ms < self.started_at_ms {
            return Err(GameError::InvalidTimeRange);
        }
        self.ended_at_ms = Some(ended_at_ms);
        self.end_reason = Some(reason);
        self.recompute()
    }

    /// Score breakdown derived from the current fields.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFinished` while the game is still running.
    pub fn breakdown(&self) -> Result<ScoreBreakdown, GameError> {
        scoring::score_session(self).ok_or(GameError::NotFinished)
    }

    /// Recompute and store `score` and `penalty` from the other fields.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFinished` while the game is still running.
    pub fn recompute(&mut self) -> Result<ScoreBreakdown, GameError> {
        let breakdown = self.breakdown()?;
        self.score = breakdown.score;
        self.penalty = breakdown.total_penalty;
        Ok(breakdown)
    }

    /// True when the stored score/penalty agree with a fresh computation.
    #[must_use]
    pub fn stored_score_matches(&self) -> bool {
        match self.breakdown() {
            Ok(b) => b.score == self.score && b.total_penalty == self.penalty,
            Err(_) => true,
        }
    }
}

fn unique(ids: Vec<SpotId>) -> Vec<SpotId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
