//! Penalty and score computation for a finished game.
//!
//! Everything here is pure: the same inputs always give the same breakdown, so
//! a stored result can be audited by recomputing it.

use std::collections::HashSet;

use crate::model::{GameProgress, SpotId};

/// Milliseconds in one minute.
pub const MINUTE_MS: i64 = 60_000;

/// Arriving up to this long before the deadline is not penalised.
pub const GRACE_MS: i64 = 15 * MINUTE_MS;

/// Penalty points per missed checkpoint.
pub const CHECKPOINT_PENALTY_POINTS: i64 = 100;

/// Score every finished game starts from before penalties and bonuses.
pub const BASE_SCORE: i64 = 0;

/// Time penalty in points (one per whole minute outside the finishing window).
///
/// The window is `[deadline - GRACE_MS, deadline]` with
/// `deadline = started_at_ms + duration_min * 60_000`. Partial minutes are
/// truncated.
#[must_use]
pub fn compute_time_penalty(started_at_ms: i64, duration_min: u32, ended_at_ms: i64) -> i64 {
    let deadline = started_at_ms.saturating_add(i64::from(duration_min) * MINUTE_MS);
    let window_start = deadline - GRACE_MS;

    let outside_ms = if ended_at_ms < window_start {
        window_start - ended_at_ms
    } else if ended_at_ms > deadline {
        ended_at_ms - deadline
    } else {
        0
    };

    outside_ms / MINUTE_MS
}

/// Number of checkpoints not reached.
#[must_use]
pub fn missing_checkpoints(cp_spot_ids: &[SpotId], reached_cp_ids: &[SpotId]) -> usize {
    let reached: HashSet<&SpotId> = reached_cp_ids.iter().collect();
    cp_spot_ids.iter().filter(|id| !reached.contains(id)).count()
}

#[must_use]
pub fn checkpoint_penalty(missing: usize) -> i64 {
    i64::try_from(missing)
        .unwrap_or(i64::MAX)
        .saturating_mul(CHECKPOINT_PENALTY_POINTS)
}

/// Full penalty/score breakdown of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub time_penalty: i64,
    pub checkpoint_penalty: i64,
    pub missing_checkpoints: usize,
    pub total_penalty: i64,
    pub achievement_bonus: i64,
    pub score: i64,
}

impl ScoreBreakdown {
    /// Penalty as shown to the player: `"0"` or `"-N"`.
    #[must_use]
    pub fn penalty_display(&self) -> String {
        format_penalty(self.total_penalty)
    }
}

#[must_use]
pub fn format_penalty(penalty: i64) -> String {
    if penalty == 0 {
        "0".to_owned()
    } else {
        format!("-{}", penalty.unsigned_abs())
    }
}

/// Build the breakdown from raw fields.
#[must_use]
pub fn compute_breakdown(
    started_at_ms: i64,
    duration_min: u32,
    ended_at_ms: i64,
    cp_spot_ids: &[SpotId],
    reached_cp_ids: &[SpotId],
    achievement_bonus: i64,
) -> ScoreBreakdown {
    let time_penalty = compute_time_penalty(started_at_ms, duration_min, ended_at_ms);
    let missing = missing_checkpoints(cp_spot_ids, reached_cp_ids);
    let checkpoint_penalty = checkpoint_penalty(missing);
    let total_penalty = time_penalty.saturating_add(checkpoint_penalty);

    ScoreBreakdown {
        time_penalty,
        checkpoint_penalty,
        missing_checkpoints: missing,
        total_penalty,
        achievement_bonus,
        score: BASE_SCORE - total_penalty + achievement_bonus,
    }
}

/// Breakdown for a game record, or `None` if it has not finished.
#[must_use]
pub fn score_session(progress: &GameProgress) -> Option<ScoreBreakdown> {
    let ended = progress.ended_at_ms()?;
    Some(compute_breakdown(
        progress.started_at_ms(),
        progress.config().duration_min(),
        ended,
        progress.cp_spot_ids(),
        progress.reached_cp_ids(),
        progress.achievement_bonus(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: i64 = 1_700_000_000_000;
    const DURATION: u32 = 90;
    const DEADLINE: i64 = START + 90 * MINUTE_MS;

    #[test]
    fn no_penalty_inside_window() {
        for ended in [
            DEADLINE - GRACE_MS,
            DEADLINE - GRACE_MS + 1,
            DEADLINE - 5 * MINUTE_MS,
            DEADLINE,
        ] {
            assert_eq!(compute_time_penalty(START, DURATION, ended), 0, "ended={ended}");
        }
    }

    #[test]
    fn late_penalty_truncates_seconds() {
        assert_eq!(compute_time_penalty(START, DURATION, DEADLINE + 59_999), 0);
        assert_eq!(compute_time_penalty(START, DURATION, DEADLINE + 90_000), 1);
        assert_eq!(compute_time_penalty(START, DURATION, DEADLINE + 7 * MINUTE_MS), 7);
    }

    #[test]
    fn early_penalty_counts_from_window_start() {
        let window_start = DEADLINE - GRACE_MS;
        assert_eq!(compute_time_penalty(START, DURATION, window_start - 30_000), 0);
        assert_eq!(
            compute_time_penalty(START, DURATION, window_start - 3 * MINUTE_MS - 10_000),
            3
        );
    }

    #[test]
    fn checkpoint_penalty_is_per_missing_checkpoint() {
        let cps = vec![SpotId::new("a"), SpotId::new("b"), SpotId::new("c")];
        let reached = vec![SpotId::new("b")];
        let missing = missing_checkpoints(&cps, &reached);
        assert_eq!(missing, 2);
        assert_eq!(checkpoint_penalty(missing), 200);
    }

    #[test]
    fn breakdown_combines_penalties_and_bonus() {
        let cps = vec![SpotId::new("a"), SpotId::new("b")];
        let reached = vec![SpotId::new("a")];
        let b = compute_breakdown(START, DURATION, DEADLINE + 2 * MINUTE_MS, &cps, &reached, 40);

        assert_eq!(b.time_penalty, 2);
        assert_eq!(b.checkpoint_penalty, 100);
        assert_eq!(b.total_penalty, 102);
        assert_eq!(b.score, BASE_SCORE - 102 + 40);
        assert_eq!(b.penalty_display(), "-102");
    }

    #[test]
    fn zero_penalty_displays_without_sign() {
        assert_eq!(format_penalty(0), "0");
    }

    #[test]
    fn breakdown_is_repeatable() {
        let cps = vec![SpotId::new("a")];
        let first = compute_breakdown(START, DURATION, DEADLINE + 1, &cps, &[], 5);
        let second = compute_breakdown(START, DURATION, DEADLINE + 1, &cps, &[], 5);
        assert_eq!(first, second);
    }
}
