use serde::Serialize;

use rogaine_core::model::{EndReason, GameError, GameProgress};

use crate::reference_data::ReferenceData;

pub const PAYLOAD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementEntry {
    pub id: String,
    pub points: u32,
}

/// Wire shape of a submitted result, version 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPayloadV1 {
    pub schema: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub share_ok: bool,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub duration_min: u32,
    pub end_reason: EndReason,
    pub score: i64,
    pub penalty: i64,
    pub time_penalty: i64,
    pub checkpoint_penalty: i64,
    pub checkpoint_total: usize,
    pub checkpoint_reached: usize,
    pub visited_spot_ids: Vec<String>,
    pub visited_spot_names: Vec<String>,
    pub reached_cp_ids: Vec<String>,
    pub station_event_count: usize,
    pub achievement_bonus: i64,
    pub achievements: Vec<AchievementEntry>,
}

/// Build the payload from a finished game.
///
/// Scores are recomputed rather than copied from the record.
///
/// # Errors
///
/// Returns `GameError::NotFinished` for a game that has not ended.
pub fn build_payload_v1(
    progress: &GameProgress,
    reference: &ReferenceData,
    token: Option<String>,
    share_ok: bool,
) -> Result<ResultPayloadV1, GameError> {
    let breakdown = progress.breakdown()?;
    let (Some(ended_at_ms), Some(end_reason)) = (progress.ended_at_ms(), progress.end_reason())
    else {
        return Err(GameError::NotFinished);
    };

    Ok(ResultPayloadV1 {
        schema: PAYLOAD_SCHEMA_VERSION,
        token,
        share_ok,
        started_at_ms: progress.started_at_ms(),
        ended_at_ms,
        duration_min: progress.config().duration_min(),
        end_reason,
        score: breakdown.score,
        penalty: breakdown.total_penalty,
        time_penalty: breakdown.time_penalty,
        checkpoint_penalty: breakdown.checkpoint_penalty,
        checkpoint_total: progress.cp_spot_ids().len(),
        checkpoint_reached: progress.reached_cp_ids().len(),
        visited_spot_ids: progress
            .visited_spot_ids()
            .iter()
            .map(ToString::to_string)
            .collect(),
        visited_spot_names: progress
            .visited_spot_ids()
            .iter()
            .map(|id| reference.spot_name(id))
            .collect(),
        reached_cp_ids: progress
            .reached_cp_ids()
            .iter()
            .map(ToString::to_string)
            .collect(),
        station_event_count: progress.visited_station_events().len(),
        achievement_bonus: breakdown.achievement_bonus,
        achievements: progress
            .achievement_unlocked()
            .iter()
            .map(|a| AchievementEntry {
                id: a.id.to_string(),
                points: a.points,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rogaine_core::model::{
        Achievement, AchievementId, GameConfig, Spot, SpotId, StationEvent, StationId,
    };
    use rogaine_core::time::fixed_now_ms;

    fn finished_game() -> GameProgress {
        let start = fixed_now_ms();
        let mut game = GameProgress::new(
            start,
            GameConfig::new(60).unwrap(),
            vec![SpotId::new("S1"), SpotId::new("S2"), SpotId::new("S3")],
        );
        game.visit_spot(SpotId::new("S1")).unwrap();
        game.visit_spot(SpotId::new("S7")).unwrap();
        game.record_station_event(StationEvent::board(StationId::new("T1")))
            .unwrap();
        game.unlock_achievement(Achievement {
            id: AchievementId::new("early-bird"),
            name: "Early bird".into(),
            points: 30,
        })
        .unwrap();
        // 90 seconds late.
        game.finish(start + 60 * 60_000 + 90_000, EndReason::Completed)
            .unwrap();
        game
    }

    #[test]
    fn payload_carries_recomputed_score_and_names() {
        let reference = ReferenceData::new(
            vec![Spot::new(SpotId::new("S1"), "Lighthouse", true)],
            Vec::new(),
        );
        let payload =
            build_payload_v1(&finished_game(), &reference, Some("tok".into()), true).unwrap();

        assert_eq!(payload.schema, 1);
        assert_eq!(payload.time_penalty, 1);
        assert_eq!(payload.checkpoint_penalty, 200);
        assert_eq!(payload.penalty, 201);
        assert_eq!(payload.score, -171);
        assert_eq!(payload.checkpoint_total, 3);
        assert_eq!(payload.checkpoint_reached, 1);
        assert_eq!(payload.visited_spot_names, ["Lighthouse", "S7"]);
        assert_eq!(payload.station_event_count, 1);
        assert_eq!(
            payload.achievements,
            [AchievementEntry {
                id: "early-bird".into(),
                points: 30
            }]
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["end_reason"], "COMPLETED");
        assert_eq!(json["token"], "tok");
        assert_eq!(json["share_ok"], true);
    }

    #[test]
    fn unfinished_game_has_no_payload() {
        let game = GameProgress::new(fixed_now_ms(), GameConfig::new(30).unwrap(), Vec::new());
        let err = build_payload_v1(&game, &ReferenceData::unavailable(), None, true).unwrap_err();
        assert_eq!(err, GameError::NotFinished);
    }
}
