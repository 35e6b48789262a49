use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use rogaine_core::model::{
    Achievement, EndReason, GameConfig, GameError, GameProgress, SpotId, StationEvent,
    StationEventKind, StationId,
};
use rogaine_core::scoring::ScoreBreakdown;
use storage::repository::{GameRepository, SpotRepository};

use crate::Clock;
use crate::error::GameServiceError;

/// Drives the lifecycle of the current game and keeps the slot persisted.
///
/// Every mutation loads the slot, applies the change and writes it back.
#[derive(Clone)]
pub struct GameService {
    clock: Clock,
    games: Arc<dyn GameRepository>,
    spots: Arc<dyn SpotRepository>,
}

impl GameService {
    #[must_use]
    pub fn new(
        clock: Clock,
        games: Arc<dyn GameRepository>,
        spots: Arc<dyn SpotRepository>,
    ) -> Self {
        Self {
            clock,
            games,
            spots,
        }
    }

    /// Start a new game now, replacing whatever the slot held.
    ///
    /// # Errors
    ///
    /// Returns `GameServiceError::Storage` if the game cannot be saved.
    pub async fn start(
        &self,
        config: GameConfig,
        cp_spot_ids: Vec<SpotId>,
    ) -> Result<GameProgress, GameServiceError> {
        let game = GameProgress::new(self.clock.now_ms(), config, cp_spot_ids);
        self.games.save_game(&game).await?;
        log::info!(
            "started game at {} ({} min, {} checkpoints)",
            game.started_at_ms(),
            config.duration_min(),
            game.cp_spot_ids().len()
        );
        Ok(game)
    }

    /// Start a new game with `count` checkpoints drawn from the judge-target spots.
    ///
    /// # Errors
    ///
    /// Returns `GameServiceError::NotEnoughCheckpoints` when fewer candidates exist,
    /// or a storage error.
    pub async fn start_with_random_checkpoints<R: Rng + ?Sized>(
        &self,
        config: GameConfig,
        count: usize,
        rng: &mut R,
    ) -> Result<GameProgress, GameServiceError> {
        let mut candidates: Vec<SpotId> = self
            .spots
            .list_judge_targets()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        if candidates.len() < count {
            return Err(GameServiceError::NotEnoughCheckpoints {
                wanted: count,
                available: candidates.len(),
            });
        }
        candidates.shuffle(rng);
        candidates.truncate(count);
        self.start(config, candidates).await
    }

    /// # Errors
    ///
    /// Returns `GameServiceError::Storage` on read failures.
    pub async fn current(&self) -> Result<Option<GameProgress>, GameServiceError> {
        Ok(self.games.load_game().await?)
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut GameProgress) -> Result<T, GameError>,
    ) -> Result<T, GameServiceError> {
        let mut game = self
            .games
            .load_game()
            .await?
            .ok_or(GameServiceError::NoActiveGame)?;
        let out = apply(&mut game)?;
        self.games.save_game(&game).await?;
        Ok(out)
    }

    /// Record a spot visit; returns `true` if it reached a new checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `GameServiceError` if no game is running, it already finished,
    /// or storage fails.
    pub async fn visit_spot(&self, spot_id: SpotId) -> Result<bool, GameServiceError> {
        let reached = self.mutate(|g| g.visit_spot(spot_id)).await?;
        if reached {
            log::debug!("checkpoint reached");
        }
        Ok(reached)
    }

    /// # Errors
    ///
    /// Returns `GameServiceError` if the spot is not a checkpoint, no game is
    /// running, or storage fails.
    pub async fn mark_checkpoint_reached(&self, spot_id: SpotId) -> Result<bool, GameServiceError> {
        self.mutate(|g| g.mark_checkpoint_reached(spot_id)).await
    }

    /// # Errors
    ///
    /// Returns `GameServiceError` if no game is running, it already finished,
    /// or storage fails.
    pub async fn record_station_event(
        &self,
        kind: StationEventKind,
        station_id: StationId,
    ) -> Result<(), GameServiceError> {
        let event = StationEvent { kind, station_id };
        self.mutate(|g| g.record_station_event(event)).await
    }

    /// # Errors
    ///
    /// Returns `GameServiceError` if no game is running, it already finished,
    /// or storage fails.
    pub async fn unlock_achievement(
        &self,
        achievement: Achievement,
    ) -> Result<bool, GameServiceError> {
        self.mutate(|g| g.unlock_achievement(achievement)).await
    }

    /// End the game normally and score it.
    ///
    /// # Errors
    ///
    /// Returns `GameServiceError` if no game is running, it already finished,
    /// or storage fails.
    pub async fn finish(&self) -> Result<ScoreBreakdown, GameServiceError> {
        let now = self.clock.now_ms();
        let breakdown = self
            .mutate(|g| g.finish(now, EndReason::Completed))
            .await?;
        log::info!(
            "game finished: score {}, penalty {}",
            breakdown.score,
            breakdown.total_penalty
        );
        Ok(breakdown)
    }

    /// End the game without a result.
    ///
    /// # Errors
    ///
    /// Returns `GameServiceError` if no game is running, it already finished,
    /// or storage fails.
    pub async fn abandon(&self) -> Result<(), GameServiceError> {
        let now = self.clock.now_ms();
        self.mutate(|g| g.finish(now, EndReason::Abandoned).map(|_| ()))
            .await?;
        log::info!("game abandoned");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `GameServiceError::Storage` if the slot cannot be cleared.
    pub async fn clear(&self) -> Result<(), GameServiceError> {
        self.games.clear_game().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rogaine_core::model::Spot;
    use rogaine_core::time::fixed_now_ms;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository, clock: Clock) -> GameService {
        GameService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn full_lifecycle_is_persisted() {
        let repo = InMemoryRepository::new();
        let mut clock = Clock::manual(fixed_now_ms());
        let svc = service(&repo, clock.clone());

        svc.start(
            GameConfig::new(60).unwrap(),
            vec![SpotId::new("S1"), SpotId::new("S2")],
        )
        .await
        .unwrap();
        assert!(svc.visit_spot(SpotId::new("S1")).await.unwrap());
        svc.record_station_event(StationEventKind::Board, StationId::new("T1"))
            .await
            .unwrap();

        clock.advance(Duration::minutes(63));
        let breakdown = svc.finish().await.unwrap();
        assert_eq!(breakdown.time_penalty, 3);
        assert_eq!(breakdown.checkpoint_penalty, 100);

        let stored = svc.current().await.unwrap().unwrap();
        assert_eq!(stored.penalty(), 103);
        assert_eq!(stored.visited_station_events().len(), 1);

        let err = svc.visit_spot(SpotId::new("S2")).await.unwrap_err();
        assert!(matches!(err, GameServiceError::Game(GameError::AlreadyFinished)));
    }

    #[tokio::test]
    async fn mutations_need_a_game() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Clock::manual(fixed_now_ms()));
        let err = svc.visit_spot(SpotId::new("S1")).await.unwrap_err();
        assert!(matches!(err, GameServiceError::NoActiveGame));
    }

    #[tokio::test]
    async fn starting_again_overwrites_the_slot() {
        let repo = InMemoryRepository::new();
        let mut clock = Clock::manual(fixed_now_ms());
        let svc = service(&repo, clock.clone());

        svc.start(GameConfig::new(30).unwrap(), Vec::new()).await.unwrap();
        svc.abandon().await.unwrap();
        clock.advance(Duration::hours(1));
        let second = svc.start(GameConfig::new(30).unwrap(), Vec::new()).await.unwrap();

        let current = svc.current().await.unwrap().unwrap();
        assert_eq!(current.started_at_ms(), second.started_at_ms());
        assert!(!current.is_finished());
    }

    #[tokio::test]
    async fn random_checkpoints_come_from_judge_targets() {
        let repo = InMemoryRepository::new();
        repo.replace_spots(&[
            Spot::new(SpotId::new("J1"), "Judge 1", true),
            Spot::new(SpotId::new("J2"), "Judge 2", true),
            Spot::new(SpotId::new("J3"), "Judge 3", true),
            Spot::new(SpotId::new("N1"), "Plain", false),
        ])
        .await
        .unwrap();
        let svc = service(&repo, Clock::manual(fixed_now_ms()));
        let mut rng = StdRng::seed_from_u64(7);

        let game = svc
            .start_with_random_checkpoints(GameConfig::new(60).unwrap(), 2, &mut rng)
            .await
            .unwrap();
        assert_eq!(game.cp_spot_ids().len(), 2);
        assert!(game.cp_spot_ids().iter().all(|id| id.as_str().starts_with('J')));

        let err = svc
            .start_with_random_checkpoints(GameConfig::new(60).unwrap(), 4, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GameServiceError::NotEnoughCheckpoints { wanted: 4, available: 3 }
        ));
    }
}
