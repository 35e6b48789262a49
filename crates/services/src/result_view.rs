use std::sync::Arc;

use rogaine_core::model::{Achievement, GameProgress, StationId};
use rogaine_core::transit;
use rogaine_core::view::View;
use storage::repository::GameRepository;

use crate::reference_data::{ReferenceData, ReferenceDataService};

/// Everything the result screen shows for a finished game.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub score: i64,
    pub penalty_display: String,
    pub time_penalty: i64,
    pub checkpoint_penalty: i64,
    pub missing_checkpoints: usize,
    pub checkpoint_total: usize,
    /// Every visit in order, repeats included.
    pub visited_spot_names: Vec<String>,
    pub visited_spot_count: usize,
    /// Reached checkpoints in checkpoint order.
    pub reached_checkpoint_names: Vec<String>,
    pub station_event_count: usize,
    pub boarded_station_names: Vec<String>,
    pub alighted_station_names: Vec<String>,
    pub passed_station_names: Vec<String>,
    pub achievement_bonus: i64,
    pub achievements: Vec<Achievement>,
    pub progress: GameProgress,
    pub reference: ReferenceData,
}

#[derive(Debug, Clone)]
pub enum ResultOutcome {
    /// Nothing to show; go to this view instead.
    Redirect(View),
    Ready(Box<ResultView>),
}

#[derive(Clone)]
pub struct ResultService {
    games: Arc<dyn GameRepository>,
    reference: ReferenceDataService,
}

impl ResultService {
    #[must_use]
    pub fn new(games: Arc<dyn GameRepository>, reference: ReferenceDataService) -> Self {
        Self { games, reference }
    }

    /// Build the result view, or redirect home when there is no completed game.
    pub async fn load(&self) -> ResultOutcome {
        let progress = match self.games.load_game().await {
            Ok(Some(progress)) => progress,
            Ok(None) => return ResultOutcome::Redirect(View::Home),
            Err(err) => {
                log::warn!("game record unreadable, leaving result view: {err}");
                return ResultOutcome::Redirect(View::Home);
            }
        };
        if !progress.is_completed() {
            return ResultOutcome::Redirect(View::Home);
        }
        let reference = self.reference.load_or_unavailable().await;
        match build_view(progress, reference) {
            Some(view) => ResultOutcome::Ready(Box::new(view)),
            None => ResultOutcome::Redirect(View::Home),
        }
    }
}

fn build_view(progress: GameProgress, reference: ReferenceData) -> Option<ResultView> {
    let breakdown = progress.breakdown().ok()?;
    if !progress.stored_score_matches() {
        log::warn!(
            "stored score {} / penalty {} disagree with recomputed {} / {}",
            progress.score(),
            progress.penalty(),
            breakdown.score,
            breakdown.total_penalty
        );
    }

    let visits = transit::reconstruct(progress.visited_station_events(), reference.station_index());
    let station_names = |ids: &[StationId]| -> Vec<String> {
        ids.iter().map(|id| reference.station_name(id)).collect()
    };
    let boarded_station_names = station_names(&visits.boarded);
    let alighted_station_names = station_names(&visits.alighted);
    let passed_station_names = station_names(&visits.passed);
    let visited_spot_names: Vec<String> = progress
        .visited_spot_ids()
        .iter()
        .map(|id| reference.spot_name(id))
        .collect();
    let reached_checkpoint_names: Vec<String> = progress
        .cp_spot_ids()
        .iter()
        .filter(|id| progress.has_reached(id))
        .map(|id| reference.spot_name(id))
        .collect();

    Some(ResultView {
        score: breakdown.score,
        penalty_display: breakdown.penalty_display(),
        time_penalty: breakdown.time_penalty,
        checkpoint_penalty: breakdown.checkpoint_penalty,
        missing_checkpoints: breakdown.missing_checkpoints,
        checkpoint_total: progress.cp_spot_ids().len(),
        visited_spot_count: progress.visited_spot_ids().len(),
        visited_spot_names,
        reached_checkpoint_names,
        station_event_count: progress.visited_station_events().len(),
        boarded_station_names,
        alighted_station_names,
        passed_station_names,
        achievement_bonus: breakdown.achievement_bonus,
        achievements: progress.achievement_unlocked().to_vec(),
        progress,
        reference,
    })
}
