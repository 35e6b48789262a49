use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rogaine_core::model::{EndReason, GameConfig, GameProgress, Spot, SpotId};
use rogaine_core::time::fixed_now_ms;
use rogaine_core::view::View;
use services::submission::{
    ResultLeaveHandler, ResultPayloadV1, ResultSender, SubmissionCoordinator, SubmissionDecision,
    SubmissionOutcome, decision_key,
};
use services::{ConnectivityFlag, NavigationHooks, ReferenceData, SendError};
use storage::repository::{InMemoryRepository, PreferenceRepository};
use tokio::sync::Notify;

#[derive(Default)]
struct FakeSender {
    calls: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl ResultSender for FakeSender {
    async fn send(&self, _payload: &ResultPayloadV1) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }
}

/// Holds every send until released.
#[derive(Default)]
struct GatedSender {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ResultSender for GatedSender {
    async fn send(&self, _payload: &ResultPayloadV1) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

fn gated() -> (InMemoryRepository, Arc<GatedSender>, Arc<SubmissionCoordinator>) {
    let repo = InMemoryRepository::new();
    let sender = Arc::new(GatedSender::default());
    let coordinator = Arc::new(SubmissionCoordinator::new(
        Some(sender.clone() as Arc<dyn ResultSender>),
        None,
        Arc::new(repo.clone()),
        Arc::new(ConnectivityFlag::new(true)),
    ));
    (repo, sender, coordinator)
}

struct Fixture {
    repo: InMemoryRepository,
    sender: Arc<FakeSender>,
    online: Arc<ConnectivityFlag>,
    coordinator: Arc<SubmissionCoordinator>,
}

fn fixture() -> Fixture {
    let repo = InMemoryRepository::new();
    let sender = Arc::new(FakeSender::default());
    let online = Arc::new(ConnectivityFlag::new(true));
    let coordinator = Arc::new(SubmissionCoordinator::new(
        Some(sender.clone() as Arc<dyn ResultSender>),
        None,
        Arc::new(repo.clone()),
        online.clone(),
    ));
    Fixture {
        repo,
        sender,
        online,
        coordinator,
    }
}

fn completed_game() -> GameProgress {
    let start = fixed_now_ms();
    let mut game = GameProgress::new(start, GameConfig::new(60).unwrap(), vec![SpotId::new("S1")]);
    game.visit_spot(SpotId::new("S1")).unwrap();
    game.finish(start + 55 * 60_000, EndReason::Completed).unwrap();
    game
}

fn reference() -> ReferenceData {
    ReferenceData::new(vec![Spot::new(SpotId::new("S1"), "Lighthouse", true)], Vec::new())
}

#[tokio::test]
async fn leaving_twice_after_success_sends_once() {
    let fx = fixture();
    let hooks = NavigationHooks::new(Duration::from_secs(5));
    let handler = Arc::new(
        ResultLeaveHandler::new(fx.coordinator.clone(), completed_game(), reference()).await,
    );
    assert!(handler.opted_in());
    let _registration = hooks.register(View::Result, handler.clone());

    assert_eq!(hooks.navigate(View::Result, View::Home).await, View::Home);
    assert_eq!(hooks.navigate(View::Result, View::Rules).await, View::Rules);

    assert_eq!(fx.sender.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.repo
            .get_preference(&decision_key(fixed_now_ms()))
            .await
            .unwrap()
            .as_deref(),
        Some("sent")
    );
    assert_eq!(
        handler.submit().await,
        SubmissionOutcome::AlreadyDecided(SubmissionDecision::Sent)
    );
}

#[tokio::test]
async fn opting_out_skips_without_network() {
    let fx = fixture();
    let handler =
        ResultLeaveHandler::new(fx.coordinator.clone(), completed_game(), reference()).await;
    handler.set_opted_in(false);

    assert_eq!(handler.submit().await, SubmissionOutcome::Skipped);
    handler.set_opted_in(true);
    assert_eq!(
        handler.submit().await,
        SubmissionOutcome::AlreadyDecided(SubmissionDecision::Skip)
    );
    assert_eq!(fx.sender.calls.load(Ordering::SeqCst), 0);

    // A later visit to the result view starts unchecked.
    let reopened =
        ResultLeaveHandler::new(fx.coordinator.clone(), completed_game(), reference()).await;
    assert!(!reopened.opted_in());
}

#[tokio::test]
async fn failure_stays_undecided_and_retry_succeeds() {
    let fx = fixture();
    let game = completed_game();
    fx.sender.failing.store(true, Ordering::SeqCst);

    let outcome = fx.coordinator.try_submit_once(&game, &reference(), true).await;
    assert_eq!(outcome, SubmissionOutcome::Failed);
    assert_eq!(
        fx.coordinator.decision(game.started_at_ms()).await,
        SubmissionDecision::Undecided
    );

    fx.sender.failing.store(false, Ordering::SeqCst);
    let outcome = fx.coordinator.try_submit_once(&game, &reference(), true).await;
    assert_eq!(outcome, SubmissionOutcome::Sent);
    assert_eq!(fx.sender.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn offline_defers_without_deciding() {
    let fx = fixture();
    let game = completed_game();
    fx.online.set_online(false);

    let outcome = fx.coordinator.try_submit_once(&game, &reference(), true).await;
    assert_eq!(outcome, SubmissionOutcome::Offline);
    assert_eq!(fx.sender.calls.load(Ordering::SeqCst), 0);

    fx.online.set_online(true);
    let outcome = fx.coordinator.try_submit_once(&game, &reference(), true).await;
    assert_eq!(outcome, SubmissionOutcome::Sent);
}

#[tokio::test]
async fn abandoned_and_unfinished_games_are_not_eligible() {
    let fx = fixture();
    let start = fixed_now_ms();

    let running = GameProgress::new(start, GameConfig::new(60).unwrap(), Vec::new());
    let mut abandoned = running.clone();
    abandoned.finish(start + 1_000, EndReason::Abandoned).unwrap();

    for game in [&running, &abandoned] {
        let outcome = fx.coordinator.try_submit_once(game, &reference(), true).await;
        assert_eq!(outcome, SubmissionOutcome::NotEligible);
    }
    assert_eq!(fx.sender.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disabled_coordinator_is_inert() {
    let repo = InMemoryRepository::new();
    let coordinator = SubmissionCoordinator::new(
        None,
        None,
        Arc::new(repo.clone()),
        Arc::new(ConnectivityFlag::default()),
    );
    let game = completed_game();

    assert!(!coordinator.enabled());
    assert_eq!(
        coordinator.try_submit_once(&game, &reference(), false).await,
        SubmissionOutcome::Disabled
    );
    assert_eq!(
        repo.get_preference(&decision_key(game.started_at_ms()))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn overlapping_sends_reach_the_network_once() {
    let (_repo, sender, coordinator) = gated();
    let game = completed_game();

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        let game = game.clone();
        async move { coordinator.try_submit_once(&game, &reference(), true).await }
    });
    sender.entered.notified().await;

    let second = coordinator.try_submit_once(&game, &reference(), true).await;
    assert_eq!(second, SubmissionOutcome::InFlight);

    sender.release.notify_one();
    assert_eq!(first.await.unwrap(), SubmissionOutcome::Sent);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        coordinator.decision(game.started_at_ms()).await,
        SubmissionDecision::Sent
    );
}

#[tokio::test]
async fn opting_out_while_sending_cannot_flip_the_decision() {
    let (repo, sender, coordinator) = gated();
    let game = completed_game();

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        let game = game.clone();
        async move { coordinator.try_submit_once(&game, &reference(), true).await }
    });
    sender.entered.notified().await;

    let opt_out = coordinator.try_submit_once(&game, &reference(), false).await;
    assert_eq!(opt_out, SubmissionOutcome::InFlight);
    assert_eq!(
        repo.get_preference(&decision_key(game.started_at_ms()))
            .await
            .unwrap(),
        None
    );

    sender.release.notify_one();
    assert_eq!(first.await.unwrap(), SubmissionOutcome::Sent);
    assert_eq!(
        coordinator.decision(game.started_at_ms()).await,
        SubmissionDecision::Sent
    );
    assert_eq!(
        coordinator.try_submit_once(&game, &reference(), false).await,
        SubmissionOutcome::AlreadyDecided(SubmissionDecision::Sent)
    );
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
}
