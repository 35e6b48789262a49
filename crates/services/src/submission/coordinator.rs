use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rogaine_core::model::GameProgress;
use storage::repository::PreferenceRepository;

use super::payload::build_payload_v1;
use super::sender::ResultSender;
use crate::connectivity::Connectivity;
use crate::reference_data::ReferenceData;

pub const DECISION_KEY_PREFIX: &str = "rogaine:result-submission:decision:v1:";

/// Preference key holding the decision for the game started at `started_at_ms`.
#[must_use]
pub fn decision_key(started_at_ms: i64) -> String {
    format!("{DECISION_KEY_PREFIX}{started_at_ms}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionDecision {
    Undecided,
    Sent,
    Skip,
}

impl SubmissionDecision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionDecision::Undecided => "undecided",
            SubmissionDecision::Sent => "sent",
            SubmissionDecision::Skip => "skip",
        }
    }

    /// Anything other than a terminal value reads as undecided.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "sent" => SubmissionDecision::Sent,
            "skip" => SubmissionDecision::Skip,
            _ => SubmissionDecision::Undecided,
        }
    }

    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, SubmissionDecision::Undecided)
    }
}

impl fmt::Display for SubmissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a submission attempt did. Diagnostic only; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Submission is switched off or has no endpoint.
    Disabled,
    /// The game is unfinished or was abandoned.
    NotEligible,
    AlreadyDecided(SubmissionDecision),
    /// The player opted out; recorded as `Skip`.
    Skipped,
    Offline,
    /// Another send is running.
    InFlight,
    Sent,
    /// The send failed; the decision stays undecided.
    Failed,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends each finished game's result at most once.
pub struct SubmissionCoordinator {
    sender: Option<Arc<dyn ResultSender>>,
    token: Option<String>,
    preferences: Arc<dyn PreferenceRepository>,
    connectivity: Arc<dyn Connectivity>,
    decided: Mutex<HashMap<i64, SubmissionDecision>>,
    in_flight: AtomicBool,
}

impl SubmissionCoordinator {
    /// `sender` is `None` when submission is disabled.
    #[must_use]
    pub fn new(
        sender: Option<Arc<dyn ResultSender>>,
        token: Option<String>,
        preferences: Arc<dyn PreferenceRepository>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            sender,
            token,
            preferences,
            connectivity,
            decided: Mutex::new(HashMap::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.sender.is_some()
    }

    fn cached(&self, started_at_ms: i64) -> Option<SubmissionDecision> {
        self.decided
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&started_at_ms)
            .copied()
    }

    /// Current decision for a game, from memory or the preference store.
    ///
    /// A storage failure reads as `Undecided`.
    pub async fn decision(&self, started_at_ms: i64) -> SubmissionDecision {
        if let Some(decision) = self.cached(started_at_ms) {
            return decision;
        }
        match self.preferences.get_preference(&decision_key(started_at_ms)).await {
            Ok(Some(raw)) => {
                let decision = SubmissionDecision::parse(&raw);
                if decision.is_final() {
                    self.remember(started_at_ms, decision);
                }
                decision
            }
            Ok(None) => SubmissionDecision::Undecided,
            Err(err) => {
                log::warn!("could not read submission decision: {err}");
                SubmissionDecision::Undecided
            }
        }
    }

    fn remember(&self, started_at_ms: i64, decision: SubmissionDecision) {
        self.decided
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(started_at_ms, decision);
    }

    /// Record a terminal decision unless one is already held; returns the
    /// decision that stands.
    async fn finalize(
        &self,
        started_at_ms: i64,
        decision: SubmissionDecision,
    ) -> SubmissionDecision {
        {
            let mut decided = self.decided.lock().unwrap_or_else(PoisonError::into_inner);
            let existing = decided.get(&started_at_ms).copied();
            if let Some(existing) = existing.filter(|d| d.is_final()) {
                return existing;
            }
            decided.insert(started_at_ms, decision);
        }
        if let Err(err) = self
            .preferences
            .put_preference(&decision_key(started_at_ms), decision.as_str())
            .await
        {
            log::warn!("could not persist submission decision {decision}: {err}");
        }
        decision
    }

    /// Offer a finished game for submission once.
    ///
    /// `opted_in` is the player's share checkbox at the moment of leaving.
    /// While a send is running every other attempt, opt-outs included,
    /// returns `InFlight`.
    pub async fn try_submit_once(
        &self,
        progress: &GameProgress,
        reference: &ReferenceData,
        opted_in: bool,
    ) -> SubmissionOutcome {
        let Some(sender) = self.sender.as_ref() else {
            return SubmissionOutcome::Disabled;
        };
        if !progress.is_completed() {
            return SubmissionOutcome::NotEligible;
        }
        let started_at_ms = progress.started_at_ms();
        let decision = self.decision(started_at_ms).await;
        if decision.is_final() {
            return SubmissionOutcome::AlreadyDecided(decision);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SubmissionOutcome::InFlight;
        }
        let _guard = InFlightGuard(&self.in_flight);

        // A send that finished while we waited on the store has already decided.
        if let Some(decision) = self.cached(started_at_ms) {
            return SubmissionOutcome::AlreadyDecided(decision);
        }

        if !opted_in {
            return match self.finalize(started_at_ms, SubmissionDecision::Skip).await {
                SubmissionDecision::Skip => {
                    log::info!("result submission skipped by player");
                    SubmissionOutcome::Skipped
                }
                other => SubmissionOutcome::AlreadyDecided(other),
            };
        }
        if !self.connectivity.is_online() {
            log::debug!("offline, result submission deferred");
            return SubmissionOutcome::Offline;
        }

        let payload = match build_payload_v1(progress, reference, self.token.clone(), true) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("result payload could not be built: {err}");
                return SubmissionOutcome::Failed;
            }
        };

        match sender.send(&payload).await {
            Ok(()) => match self.finalize(started_at_ms, SubmissionDecision::Sent).await {
                SubmissionDecision::Sent => {
                    log::info!("result submitted for game {started_at_ms}");
                    SubmissionOutcome::Sent
                }
                other => {
                    log::warn!("result sent but game {started_at_ms} was already {other}");
                    SubmissionOutcome::AlreadyDecided(other)
                }
            },
            Err(err) => {
                log::warn!("result submission failed, will retry on next leave: {err}");
                SubmissionOutcome::Failed
            }
        }
    }
}
