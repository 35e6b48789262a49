use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rogaine_core::model::GameProgress;
use rogaine_core::view::View;

use super::coordinator::{SubmissionCoordinator, SubmissionDecision, SubmissionOutcome};
use crate::navigation::LeaveHandler;
use crate::reference_data::ReferenceData;

/// Runs the submission coordinator when the player leaves the result view.
pub struct ResultLeaveHandler {
    coordinator: Arc<SubmissionCoordinator>,
    progress: GameProgress,
    reference: ReferenceData,
    opted_in: AtomicBool,
}

impl ResultLeaveHandler {
    /// The share checkbox starts checked unless the game was already skipped.
    pub async fn new(
        coordinator: Arc<SubmissionCoordinator>,
        progress: GameProgress,
        reference: ReferenceData,
    ) -> Self {
        let decision = coordinator.decision(progress.started_at_ms()).await;
        Self {
            coordinator,
            progress,
            reference,
            opted_in: AtomicBool::new(decision != SubmissionDecision::Skip),
        }
    }

    #[must_use]
    pub fn opted_in(&self) -> bool {
        self.opted_in.load(Ordering::Acquire)
    }

    pub fn set_opted_in(&self, opted_in: bool) {
        self.opted_in.store(opted_in, Ordering::Release);
    }

    /// Submit now, as leaving would.
    pub async fn submit(&self) -> SubmissionOutcome {
        self.coordinator
            .try_submit_once(&self.progress, &self.reference, self.opted_in())
            .await
    }
}

#[async_trait]
impl LeaveHandler for ResultLeaveHandler {
    async fn on_leave(&self, to: View) {
        let outcome = self.submit().await;
        log::debug!("left result view for {to}: {outcome:?}");
    }
}
