use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;

use crate::Clock;
use crate::connectivity::{Connectivity, ConnectivityFlag};
use crate::consent_service::ConsentService;
use crate::error::AppServicesError;
use crate::game_service::GameService;
use crate::navigation::NavigationHooks;
use crate::reference_data::ReferenceDataService;
use crate::result_view::ResultService;
use crate::submission::{HttpResultSender, ResultSender, SubmissionConfig, SubmissionCoordinator};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    games: Arc<GameService>,
    reference: Arc<ReferenceDataService>,
    results: Arc<ResultService>,
    consent: Arc<ConsentService>,
    submission: Arc<SubmissionCoordinator>,
    navigation: Arc<NavigationHooks>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(
            storage,
            clock,
            SubmissionConfig::from_env(),
            Arc::new(ConnectivityFlag::from_env()),
            crate::submission::timeout_from_env(),
        )
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Send` if the HTTP client cannot be built.
    pub fn new(
        storage: Storage,
        clock: Clock,
        submission: Option<SubmissionConfig>,
        connectivity: Arc<dyn Connectivity>,
        leave_budget: Duration,
    ) -> Result<Self, AppServicesError> {
        let sender = match &submission {
            Some(config) => {
                log::info!("result submission enabled for {}", config.endpoint_url);
                Some(Arc::new(HttpResultSender::new(config)?) as Arc<dyn ResultSender>)
            }
            None => {
                log::debug!("result submission disabled");
                None
            }
        };
        Ok(Self::with_sender(
            storage,
            clock,
            sender,
            submission.and_then(|c| c.token),
            connectivity,
            leave_budget,
        ))
    }

    /// Wire services around an explicit sender; `None` disables submission.
    #[must_use]
    pub fn with_sender(
        storage: Storage,
        clock: Clock,
        sender: Option<Arc<dyn ResultSender>>,
        token: Option<String>,
        connectivity: Arc<dyn Connectivity>,
        leave_budget: Duration,
    ) -> Self {
        let reference = ReferenceDataService::new(
            Arc::clone(&storage.spots),
            Arc::clone(&storage.stations),
        );
        let games = Arc::new(GameService::new(
            clock.clone(),
            Arc::clone(&storage.games),
            Arc::clone(&storage.spots),
        ));
        let results = Arc::new(ResultService::new(
            Arc::clone(&storage.games),
            reference.clone(),
        ));
        let consent = Arc::new(ConsentService::new(clock, Arc::clone(&storage.preferences)));
        let submission = Arc::new(SubmissionCoordinator::new(
            sender,
            token,
            Arc::clone(&storage.preferences),
            connectivity,
        ));

        Self {
            games,
            reference: Arc::new(reference),
            results,
            consent,
            submission,
            navigation: Arc::new(NavigationHooks::new(leave_budget)),
        }
    }

    #[must_use]
    pub fn games(&self) -> Arc<GameService> {
        Arc::clone(&self.games)
    }

    #[must_use]
    pub fn reference(&self) -> Arc<ReferenceDataService> {
        Arc::clone(&self.reference)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn consent(&self) -> Arc<ConsentService> {
        Arc::clone(&self.consent)
    }

    #[must_use]
    pub fn submission(&self) -> Arc<SubmissionCoordinator> {
        Arc::clone(&self.submission)
    }

    #[must_use]
    pub fn navigation(&self) -> Arc<NavigationHooks> {
        Arc::clone(&self.navigation)
    }
}
