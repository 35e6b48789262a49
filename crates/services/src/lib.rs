#![forbid(unsafe_code)]

pub mod app_services;
pub mod connectivity;
pub mod consent_service;
pub mod error;
pub mod game_service;
pub mod map;
pub mod navigation;
pub mod reference_data;
pub mod result_view;
pub mod submission;

pub use rogaine_core::Clock;

pub use app_services::AppServices;
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use consent_service::ConsentService;
pub use error::{AppServicesError, ConsentServiceError, GameServiceError, MapError, SendError};
pub use game_service::GameService;
pub use map::MapResourceManager;
pub use navigation::{LeaveHandler, LeaveHookRegistration, NavigationHooks};
pub use reference_data::{ReferenceData, ReferenceDataService};
pub use result_view::{ResultOutcome, ResultService, ResultView};
pub use submission::{
    ResultLeaveHandler, SubmissionConfig, SubmissionCoordinator, SubmissionDecision,
    SubmissionOutcome,
};
