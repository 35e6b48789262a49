//! Shared error types for the services crate.

use thiserror::Error;

use rogaine_core::model::GameError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `GameService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameServiceError {
    #[error("no game in progress")]
    NoActiveGame,
    #[error("not enough checkpoint candidates: wanted {wanted}, found {available}")]
    NotEnoughCheckpoints { wanted: usize, available: usize },
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ConsentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConsentServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from a single result submission attempt. Never shown to the player.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    #[error("result submission returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors from the external map library.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
    #[error("map library failed to load: {0}")]
    Load(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Send(#[from] SendError),
}
