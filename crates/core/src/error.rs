use thiserror::Error;

use crate::model::{GameError, ParseIdError};
use crate::view::UnknownViewError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    View(#[from] UnknownViewError),
}
