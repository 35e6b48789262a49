mod ids;
mod progress;
mod reference;

pub use ids::{AchievementId, ParseIdError, SpotId, StationId};
pub use progress::{
    Achievement, EndReason, GameConfig, GameError, GameProgress, GameProgressDraft,
    StationEvent, StationEventKind,
};
pub use reference::{Spot, Station};
