use serde::{Deserialize, Serialize};

use crate::model::ids::{SpotId, StationId};

/// A waypoint on the course.
///
/// `judge_target` marks spots that may be picked as checkpoints for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub name: String,
    pub judge_target: bool,
}

impl Spot {
    #[must_use]
    pub fn new(id: SpotId, name: impl Into<String>, judge_target: bool) -> Self {
        Self {
            id,
            name: name.into(),
            judge_target,
        }
    }
}

/// A station on the rail line. `order_index` gives its position along the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: StationId,
    pub name: String,
    pub order_index: i32,
}

impl Station {
    #[must_use]
    pub fn new(station_id: StationId, name: impl Into<String>, order_index: i32) -> Self {
        Self {
            station_id,
            name: name.into(),
            order_index,
        }
    }
}
