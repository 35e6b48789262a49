use std::collections::HashMap;
use std::sync::Arc;

use rogaine_core::model::{Spot, SpotId, Station, StationId};
use rogaine_core::transit::StationIndex;
use storage::repository::{SpotRepository, StationRepository, StorageError};

/// Spot and station tables for one game, with name lookups.
///
/// Lookups fall back to the raw identifier, so a missing or stale record
/// degrades the display instead of failing it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    spots: Vec<Spot>,
    stations: Vec<Station>,
    spot_names: HashMap<SpotId, String>,
    station_names: HashMap<StationId, String>,
    station_index: StationIndex,
    available: bool,
}

impl ReferenceData {
    #[must_use]
    pub fn new(spots: Vec<Spot>, stations: Vec<Station>) -> Self {
        let spot_names = spots.iter().map(|s| (s.id.clone(), s.name.clone())).collect();
        let station_names = stations
            .iter()
            .map(|s| (s.station_id.clone(), s.name.clone()))
            .collect();
        let station_index = StationIndex::new(&stations);
        Self {
            spots,
            stations,
            spot_names,
            station_names,
            station_index,
            available: true,
        }
    }

    /// Placeholder used when the tables could not be loaded.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    #[must_use]
    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    #[must_use]
    pub fn station_index(&self) -> &StationIndex {
        &self.station_index
    }

    #[must_use]
    pub fn spot_name(&self, id: &SpotId) -> String {
        self.spot_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    #[must_use]
    pub fn station_name(&self, id: &StationId) -> String {
        self.station_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

/// Loads and replaces reference data.
#[derive(Clone)]
pub struct ReferenceDataService {
    spots: Arc<dyn SpotRepository>,
    stations: Arc<dyn StationRepository>,
}

impl ReferenceDataService {
    #[must_use]
    pub fn new(spots: Arc<dyn SpotRepository>, stations: Arc<dyn StationRepository>) -> Self {
        Self { spots, stations }
    }

    /// Load both tables.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either table cannot be read.
    pub async fn load(&self) -> Result<ReferenceData, StorageError> {
        let spots = self.spots.list_spots().await?;
        let stations = self.stations.list_stations_by_order().await?;
        Ok(ReferenceData::new(spots, stations))
    }

    /// Load both tables, or an empty placeholder if storage fails.
    pub async fn load_or_unavailable(&self) -> ReferenceData {
        match self.load().await {
            Ok(data) => data,
            Err(err) => {
                log::warn!("reference data unavailable, showing raw ids: {err}");
                ReferenceData::unavailable()
            }
        }
    }

    /// Replace both tables; entry point for external import tooling.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either table cannot be written.
    pub async fn replace(&self, spots: &[Spot], stations: &[Station]) -> Result<(), StorageError> {
        self.spots.replace_spots(spots).await?;
        self.stations.replace_stations(stations).await?;
        Ok(())
    }
}
