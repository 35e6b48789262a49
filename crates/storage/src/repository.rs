use async_trait::async_trait;
use rogaine_core::model::{GameProgress, GameProgressDraft, Spot, Station};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key of the single current-game slot.
pub const CURRENT_GAME_SLOT: &str = "current";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of the current game.
///
/// Stored as one JSON document so list-valued fields (visits, station log,
/// achievements) keep their order without extra tables.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub slot: String,
    pub body: String,
}

impl GameRecord {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the game cannot be encoded.
    pub fn from_game(game: &GameProgress) -> Result<Self, StorageError> {
        let body = serde_json::to_string(&game.to_draft())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            slot: CURRENT_GAME_SLOT.to_owned(),
            body,
        })
    }

    /// Convert the record back into a domain `GameProgress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the JSON is malformed or the
    /// decoded game breaks a record invariant.
    pub fn into_game(self) -> Result<GameProgress, StorageError> {
        let draft: GameProgressDraft = serde_json::from_str(&self.body)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        GameProgress::from_persisted(draft).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Spot reference data.
#[async_trait]
pub trait SpotRepository: Send + Sync {
    /// Replace the whole spot list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the spots cannot be stored.
    async fn replace_spots(&self, spots: &[Spot]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_spots(&self) -> Result<Vec<Spot>, StorageError>;

    /// Spots flagged as checkpoint candidates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_judge_targets(&self) -> Result<Vec<Spot>, StorageError>;
}

/// Station reference data.
#[async_trait]
pub trait StationRepository: Send + Sync {
    /// Replace the whole station list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stations cannot be stored.
    async fn replace_stations(&self, stations: &[Station]) -> Result<(), StorageError>;

    /// Stations sorted by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_stations_by_order(&self) -> Result<Vec<Station>, StorageError>;
}

/// The single current-game slot.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Write the game into the slot, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the game cannot be stored.
    async fn save_game(&self, game: &GameProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn load_game(&self) -> Result<Option<GameProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be cleared.
    async fn clear_game(&self) -> Result<(), StorageError>;
}

/// Small string key/value store for flags and per-game decisions.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_preference(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn put_preference(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete_preference(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    spots: Arc<Mutex<Vec<Spot>>>,
    stations: Arc<Mutex<Vec<Station>>>,
    games: Arc<Mutex<HashMap<String, GameRecord>>>,
    preferences: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SpotRepository for InMemoryRepository {
    async fn replace_spots(&self, spots: &[Spot]) -> Result<(), StorageError> {
        let mut guard = self.spots.lock().map_err(poisoned)?;
        *guard = spots.to_vec();
        Ok(())
    }

    async fn list_spots(&self) -> Result<Vec<Spot>, StorageError> {
        let guard = self.spots.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn list_judge_targets(&self) -> Result<Vec<Spot>, StorageError> {
        let guard = self.spots.lock().map_err(poisoned)?;
        Ok(guard.iter().filter(|s| s.judge_target).cloned().collect())
    }
}

#[async_trait]
impl StationRepository for InMemoryRepository {
    async fn replace_stations(&self, stations: &[Station]) -> Result<(), StorageError> {
        let mut guard = self.stations.lock().map_err(poisoned)?;
        *guard = stations.to_vec();
        Ok(())
    }

    async fn list_stations_by_order(&self) -> Result<Vec<Station>, StorageError> {
        let guard = self.stations.lock().map_err(poisoned)?;
        let mut sorted = guard.clone();
        sorted.sort_by_key(|s| s.order_index);
        Ok(sorted)
    }
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn save_game(&self, game: &GameProgress) -> Result<(), StorageError> {
        let record = GameRecord::from_game(game)?;
        let mut guard = self.games.lock().map_err(poisoned)?;
        guard.insert(record.slot.clone(), record);
        Ok(())
    }

    async fn load_game(&self) -> Result<Option<GameProgress>, StorageError> {
        let record = {
            let guard = self.games.lock().map_err(poisoned)?;
            guard.get(CURRENT_GAME_SLOT).cloned()
        };
        record.map(GameRecord::into_game).transpose()
    }

    async fn clear_game(&self) -> Result<(), StorageError> {
        let mut guard = self.games.lock().map_err(poisoned)?;
        guard.remove(CURRENT_GAME_SLOT);
        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryRepository {
    async fn get_preference(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.preferences.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn put_preference(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.preferences.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_preference(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.preferences.lock().map_err(poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub spots: Arc<dyn SpotRepository>,
    pub stations: Arc<dyn StationRepository>,
    pub games: Arc<dyn GameRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            spots: Arc::new(repo.clone()),
            stations: Arc::new(repo.clone()),
            games: Arc::new(repo.clone()),
            preferences: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rogaine_core::model::{
        EndReason, GameConfig, SpotId, StationEvent, StationId,
    };
    use rogaine_core::time::fixed_now_ms;

    fn game() -> GameProgress {
        let mut game = GameProgress::new(
            fixed_now_ms(),
            GameConfig::new(60).unwrap(),
            vec![SpotId::new("S1"), SpotId::new("S2")],
        );
        game.visit_spot(SpotId::new("S1")).unwrap();
        game.record_station_event(StationEvent::board(StationId::new("T1")))
            .unwrap();
        game
    }

    #[tokio::test]
    async fn game_slot_round_trips_and_overwrites() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_game().await.unwrap().is_none());

        let mut first = game();
        repo.save_game(&first).await.unwrap();
        assert_eq!(repo.load_game().await.unwrap(), Some(first.clone()));

        first
            .finish(fixed_now_ms() + 3_600_000, EndReason::Completed)
            .unwrap();
        repo.save_game(&first).await.unwrap();
        let loaded = repo.load_game().await.unwrap().unwrap();
        assert!(loaded.is_finished());
        assert_eq!(loaded.penalty(), 100);

        repo.clear_game().await.unwrap();
        assert!(repo.load_game().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn judge_targets_and_station_order() {
        let repo = InMemoryRepository::new();
        repo.replace_spots(&[
            Spot::new(SpotId::new("S1"), "Shrine", true),
            Spot::new(SpotId::new("S2"), "Cafe", false),
        ])
        .await
        .unwrap();
        repo.replace_stations(&[
            Station::new(StationId::new("T2"), "Second", 2),
            Station::new(StationId::new("T1"), "First", 1),
        ])
        .await
        .unwrap();

        let judges = repo.list_judge_targets().await.unwrap();
        assert_eq!(judges.len(), 1);
        assert_eq!(judges[0].id, SpotId::new("S1"));

        let ordered = repo.list_stations_by_order().await.unwrap();
        assert_eq!(ordered[0].station_id, StationId::new("T1"));
    }

    #[test]
    fn corrupt_game_record_is_a_serialization_error() {
        let record = GameRecord {
            slot: CURRENT_GAME_SLOT.into(),
            body: "{not json".into(),
        };
        assert!(matches!(
            record.into_game(),
            Err(StorageError::Serialization(_))
        ));
    }
}
