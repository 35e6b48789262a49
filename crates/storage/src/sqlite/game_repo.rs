use async_trait::async_trait;
use chrono::Utc;
use rogaine_core::model::GameProgress;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{CURRENT_GAME_SLOT, GameRecord, GameRepository, StorageError};

#[async_trait]
impl GameRepository for SqliteRepository {
    async fn save_game(&self, game: &GameProgress) -> Result<(), StorageError> {
        let record = GameRecord::from_game(game)?;
        sqlx::query(
            r"
                INSERT INTO game_state (slot, body, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(slot) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(&record.slot)
        .bind(&record.body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn load_game(&self) -> Result<Option<GameProgress>, StorageError> {
        let row = sqlx::query("SELECT slot, body FROM game_state WHERE slot = ?1")
            .bind(CURRENT_GAME_SLOT)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let record = GameRecord {
            slot: row.try_get("slot").map_err(ser)?,
            body: row.try_get("body").map_err(ser)?,
        };
        record.into_game().map(Some)
    }

    async fn clear_game(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM game_state WHERE slot = ?1")
            .bind(CURRENT_GAME_SLOT)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
