use async_trait::async_trait;
use rogaine_core::model::Spot;

use super::SqliteRepository;
use super::mapping::{conn, judge_flag_to_i64, map_spot_row};
use crate::repository::{SpotRepository, StorageError};

#[async_trait]
impl SpotRepository for SqliteRepository {
    async fn replace_spots(&self, spots: &[Spot]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM spot_master")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for spot in spots {
            sqlx::query(
                r"
                    INSERT INTO spot_master (id, name, judge_target)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        judge_target = excluded.judge_target
                ",
            )
            .bind(spot.id.as_str())
            .bind(&spot.name)
            .bind(judge_flag_to_i64(spot.judge_target))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        log::info!("replaced spot reference data ({} spots)", spots.len());
        Ok(())
    }

    async fn list_spots(&self) -> Result<Vec<Spot>, StorageError> {
        let rows = sqlx::query("SELECT id, name, judge_target FROM spot_master ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_spot_row).collect()
    }

    async fn list_judge_targets(&self) -> Result<Vec<Spot>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, judge_target
                FROM spot_master
                WHERE judge_target = 1
                ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_spot_row).collect()
    }
}
