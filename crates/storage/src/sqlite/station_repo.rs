use async_trait::async_trait;
use rogaine_core::model::Station;

use super::SqliteRepository;
use super::mapping::{conn, map_station_row};
use crate::repository::{StationRepository, StorageError};

#[async_trait]
impl StationRepository for SqliteRepository {
    async fn replace_stations(&self, stations: &[Station]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM station_master")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for station in stations {
            let result = sqlx::query(
                r"
                    INSERT INTO station_master (station_id, name, order_index)
                    VALUES (?1, ?2, ?3)
                ",
            )
            .bind(station.station_id.as_str())
            .bind(&station.name)
            .bind(i64::from(station.order_index))
            .execute(&mut *tx)
            .await;

            if let Err(err) = result {
                // Duplicate ids or order indexes break the line order.
                if err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    return Err(StorageError::Conflict);
                }
                return Err(conn(err));
            }
        }

        tx.commit().await.map_err(conn)?;
        log::info!("replaced station reference data ({} stations)", stations.len());
        Ok(())
    }

    async fn list_stations_by_order(&self) -> Result<Vec<Station>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT station_id, name, order_index
                FROM station_master
                ORDER BY order_index
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_station_row).collect()
    }
}
