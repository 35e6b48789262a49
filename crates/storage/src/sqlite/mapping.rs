use rogaine_core::model::{Spot, SpotId, Station, StationId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn judge_flag_to_i64(flag: bool) -> i64 {
    i64::from(flag)
}

pub(crate) fn judge_flag_from_i64(value: i64) -> Result<bool, StorageError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::Serialization(format!(
            "invalid judge_target: {other}"
        ))),
    }
}

pub(crate) fn map_spot_row(row: &sqlx::sqlite::SqliteRow) -> Result<Spot, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let judge = judge_flag_from_i64(row.try_get::<i64, _>("judge_target").map_err(ser)?)?;
    Ok(Spot::new(SpotId::new(id), name, judge))
}

pub(crate) fn map_station_row(row: &sqlx::sqlite::SqliteRow) -> Result<Station, StorageError> {
    let station_id: String = row.try_get("station_id").map_err(ser)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let order_index: i64 = row.try_get("order_index").map_err(ser)?;
    let order_index = i32::try_from(order_index).map_err(|_| {
        StorageError::Serialization(format!("invalid order_index: {order_index}"))
    })?;
    Ok(Station::new(StationId::new(station_id), name, order_index))
}
