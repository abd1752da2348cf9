//! Repository for the `readings` table (append-only time-series).

use ddms_core::device::Reading;
use ddms_core::types::DbId;
use sqlx::PgPool;

use crate::models::reading::ReadingRow;

/// Provides insert and latest-value queries for readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Append a single reading.
    pub async fn insert(pool: &PgPool, reading: &Reading) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO readings (timestamp, device_id, value) VALUES ($1, $2, $3)")
            .bind(reading.timestamp)
            .bind(reading.device_id)
            .bind(reading.value)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// The most recent reading for a device, if any.
    pub async fn latest_for_device(
        pool: &PgPool,
        device_id: DbId,
    ) -> Result<Option<ReadingRow>, sqlx::Error> {
        sqlx::query_as::<_, ReadingRow>(
            "SELECT device_id, timestamp, value FROM readings \
             WHERE device_id = $1 \
             ORDER BY timestamp DESC \
             LIMIT 1",
        )
        .bind(device_id)
        .fetch_optional(pool)
        .await
    }
}
