//! Repository for the `devices` table.

use ddms_core::device::DeviceStatus;
use ddms_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::device::{status_label, DeviceRow};

/// Column list for `devices` queries.
const COLUMNS: &str = "\
    id, name, modbus_ip, modbus_port, modbus_slave_id, \
    modbus_register, modbus_register_count, unit, sampling_interval, \
    threshold_warning_lower, threshold_warning_upper, \
    threshold_critical_lower, threshold_critical_upper, \
    retention_days, status::text AS status, last_reading_at";

/// Provides the device queries the poller needs.
pub struct DeviceRepo;

impl DeviceRepo {
    /// List every device ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<DeviceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices ORDER BY name ASC");
        sqlx::query_as::<_, DeviceRow>(&query).fetch_all(pool).await
    }

    /// Find a device by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DeviceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE id = $1");
        sqlx::query_as::<_, DeviceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update the connection status and, when given, the last-reading
    /// timestamp. Returns `true` if a row was updated.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: DeviceStatus,
        last_reading_at: Option<Timestamp>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE devices \
             SET status = $2::devicestatus, \
                 last_reading_at = COALESCE($3, last_reading_at), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status_label(status))
        .bind(last_reading_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
