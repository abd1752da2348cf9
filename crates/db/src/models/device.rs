//! Device rows and their conversion into the poller's configuration view.

use ddms_core::device::{
    validate_port, validate_register_address, validate_register_count,
    validate_sampling_interval, validate_unit_id, Device, DeviceStatus, Thresholds,
    DEFAULT_MODBUS_PORT,
};
use ddms_core::error::CoreError;
use ddms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `devices` table.
///
/// `status` is selected as `status::text` because the column is a
/// PostgreSQL enum holding upper-case labels.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceRow {
    pub id: DbId,
    pub name: String,
    pub modbus_ip: String,
    /// `NULL` means the standard Modbus TCP port.
    pub modbus_port: Option<i32>,
    pub modbus_slave_id: i32,
    pub modbus_register: i32,
    pub modbus_register_count: i32,
    pub unit: String,
    pub sampling_interval: i32,
    pub threshold_warning_lower: Option<f64>,
    pub threshold_warning_upper: Option<f64>,
    pub threshold_critical_lower: Option<f64>,
    pub threshold_critical_upper: Option<f64>,
    pub retention_days: i32,
    pub status: String,
    pub last_reading_at: Option<Timestamp>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = CoreError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(Device {
            id: row.id,
            port: row
                .modbus_port
                .map_or(Ok(DEFAULT_MODBUS_PORT), |p| validate_port(p.into()))?,
            unit_id: validate_unit_id(row.modbus_slave_id.into())?,
            register_address: validate_register_address(row.modbus_register.into())?,
            register_count: validate_register_count(row.modbus_register_count.into())?,
            sampling_interval_secs: validate_sampling_interval(row.sampling_interval.into())?,
            thresholds: Thresholds {
                warn_lower: row.threshold_warning_lower,
                warn_upper: row.threshold_warning_upper,
                crit_lower: row.threshold_critical_lower,
                crit_upper: row.threshold_critical_upper,
            },
            retention_days: u32::try_from(row.retention_days).map_err(|_| {
                CoreError::Validation(format!(
                    "retention days must be positive, got {}",
                    row.retention_days
                ))
            })?,
            status: row.status.parse()?,
            name: row.name,
            host: row.modbus_ip,
            unit: row.unit,
            last_reading_at: row.last_reading_at,
        })
    }
}

/// Label of a [`DeviceStatus`] in the `devicestatus` enum type.
pub fn status_label(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Online => "ONLINE",
        DeviceStatus::Offline => "OFFLINE",
        DeviceStatus::Error => "ERROR",
    }
}
