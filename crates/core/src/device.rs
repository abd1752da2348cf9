//! Device configuration view and reading types.
//!
//! [`Device`] is the subset of a device record the poller needs. It is
//! re-read from the store on every polling iteration, so threshold and
//! interval edits take effect without a restart.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default Modbus TCP port.
pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// Highest register count a single read-holding-registers request may ask for.
pub const MAX_REGISTER_COUNT: u16 = 125;

/// Connection status persisted on the device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = CoreError;

    /// Case-insensitive, so both `online` and the store's `ONLINE` parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "error" => Ok(Self::Error),
            other => Err(CoreError::Validation(format!(
                "unknown device status '{other}'"
            ))),
        }
    }
}

/// Four independently optional threshold bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warn_lower: Option<f64>,
    pub warn_upper: Option<f64>,
    pub crit_lower: Option<f64>,
    pub crit_upper: Option<f64>,
}

/// A monitored endpoint as seen by the poller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: DbId,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Modbus unit (slave) identifier.
    pub unit_id: u8,
    pub register_address: u16,
    pub register_count: u16,
    /// Engineering unit label, e.g. `"°C"`.
    pub unit: String,
    pub sampling_interval_secs: u64,
    pub thresholds: Thresholds,
    pub retention_days: u32,
    pub status: DeviceStatus,
    pub last_reading_at: Option<Timestamp>,
}

impl Device {
    /// `host:port`, as shown in logs and alert messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval_secs)
    }
}

/// Validate the numeric fields of a raw configuration record.
///
/// The store keeps these as plain integers, so the range checks live
/// here rather than in the schema.
pub fn validate_register_count(count: i64) -> Result<u16, CoreError> {
    if !(1..=i64::from(MAX_REGISTER_COUNT)).contains(&count) {
        return Err(CoreError::Validation(format!(
            "register count must be between 1 and {MAX_REGISTER_COUNT}, got {count}"
        )));
    }
    Ok(count as u16)
}

pub fn validate_port(port: i64) -> Result<u16, CoreError> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| CoreError::Validation(format!("port must be 1-65535, got {port}")))
}

pub fn validate_unit_id(unit_id: i64) -> Result<u8, CoreError> {
    u8::try_from(unit_id)
        .map_err(|_| CoreError::Validation(format!("unit id must be 0-255, got {unit_id}")))
}

pub fn validate_register_address(address: i64) -> Result<u16, CoreError> {
    u16::try_from(address).map_err(|_| {
        CoreError::Validation(format!("register address must be 0-65535, got {address}"))
    })
}

pub fn validate_sampling_interval(secs: i64) -> Result<u64, CoreError> {
    if secs < 1 {
        return Err(CoreError::Validation(format!(
            "sampling interval must be at least 1 second, got {secs}"
        )));
    }
    Ok(secs as u64)
}

/// One sampled value, appended after a successful read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device_id: DbId,
    pub timestamp: Timestamp,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_parses_store_labels() {
        assert_eq!("ONLINE".parse::<DeviceStatus>().unwrap(), DeviceStatus::Online);
        assert_eq!("error".parse::<DeviceStatus>().unwrap(), DeviceStatus::Error);
        assert_matches!("gone".parse::<DeviceStatus>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn register_count_bounds() {
        assert_eq!(validate_register_count(1).unwrap(), 1);
        assert_eq!(validate_register_count(125).unwrap(), 125);
        assert!(validate_register_count(0).is_err());
        assert!(validate_register_count(126).is_err());
    }

    #[test]
    fn port_rejects_zero_and_overflow() {
        assert_eq!(validate_port(502).unwrap(), 502);
        assert!(validate_port(0).is_err());
        assert!(validate_port(70_000).is_err());
    }

    #[test]
    fn unit_id_and_interval() {
        assert_eq!(validate_unit_id(247).unwrap(), 247);
        assert!(validate_unit_id(256).is_err());
        assert!(validate_sampling_interval(0).is_err());
        assert_eq!(validate_sampling_interval(30).unwrap(), 30);
    }
}
