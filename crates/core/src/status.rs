//! Threshold evaluation for device readings.
//!
//! Pure logic, no database access. The caller fetches the latest reading
//! and the device thresholds and passes them in.

use serde::Serialize;

use crate::device::{Device, Reading, Thresholds};
use crate::types::{DbId, Timestamp};

/// Threshold band a reading falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Normal,
    Warning,
    Critical,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Classify `value` against `thresholds`.
///
/// Critical bounds are checked before warning bounds and the first match
/// wins. Comparisons are strict: a value equal to a bound stays in the
/// inner band. Unset bounds never trigger.
pub fn evaluate(value: f64, thresholds: &Thresholds) -> ReadingStatus {
    let below = |bound: Option<f64>| bound.is_some_and(|b| value < b);
    let above = |bound: Option<f64>| bound.is_some_and(|b| value > b);

    if below(thresholds.crit_lower) || above(thresholds.crit_upper) {
        ReadingStatus::Critical
    } else if below(thresholds.warn_lower) || above(thresholds.warn_upper) {
        ReadingStatus::Warning
    } else {
        ReadingStatus::Normal
    }
}

/// Latest reading of a device together with its threshold band.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusReport {
    pub device_id: DbId,
    pub device_name: String,
    pub unit: String,
    pub status: ReadingStatus,
    pub latest_value: f64,
    pub latest_timestamp: Timestamp,
}

/// Build the status report for a device.
///
/// Returns `None` when the device has never produced a reading. That is
/// "no data", which callers must not confuse with [`ReadingStatus::Normal`].
pub fn report(device: &Device, latest: Option<&Reading>) -> Option<DeviceStatusReport> {
    let reading = latest?;
    Some(DeviceStatusReport {
        device_id: device.id,
        device_name: device.name.clone(),
        unit: device.unit.clone(),
        status: evaluate(reading.value, &device.thresholds),
        latest_value: reading.value,
        latest_timestamp: reading.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::device::DeviceStatus;

    fn banded() -> Thresholds {
        Thresholds {
            warn_lower: Some(10.0),
            warn_upper: Some(30.0),
            crit_lower: Some(0.0),
            crit_upper: Some(40.0),
        }
    }

    #[test]
    fn classifies_each_band() {
        let t = banded();
        assert_eq!(evaluate(20.0, &t), ReadingStatus::Normal);
        assert_eq!(evaluate(35.0, &t), ReadingStatus::Warning);
        assert_eq!(evaluate(5.0, &t), ReadingStatus::Warning);
        assert_eq!(evaluate(45.0, &t), ReadingStatus::Critical);
        assert_eq!(evaluate(-5.0, &t), ReadingStatus::Critical);
    }

    #[test]
    fn bounds_are_exclusive() {
        let t = banded();
        assert_eq!(evaluate(30.0, &t), ReadingStatus::Normal);
        assert_eq!(evaluate(10.0, &t), ReadingStatus::Normal);
        assert_eq!(evaluate(40.0, &t), ReadingStatus::Warning);
        assert_eq!(evaluate(0.0, &t), ReadingStatus::Warning);
    }

    #[test]
    fn unset_bounds_never_trigger() {
        let t = Thresholds::default();
        assert_eq!(evaluate(f64::MAX, &t), ReadingStatus::Normal);
        assert_eq!(evaluate(f64::MIN, &t), ReadingStatus::Normal);

        let only_crit_upper = Thresholds {
            crit_upper: Some(100.0),
            ..Default::default()
        };
        assert_eq!(evaluate(-1_000.0, &only_crit_upper), ReadingStatus::Normal);
        assert_eq!(evaluate(100.5, &only_crit_upper), ReadingStatus::Critical);
    }

    #[test]
    fn critical_wins_over_warning() {
        // Misconfigured overlap: the critical check still runs first.
        let t = Thresholds {
            warn_upper: Some(50.0),
            crit_upper: Some(20.0),
            ..Default::default()
        };
        assert_eq!(evaluate(60.0, &t), ReadingStatus::Critical);
    }

    fn device() -> Device {
        Device {
            id: DbId::new_v4(),
            name: "boiler-1".into(),
            host: "10.0.0.5".into(),
            port: 502,
            unit_id: 1,
            register_address: 0,
            register_count: 1,
            unit: "°C".into(),
            sampling_interval_secs: 10,
            thresholds: banded(),
            retention_days: 90,
            status: DeviceStatus::Online,
            last_reading_at: None,
        }
    }

    #[test]
    fn report_without_reading_is_none() {
        assert!(report(&device(), None).is_none());
    }

    #[test]
    fn report_carries_band_and_value() {
        let device = device();
        let reading = Reading {
            device_id: device.id,
            timestamp: Utc::now(),
            value: 35.0,
        };
        let report = report(&device, Some(&reading)).expect("reading exists");
        assert_eq!(report.status, ReadingStatus::Warning);
        assert_eq!(report.latest_value, 35.0);
        assert_eq!(report.device_name, "boiler-1");
    }
}
