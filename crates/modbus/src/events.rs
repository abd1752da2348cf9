//! Events published by the polling tasks.
//!
//! The manager fans these out over a [`tokio::sync::broadcast`] channel.
//! Receivers that fall behind miss events; nothing in the polling path
//! waits on a subscriber.

use ddms_core::status::ReadingStatus;
use ddms_core::types::{DbId, Timestamp};
use serde::Serialize;

/// Why a polling task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Removed from the manager or shut down.
    Cancelled,
    /// The device record no longer exists.
    ConfigGone,
}

/// A device-level event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A value was read and stored.
    ReadingRecorded {
        device_id: DbId,
        value: f64,
        status: ReadingStatus,
        timestamp: Timestamp,
    },

    /// The device reached the consecutive-failure threshold.
    Disconnected {
        device_id: DbId,
        consecutive_failures: u32,
        /// Notifications handed to recipients, new or deduplicated.
        notified: usize,
    },

    MonitoringStopped { device_id: DbId, reason: StopReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let id = DbId::nil();
        let json = serde_json::to_value(DeviceEvent::MonitoringStopped {
            device_id: id,
            reason: StopReason::ConfigGone,
        })
        .unwrap();
        assert_eq!(json["type"], "monitoring_stopped");
        assert_eq!(json["reason"], "config_gone");
        assert_eq!(json["device_id"], id.to_string());
    }
}
