//! Notification types shared by the deduplicator and the store.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DeviceDisconnect,
    DeviceAlert,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceDisconnect => "device_disconnect",
            Self::DeviceAlert => "device_alert",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "device_disconnect" => Ok(Self::DeviceDisconnect),
            "device_alert" => Ok(Self::DeviceAlert),
            "system" => Ok(Self::System),
            other => Err(CoreError::Validation(format!(
                "unknown notification type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl NotificationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::Validation(format!(
                "unknown notification severity '{other}'"
            ))),
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub kind: NotificationType,
    pub severity: NotificationSeverity,
    pub title: String,
    pub message: String,
    pub user_id: DbId,
    pub device_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub read_at: Option<Timestamp>,
    pub dismissed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for creating a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub severity: NotificationSeverity,
    pub title: String,
    pub message: String,
    pub user_id: DbId,
    pub device_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_labels_parse_in_either_case() {
        assert_eq!(
            NotificationType::parse("DEVICE_DISCONNECT").unwrap(),
            NotificationType::DeviceDisconnect
        );
        assert_eq!(
            NotificationType::parse(NotificationType::System.as_str()).unwrap(),
            NotificationType::System
        );
        assert!(NotificationType::parse("pager").is_err());
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&NotificationSeverity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        assert_eq!(
            NotificationSeverity::parse("ERROR").unwrap(),
            NotificationSeverity::Error
        );
    }
}
