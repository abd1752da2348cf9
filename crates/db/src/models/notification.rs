//! Notification rows.

use ddms_core::error::CoreError;
use ddms_core::notification::{Notification, NotificationSeverity, NotificationType};
use ddms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
///
/// `kind` and `severity` are selected as text from their enum columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationRow {
    pub id: DbId,
    pub kind: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub user_id: DbId,
    pub device_id: Option<DbId>,
    pub metadata: Option<serde_json::Value>,
    pub read_at: Option<Timestamp>,
    pub dismissed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            kind: NotificationType::parse(&row.kind)?,
            severity: NotificationSeverity::parse(&row.severity)?,
            title: row.title,
            message: row.message,
            user_id: row.user_id,
            device_id: row.device_id,
            metadata: row.metadata.unwrap_or_else(|| serde_json::json!({})),
            read_at: row.read_at,
            dismissed_at: row.dismissed_at,
            created_at: row.created_at,
        })
    }
}

/// Label of a [`NotificationType`] in the `notificationtype` enum type.
pub fn type_label(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::DeviceDisconnect => "DEVICE_DISCONNECT",
        NotificationType::DeviceAlert => "DEVICE_ALERT",
        NotificationType::System => "SYSTEM",
    }
}

/// Label of a [`NotificationSeverity`] in the `notificationseverity` enum type.
pub fn severity_label(severity: NotificationSeverity) -> &'static str {
    match severity {
        NotificationSeverity::Info => "INFO",
        NotificationSeverity::Warning => "WARNING",
        NotificationSeverity::Error => "ERROR",
        NotificationSeverity::Critical => "CRITICAL",
    }
}
