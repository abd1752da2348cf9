//! Deduplicated device-disconnect alerts.
//!
//! [`DisconnectNotifier`] fans a DEVICE_DISCONNECT alert out to every
//! owner and admin. A recipient who already has an undismissed alert for
//! the same device from within the cooldown window gets that existing
//! notification back instead of a new one, so a device that keeps
//! failing does not flood anyone's inbox.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ddms_core::error::CoreError;
use ddms_core::notification::{
    NewNotification, Notification, NotificationSeverity, NotificationType,
};
use ddms_core::store::{NotificationStore, UserDirectory};
use ddms_core::types::{DbId, Timestamp};

/// Minimum interval between repeated disconnect alerts for the same
/// user and device.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300); // 5 minutes

/// Tunable parameters for the notifier.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub cooldown: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// The device details that go into an alert.
struct DisconnectAlert<'a> {
    device_id: DbId,
    device_name: &'a str,
    address: &'a str,
    last_reading_at: Option<Timestamp>,
}

impl DisconnectAlert<'_> {
    fn title(&self) -> String {
        format!("Device Disconnected: {}", self.device_name)
    }

    fn message(&self) -> String {
        let last_seen = self
            .last_reading_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "Never".to_string());
        format!(
            "Device '{}' ({}) stopped responding to polling. Last successful reading: {last_seen}",
            self.device_name, self.address,
        )
    }

    fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "device_name": self.device_name,
            "device_ip": self.address,
            "last_reading_at": self.last_reading_at.map(|ts| ts.to_rfc3339()),
        })
    }
}

/// Creates DEVICE_DISCONNECT notifications, at most one per
/// (user, device) per cooldown window.
pub struct DisconnectNotifier<S> {
    store: Arc<S>,
    config: NotifierConfig,
}

impl<S> DisconnectNotifier<S>
where
    S: NotificationStore + UserDirectory,
{
    pub fn new(store: Arc<S>, config: NotifierConfig) -> Self {
        Self { store, config }
    }

    /// Notify every owner and admin that a device stopped responding.
    ///
    /// Returns one notification per recipient that was handled
    /// successfully, either freshly created or the existing duplicate.
    /// Failures for a single recipient are logged and skipped.
    pub async fn notify_disconnect(
        &self,
        device_id: DbId,
        device_name: &str,
        address: &str,
        last_reading_at: Option<Timestamp>,
    ) -> Vec<Notification> {
        self.notify_disconnect_at(Utc::now(), device_id, device_name, address, last_reading_at)
            .await
    }

    /// [`notify_disconnect`](Self::notify_disconnect) with an explicit clock.
    pub async fn notify_disconnect_at(
        &self,
        now: Timestamp,
        device_id: DbId,
        device_name: &str,
        address: &str,
        last_reading_at: Option<Timestamp>,
    ) -> Vec<Notification> {
        let recipients = match self.store.admin_and_owner_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(device_id = %device_id, error = %e, "Failed to look up alert recipients");
                return Vec::new();
            }
        };

        if recipients.is_empty() {
            tracing::warn!(device_id = %device_id, "No admin or owner users to notify about device disconnect");
            return Vec::new();
        }

        let alert = DisconnectAlert {
            device_id,
            device_name,
            address,
            last_reading_at,
        };

        let mut notifications = Vec::with_capacity(recipients.len());
        for user_id in recipients {
            match self.notify_user(now, user_id, &alert).await {
                Ok(n) => notifications.push(n),
                Err(e) => {
                    tracing::error!(
                        user_id = %user_id,
                        device_id = %device_id,
                        error = %e,
                        "Failed to create disconnect notification",
                    );
                }
            }
        }

        tracing::info!(
            device_id = %device_id,
            device_name,
            count = notifications.len(),
            "Device disconnect notifications handled",
        );

        notifications
    }

    /// Return the user's recent duplicate if one exists, otherwise create
    /// a new notification.
    async fn notify_user(
        &self,
        now: Timestamp,
        user_id: DbId,
        alert: &DisconnectAlert<'_>,
    ) -> Result<Notification, CoreError> {
        let since = window_start(now, self.config.cooldown);

        if let Some(existing) = self
            .store
            .find_recent_undismissed(
                user_id,
                alert.device_id,
                NotificationType::DeviceDisconnect,
                since,
            )
            .await?
        {
            tracing::info!(
                user_id = %user_id,
                device_id = %alert.device_id,
                notification_id = %existing.id,
                "Skipping duplicate disconnect notification",
            );
            return Ok(existing);
        }

        let input = NewNotification {
            kind: NotificationType::DeviceDisconnect,
            severity: NotificationSeverity::Error,
            title: alert.title(),
            message: alert.message(),
            user_id,
            device_id: Some(alert.device_id),
            metadata: alert.metadata(),
            created_at: now,
        };

        self.store.create_notification(&input).await
    }
}

/// Earliest creation time that still counts as a duplicate.
fn window_start(now: Timestamp, cooldown: Duration) -> Timestamp {
    chrono::Duration::from_std(cooldown)
        .ok()
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn alert(last_reading_at: Option<Timestamp>) -> DisconnectAlert<'static> {
        DisconnectAlert {
            device_id: DbId::nil(),
            device_name: "pump-7",
            address: "10.1.1.7:502",
            last_reading_at,
        }
    }

    #[test]
    fn message_without_reading_says_never() {
        let msg = alert(None).message();
        assert!(msg.contains("'pump-7' (10.1.1.7:502)"));
        assert!(msg.ends_with("Last successful reading: Never"));
    }

    #[test]
    fn message_and_metadata_carry_last_reading() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let a = alert(Some(ts));
        assert!(a.message().ends_with("2025-03-04 05:06:07 UTC"));
        let meta = a.metadata();
        assert_eq!(meta["device_name"], "pump-7");
        assert_eq!(meta["device_ip"], "10.1.1.7:502");
        assert_eq!(meta["last_reading_at"], ts.to_rfc3339());
        assert_eq!(a.title(), "Device Disconnected: pump-7");
    }

    #[test]
    fn window_start_saturates() {
        let now = Utc::now();
        assert_eq!(
            window_start(now, Duration::from_secs(300)),
            now - chrono::Duration::minutes(5)
        );
        assert_eq!(
            window_start(now, Duration::MAX),
            chrono::DateTime::<Utc>::MIN_UTC
        );
    }
}
