//! Collaborator traits for the configuration store.
//!
//! The poller never defines the schema it reads from. It talks to the
//! store only through these traits, which `ddms-db` implements over
//! PostgreSQL and tests implement in memory.

use std::future::Future;

use crate::device::{Device, DeviceStatus, Reading};
use crate::error::CoreError;
use crate::notification::{NewNotification, Notification, NotificationType};
use crate::types::{DbId, Timestamp};

/// Device configuration reads and reading/status writes.
pub trait DeviceStore: Send + Sync + 'static {
    /// Every configured device.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;

    /// The current configuration of one device, or `None` once deleted.
    fn find_device(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Device>, CoreError>> + Send;

    /// Append a reading.
    fn insert_reading(&self, reading: &Reading)
        -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Set the device status. `last_reading_at` is left untouched when `None`.
    fn update_status(
        &self,
        id: DbId,
        status: DeviceStatus,
        last_reading_at: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Notification lookups and creation.
pub trait NotificationStore: Send + Sync + 'static {
    /// The most recent non-dismissed notification of `kind` for the
    /// (user, device) pair created at or after `since`.
    fn find_recent_undismissed(
        &self,
        user_id: DbId,
        device_id: DbId,
        kind: NotificationType,
        since: Timestamp,
    ) -> impl Future<Output = Result<Option<Notification>, CoreError>> + Send;

    fn create_notification(
        &self,
        input: &NewNotification,
    ) -> impl Future<Output = Result<Notification, CoreError>> + Send;
}

/// User lookups needed for alert fan-out.
pub trait UserDirectory: Send + Sync + 'static {
    /// Ids of every user holding the owner or admin role.
    fn admin_and_owner_ids(&self) -> impl Future<Output = Result<Vec<DbId>, CoreError>> + Send;
}

/// Everything the device poller needs from the store.
pub trait PollerStore: DeviceStore + NotificationStore + UserDirectory {}

impl<T> PollerStore for T where T: DeviceStore + NotificationStore + UserDirectory {}
