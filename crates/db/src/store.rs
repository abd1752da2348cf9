//! [`PgStore`]: the PostgreSQL implementation of the collaborator traits.

use ddms_core::device::{Device, DeviceStatus, Reading};
use ddms_core::error::CoreError;
use ddms_core::notification::{NewNotification, Notification, NotificationType};
use ddms_core::status::{self, DeviceStatusReport};
use ddms_core::store::{DeviceStore, NotificationStore, UserDirectory};
use ddms_core::types::{DbId, Timestamp};

use crate::repositories::{DeviceRepo, NotificationRepo, ReadingRepo, UserRepo};
use crate::DbPool;

/// Store backed by a shared connection pool.
///
/// Every call checks a connection out of the pool for the duration of a
/// single query, so no connection is held while a polling task sleeps.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Latest reading of a device with its threshold band.
    ///
    /// `Ok(None)` covers both a missing device and a device that has not
    /// produced a reading yet.
    pub async fn device_status(&self, id: DbId) -> Result<Option<DeviceStatusReport>, CoreError> {
        let Some(device) = self.find_device(id).await? else {
            return Ok(None);
        };
        let latest = ReadingRepo::latest_for_device(&self.pool, id)
            .await
            .map_err(db_error)?
            .map(Reading::from);
        Ok(status::report(&device, latest.as_ref()))
    }
}

fn db_error(e: sqlx::Error) -> CoreError {
    CoreError::Database(e.to_string())
}

impl DeviceStore for PgStore {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let rows = DeviceRepo::list(&self.pool).await.map_err(db_error)?;

        let devices = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match Device::try_from(row) {
                    Ok(device) => Some(device),
                    Err(e) => {
                        tracing::warn!(device_id = %id, error = %e, "Skipping invalid device configuration");
                        None
                    }
                }
            })
            .collect();

        Ok(devices)
    }

    async fn find_device(&self, id: DbId) -> Result<Option<Device>, CoreError> {
        DeviceRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_error)?
            .map(Device::try_from)
            .transpose()
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), CoreError> {
        ReadingRepo::insert(&self.pool, reading)
            .await
            .map_err(db_error)
    }

    async fn update_status(
        &self,
        id: DbId,
        status: DeviceStatus,
        last_reading_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        let updated = DeviceRepo::update_status(&self.pool, id, status, last_reading_at)
            .await
            .map_err(db_error)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "device",
                id,
            });
        }
        Ok(())
    }
}

impl NotificationStore for PgStore {
    async fn find_recent_undismissed(
        &self,
        user_id: DbId,
        device_id: DbId,
        kind: NotificationType,
        since: Timestamp,
    ) -> Result<Option<Notification>, CoreError> {
        NotificationRepo::find_recent_undismissed(&self.pool, user_id, device_id, kind, since)
            .await
            .map_err(db_error)?
            .map(Notification::try_from)
            .transpose()
    }

    async fn create_notification(&self, input: &NewNotification) -> Result<Notification, CoreError> {
        let row = NotificationRepo::create(&self.pool, input)
            .await
            .map_err(db_error)?;
        Notification::try_from(row)
    }
}

impl UserDirectory for PgStore {
    async fn admin_and_owner_ids(&self) -> Result<Vec<DbId>, CoreError> {
        UserRepo::admin_and_owner_ids(&self.pool)
            .await
            .map_err(db_error)
    }
}
