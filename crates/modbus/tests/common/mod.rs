//! Shared fixtures for the polling integration tests: an in-memory store
//! and a transport factory whose sessions are driven by a shared switch.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ddms_core::device::{Device, DeviceStatus, Reading, Thresholds};
use ddms_core::error::CoreError;
use ddms_core::notification::{NewNotification, Notification, NotificationType};
use ddms_core::store::{DeviceStore, NotificationStore, UserDirectory};
use ddms_core::types::{DbId, Timestamp};
use ddms_modbus::{RegisterTransport, TransportError, TransportFactory};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub admins: Vec<DbId>,
    pub fail_inserts: AtomicBool,
    devices: Mutex<HashMap<DbId, Device>>,
    readings: Mutex<Vec<Reading>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryStore {
    pub fn with_admins(count: usize) -> Self {
        Self {
            admins: (0..count).map(|_| Uuid::new_v4()).collect(),
            ..Default::default()
        }
    }

    pub fn put_device(&self, device: Device) {
        self.devices.lock().unwrap().insert(device.id, device);
    }

    pub fn delete_device(&self, id: DbId) {
        self.devices.lock().unwrap().remove(&id);
    }

    pub fn set_host(&self, id: DbId, host: &str) {
        if let Some(device) = self.devices.lock().unwrap().get_mut(&id) {
            device.host = host.to_string();
        }
    }

    pub fn status_of(&self, id: DbId) -> Option<DeviceStatus> {
        self.devices.lock().unwrap().get(&id).map(|d| d.status)
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl DeviceStore for MemoryStore {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        Ok(self.devices.lock().unwrap().values().cloned().collect())
    }

    async fn find_device(&self, id: DbId) -> Result<Option<Device>, CoreError> {
        Ok(self.devices.lock().unwrap().get(&id).cloned())
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), CoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(CoreError::Database("disk full".into()));
        }
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: DbId,
        status: DeviceStatus,
        last_reading_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        let mut devices = self.devices.lock().unwrap();
        let device = devices.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "device",
            id,
        })?;
        device.status = status;
        if last_reading_at.is_some() {
            device.last_reading_at = last_reading_at;
        }
        Ok(())
    }
}

impl NotificationStore for MemoryStore {
    async fn find_recent_undismissed(
        &self,
        user_id: DbId,
        device_id: DbId,
        kind: NotificationType,
        since: Timestamp,
    ) -> Result<Option<Notification>, CoreError> {
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| {
                n.user_id == user_id
                    && n.device_id == Some(device_id)
                    && n.kind == kind
                    && n.dismissed_at.is_none()
                    && n.created_at >= since
            })
            .max_by_key(|n| n.created_at)
            .cloned())
    }

    async fn create_notification(&self, input: &NewNotification) -> Result<Notification, CoreError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind: input.kind,
            severity: input.severity,
            title: input.title.clone(),
            message: input.message.clone(),
            user_id: input.user_id,
            device_id: input.device_id,
            metadata: input.metadata.clone(),
            read_at: None,
            dismissed_at: None,
            created_at: input.created_at,
        };
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(notification)
    }
}

impl UserDirectory for MemoryStore {
    async fn admin_and_owner_ids(&self) -> Result<Vec<DbId>, CoreError> {
        Ok(self.admins.clone())
    }
}

pub fn device(host: &str) -> Device {
    Device {
        id: Uuid::new_v4(),
        name: format!("sensor-{host}"),
        host: host.to_string(),
        port: 502,
        unit_id: 1,
        register_address: 0,
        register_count: 2,
        unit: "°C".into(),
        sampling_interval_secs: 10,
        thresholds: Thresholds {
            warn_upper: Some(80.0),
            crit_upper: Some(90.0),
            ..Default::default()
        },
        retention_days: 30,
        status: DeviceStatus::Offline,
        last_reading_at: None,
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Counters and switches shared by every transport a factory creates.
#[derive(Default)]
pub struct MockState {
    pub fail_reads: AtomicBool,
    /// Reads never complete while set.
    pub hang_reads: AtomicBool,
    pub creates: AtomicUsize,
    pub connects: AtomicUsize,
    pub reads: AtomicUsize,
    /// Closes of an open session.
    pub disconnects: AtomicUsize,
    pub created_for: Mutex<Vec<String>>,
}

/// `Send` but not `Sync`, like a real `tokio-modbus` session, so every
/// test that spawns a polling task also checks the loop never needs a
/// shared transport reference across an await.
pub struct MockTransport {
    connected: bool,
    state: Arc<MockState>,
    _not_sync: PhantomData<Cell<()>>,
}

impl RegisterTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        _unit_id: u8,
        _address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        if self.state.hang_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout(Duration::from_secs(10)));
        }
        // 100.0 as a big-endian f32, padded for wider reads.
        let mut words = vec![0x42C8, 0x0000];
        words.resize(usize::from(count), 0);
        Ok(words)
    }

    async fn disconnect(&mut self) {
        if self.connected {
            self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[derive(Default)]
pub struct MockFactory {
    pub state: Arc<MockState>,
}

impl MockFactory {
    pub fn creates(&self) -> usize {
        self.state.creates.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, hanging: bool) {
        self.state.hang_reads.store(hanging, Ordering::SeqCst);
    }

    pub fn created_for(&self) -> Vec<String> {
        self.state.created_for.lock().unwrap().clone()
    }
}

impl TransportFactory for MockFactory {
    type Transport = MockTransport;

    fn create(&self, host: &str, port: u16, _timeout: Duration) -> MockTransport {
        self.state.creates.fetch_add(1, Ordering::SeqCst);
        self.state
            .created_for
            .lock()
            .unwrap()
            .push(format!("{host}:{port}"));
        MockTransport {
            connected: false,
            state: Arc::clone(&self.state),
            _not_sync: PhantomData,
        }
    }
}
