//! Device polling scheduler.
//!
//! [`DeviceManager`] keeps one polling task per monitored device. Tasks
//! are tracked in a registry keyed by device id; the registry lock is
//! only held while an entry is looked up, inserted, or removed, never
//! while a task runs or is being awaited.
//!
//! Every task gets a child of the manager's cancellation token, so
//! dropping the manager stops all of them.

use std::collections::HashMap;
use std::sync::Arc;

use ddms_core::device::Device;
use ddms_core::error::CoreError;
use ddms_core::store::PollerStore;
use ddms_core::types::DbId;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::TransportFactory;
use crate::events::{DeviceEvent, StopReason};
use crate::poller::{run_device_loop, PollerShared, PollingConfig};

/// Broadcast channel capacity for device events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of [`DeviceManager::add_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Started,
    AlreadyMonitored,
    NotFound,
}

/// Registry entry for one running device task.
struct PollingTask {
    cancel: CancellationToken,
    handle: JoinHandle<StopReason>,
}

impl PollingTask {
    /// A task that ended on its own (its device was deleted) no longer
    /// counts as monitoring anything.
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Schedules and supervises per-device polling tasks.
pub struct DeviceManager<S, F> {
    shared: Arc<PollerShared<S, F>>,
    tasks: Mutex<HashMap<DbId, PollingTask>>,
    /// Parent of every task token.
    cancel: CancellationToken,
}

impl<S, F> DeviceManager<S, F>
where
    S: PollerStore,
    F: TransportFactory,
{
    pub fn new(store: Arc<S>, factory: Arc<F>, config: PollingConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(PollerShared::new(store, factory, events, config)),
            tasks: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to device events from every polling task.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.shared.events.subscribe()
    }

    /// Ids of the devices with a live polling task.
    pub async fn monitored_device_ids(&self) -> Vec<DbId> {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, task| task.is_running());
        tasks.keys().copied().collect()
    }

    pub async fn is_monitored(&self, device_id: DbId) -> bool {
        self.tasks
            .lock()
            .await
            .get(&device_id)
            .is_some_and(PollingTask::is_running)
    }

    /// Load every configured device and start polling the ones that are
    /// not already monitored. Returns how many tasks were started.
    ///
    /// A store failure is logged and leaves the manager with whatever it
    /// was already running.
    pub async fn start(&self) -> usize {
        let devices = match self.shared.store.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load devices");
                return 0;
            }
        };

        tracing::info!(count = devices.len(), "Loading devices for polling");

        let mut started = 0;
        for device in devices {
            if self.spawn_if_absent(&device).await == AddOutcome::Started {
                started += 1;
            }
        }

        tracing::info!(started, "Device manager started");
        started
    }

    /// Start polling a single device.
    pub async fn add_device(&self, device_id: DbId) -> Result<AddOutcome, CoreError> {
        if self.is_monitored(device_id).await {
            tracing::info!(device_id = %device_id, "Device already monitored");
            return Ok(AddOutcome::AlreadyMonitored);
        }

        let Some(device) = self.shared.store.find_device(device_id).await? else {
            tracing::warn!(device_id = %device_id, "Cannot monitor unknown device");
            return Ok(AddOutcome::NotFound);
        };

        // Another caller may have added it while the record was loading.
        Ok(self.spawn_if_absent(&device).await)
    }

    /// Stop polling a device and wait for its task to close its session.
    ///
    /// Returns `false` when the device was not being monitored, including
    /// when its task had already ended because the record was deleted.
    pub async fn remove_device(&self, device_id: DbId) -> bool {
        let task = self.tasks.lock().await.remove(&device_id);
        let Some(task) = task else {
            tracing::info!(device_id = %device_id, "Device not monitored, nothing to remove");
            return false;
        };

        let was_running = task.is_running();
        task.cancel.cancel();
        join_task(device_id, task.handle).await;

        if was_running {
            tracing::info!(device_id = %device_id, "Device removed from polling");
        } else {
            tracing::info!(device_id = %device_id, "Polling task had already exited, entry cleared");
        }
        was_running
    }

    /// Restart polling for a device so configuration changes start from a
    /// fresh session and failure count.
    pub async fn reload_device(&self, device_id: DbId) -> Result<AddOutcome, CoreError> {
        self.remove_device(device_id).await;
        self.add_device(device_id).await
    }

    /// Stop every polling task and wait for all of them to exit.
    pub async fn stop(&self) {
        let drained: Vec<(DbId, PollingTask)> = self.tasks.lock().await.drain().collect();
        tracing::info!(count = drained.len(), "Stopping device manager");

        for (_, task) in &drained {
            task.cancel.cancel();
        }
        for (device_id, task) in drained {
            join_task(device_id, task.handle).await;
        }

        tracing::info!("Device manager stopped");
    }

    async fn spawn_if_absent(&self, device: &Device) -> AddOutcome {
        let mut tasks = self.tasks.lock().await;
        if tasks.get(&device.id).is_some_and(PollingTask::is_running) {
            return AddOutcome::AlreadyMonitored;
        }

        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(run_device_loop(
            Arc::clone(&self.shared),
            device.id,
            cancel.clone(),
        ));
        tasks.insert(device.id, PollingTask { cancel, handle });

        tracing::info!(
            device_id = %device.id,
            name = %device.name,
            address = %device.address(),
            interval_secs = device.sampling_interval_secs,
            "Device added to polling",
        );
        AddOutcome::Started
    }
}

impl<S, F> Drop for DeviceManager<S, F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn join_task(device_id: DbId, handle: JoinHandle<StopReason>) {
    match handle.await {
        Ok(reason) => {
            tracing::debug!(device_id = %device_id, reason = ?reason, "Polling task joined");
        }
        Err(e) => {
            tracing::error!(device_id = %device_id, error = %e, "Polling task panicked");
        }
    }
}
