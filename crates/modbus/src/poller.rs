//! The per-device polling loop.
//!
//! Each monitored device runs [`run_device_loop`] in its own task. An
//! iteration re-reads the device record, reads one value through the
//! device's collector, and records either a reading or a failure. The
//! loop ends when its token is cancelled or the record disappears; in
//! both cases the collector session is closed before the task returns.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ddms_core::device::{Device, DeviceStatus, Reading};
use ddms_core::error::CoreError;
use ddms_core::status::evaluate;
use ddms_core::store::PollerStore;
use ddms_core::types::{DbId, Timestamp};
use ddms_events::{DisconnectNotifier, NotifierConfig};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::{RegisterTransport, TransportFactory};
use crate::collector::{CollectorConfig, ModbusCollector};
use crate::events::{DeviceEvent, StopReason};

/// Raw register values are stored unscaled.
const SCALING_FACTOR: f64 = 1.0;

/// Tunable parameters for the polling loop.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Sleep after a failed cycle.
    pub reconnect_delay: Duration,
    /// Consecutive failed cycles before owners and admins are alerted.
    pub failure_threshold: u32,
    pub collector: CollectorConfig,
    pub notifier: NotifierConfig,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(60),
            failure_threshold: 3,
            collector: CollectorConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

/// State shared by the manager and every polling task.
pub(crate) struct PollerShared<S, F> {
    pub store: Arc<S>,
    pub factory: Arc<F>,
    pub notifier: DisconnectNotifier<S>,
    pub events: broadcast::Sender<DeviceEvent>,
    pub config: PollingConfig,
}

impl<S, F> PollerShared<S, F>
where
    S: PollerStore,
{
    pub fn new(
        store: Arc<S>,
        factory: Arc<F>,
        events: broadcast::Sender<DeviceEvent>,
        config: PollingConfig,
    ) -> Self {
        let notifier = DisconnectNotifier::new(Arc::clone(&store), config.notifier.clone());
        Self {
            store,
            factory,
            notifier,
            events,
            config,
        }
    }

    fn publish(&self, event: DeviceEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Result of one polling iteration.
enum Cycle {
    /// A reading was stored; sleep for the device's sampling interval.
    Success(Duration),
    Failure,
    ConfigGone,
}

/// Task-local state of one device.
struct DeviceTask<T> {
    device_id: DbId,
    collector: Option<ModbusCollector<T>>,
    consecutive_failures: u32,
    /// Last successfully fetched record, for alerts when the fetch fails.
    last_known: Option<Device>,
}

/// Poll `device_id` until `cancel` fires or the device record is deleted.
pub(crate) async fn run_device_loop<S, F>(
    shared: Arc<PollerShared<S, F>>,
    device_id: DbId,
    cancel: CancellationToken,
) -> StopReason
where
    S: PollerStore,
    F: TransportFactory,
{
    tracing::info!(device_id = %device_id, "Polling task started");

    let mut task = DeviceTask::<F::Transport> {
        device_id,
        collector: None,
        consecutive_failures: 0,
        last_known: None,
    };

    let reason = loop {
        let cycle = tokio::select! {
            _ = cancel.cancelled() => None,
            cycle = task.poll_once(&*shared) => Some(cycle),
        };

        let delay = match cycle {
            None => break StopReason::Cancelled,
            Some(Cycle::ConfigGone) => break StopReason::ConfigGone,
            Some(Cycle::Success(interval)) => interval,
            Some(Cycle::Failure) => shared.config.reconnect_delay,
        };

        let cancelled = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        };
        if cancelled {
            break StopReason::Cancelled;
        }
    };

    if let Some(mut collector) = task.collector.take() {
        collector.disconnect().await;
    }

    shared.publish(DeviceEvent::MonitoringStopped { device_id, reason });
    tracing::info!(device_id = %device_id, reason = ?reason, "Polling task exited");
    reason
}

impl<T> DeviceTask<T>
where
    T: RegisterTransport,
{
    async fn poll_once<S, F>(&mut self, shared: &PollerShared<S, F>) -> Cycle
    where
        S: PollerStore,
        F: TransportFactory<Transport = T>,
    {
        let device = match shared.store.find_device(self.device_id).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                tracing::info!(device_id = %self.device_id, "Device no longer configured, stopping");
                return Cycle::ConfigGone;
            }
            Err(e) => {
                tracing::error!(device_id = %self.device_id, error = %e, "Failed to load device configuration");
                return self.record_failure(shared).await;
            }
        };

        let value = self
            .collector_for(&device, shared)
            .await
            .read_value(
                device.unit_id,
                device.register_address,
                device.register_count,
                SCALING_FACTOR,
            )
            .await;
        let interval = device.sampling_interval();
        let thresholds = device.thresholds;
        self.last_known = Some(device);

        let Some(value) = value else {
            return self.record_failure(shared).await;
        };

        let timestamp = Utc::now();
        if let Err(e) = self.store_reading(shared, value, timestamp).await {
            tracing::error!(device_id = %self.device_id, error = %e, "Failed to store reading");
            return self.record_failure(shared).await;
        }

        self.consecutive_failures = 0;
        let status = evaluate(value, &thresholds);

        tracing::debug!(device_id = %self.device_id, value, status = status.as_str(), "Reading recorded");
        shared.publish(DeviceEvent::ReadingRecorded {
            device_id: self.device_id,
            value,
            status,
            timestamp,
        });

        Cycle::Success(interval)
    }

    /// The collector for `device`, rebuilt when its address changed.
    async fn collector_for<S, F>(
        &mut self,
        device: &Device,
        shared: &PollerShared<S, F>,
    ) -> &mut ModbusCollector<T>
    where
        F: TransportFactory<Transport = T>,
    {
        let stale = self
            .collector
            .as_ref()
            .is_some_and(|c| !c.targets(&device.host, device.port));
        if stale {
            if let Some(mut old) = self.collector.take() {
                tracing::info!(
                    device_id = %self.device_id,
                    from = %format!("{}:{}", old.host(), old.port()),
                    to = %device.address(),
                    "Device address changed, replacing collector",
                );
                old.disconnect().await;
            }
        }

        self.collector.get_or_insert_with(|| {
            let config = shared.config.collector.clone();
            let transport = shared.factory.create(&device.host, device.port, config.timeout);
            ModbusCollector::new(transport, device.host.clone(), device.port, config)
        })
    }

    async fn store_reading<S, F>(
        &mut self,
        shared: &PollerShared<S, F>,
        value: f64,
        timestamp: Timestamp,
    ) -> Result<(), CoreError>
    where
        S: PollerStore,
    {
        let reading = Reading {
            device_id: self.device_id,
            timestamp,
            value,
        };
        shared.store.insert_reading(&reading).await?;
        shared
            .store
            .update_status(self.device_id, DeviceStatus::Online, Some(timestamp))
            .await
    }

    async fn record_failure<S, F>(&mut self, shared: &PollerShared<S, F>) -> Cycle
    where
        S: PollerStore,
    {
        self.consecutive_failures += 1;
        tracing::warn!(
            device_id = %self.device_id,
            consecutive_failures = self.consecutive_failures,
            "Polling cycle failed",
        );

        if let Err(e) = shared
            .store
            .update_status(self.device_id, DeviceStatus::Error, None)
            .await
        {
            tracing::error!(device_id = %self.device_id, error = %e, "Failed to mark device as errored");
        }

        if self.consecutive_failures >= shared.config.failure_threshold {
            self.escalate(shared).await;
        }

        Cycle::Failure
    }

    /// Alert owners and admins. Repeats inside the cooldown are
    /// deduplicated by the notifier.
    async fn escalate<S, F>(&mut self, shared: &PollerShared<S, F>)
    where
        S: PollerStore,
    {
        let (name, address, last_reading_at) = match &self.last_known {
            Some(device) => (device.name.clone(), device.address(), device.last_reading_at),
            None => (self.device_id.to_string(), "unknown".to_string(), None),
        };

        let notified = shared
            .notifier
            .notify_disconnect(self.device_id, &name, &address, last_reading_at)
            .await;

        tracing::warn!(
            device_id = %self.device_id,
            consecutive_failures = self.consecutive_failures,
            notified = notified.len(),
            "Device considered disconnected",
        );

        shared.publish(DeviceEvent::Disconnected {
            device_id: self.device_id,
            consecutive_failures: self.consecutive_failures,
            notified: notified.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polling_config() {
        let config = PollingConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(60));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.collector.retries, 3);
        assert_eq!(config.notifier.cooldown, Duration::from_secs(300));
    }
}
