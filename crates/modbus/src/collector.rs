//! Per-device register collector with retry and reconnect.
//!
//! [`ModbusCollector`] owns one transport session. A read makes up to
//! `retries` attempts; between attempts the session is torn down, left
//! alone for `retry_pause`, and reopened. Nothing here returns an error:
//! failures are logged and surface as `None`, and the polling loop
//! decides what a failed cycle means.

use std::time::Duration;

use crate::client::{RegisterTransport, TransportError};
use crate::decode::decode_registers;

/// Tunable parameters for a collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Bound on every connect and read.
    pub timeout: Duration,
    /// Attempts per read.
    pub retries: u32,
    /// Pause between a failed attempt and the reconnect.
    pub retry_pause: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 3,
            retry_pause: Duration::from_secs(1),
        }
    }
}

/// Reads register values from one device endpoint.
pub struct ModbusCollector<T> {
    transport: T,
    host: String,
    port: u16,
    config: CollectorConfig,
}

impl<T: RegisterTransport> ModbusCollector<T> {
    pub fn new(transport: T, host: impl Into<String>, port: u16, config: CollectorConfig) -> Self {
        Self {
            transport,
            host: host.into(),
            port,
            config,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this collector talks to `host:port`.
    pub fn targets(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Open the session. Failures are logged, never raised.
    pub async fn connect(&mut self) -> bool {
        match self.transport.connect().await {
            Ok(()) => {
                tracing::info!(host = %self.host, port = self.port, "Connected to Modbus device");
                true
            }
            Err(e) => {
                tracing::warn!(host = %self.host, port = self.port, error = %e, "Modbus connect failed");
                false
            }
        }
    }

    /// Close the session. Idempotent.
    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
        tracing::debug!(host = %self.host, port = self.port, "Modbus session closed");
    }

    /// Read `count` holding registers starting at `address`.
    ///
    /// Returns `None` when the session cannot be opened or every attempt
    /// fails. A response shorter than `count` counts as a failed attempt.
    pub async fn read_registers(&mut self, unit_id: u8, address: u16, count: u16) -> Option<Vec<u16>> {
        if !self.transport.is_connected() && !self.connect().await {
            return None;
        }

        let retries = self.config.retries.max(1);
        for attempt in 1..=retries {
            let result = self
                .transport
                .read_holding_registers(unit_id, address, count)
                .await
                .and_then(|words| {
                    if words.len() < usize::from(count) {
                        Err(TransportError::ShortResponse {
                            expected: count,
                            got: words.len(),
                        })
                    } else {
                        Ok(words)
                    }
                });

            match result {
                Ok(words) => return Some(words),
                Err(e) => {
                    tracing::warn!(
                        host = %self.host,
                        port = self.port,
                        unit_id,
                        address,
                        count,
                        attempt,
                        retries,
                        error = %e,
                        "Modbus read failed",
                    );
                    if attempt < retries {
                        self.transport.disconnect().await;
                        tokio::time::sleep(self.config.retry_pause).await;
                        // A failed reconnect still uses up this attempt.
                        self.connect().await;
                    }
                }
            }
        }

        tracing::error!(
            host = %self.host,
            port = self.port,
            unit_id,
            address,
            retries,
            "Modbus read exhausted all attempts",
        );
        None
    }

    /// Read and decode one value, multiplied by `scaling_factor`.
    ///
    /// A `count` of zero or a non-finite float payload yields `None`.
    pub async fn read_value(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
        scaling_factor: f64,
    ) -> Option<f64> {
        if count == 0 {
            tracing::warn!(host = %self.host, address, "Rejecting read of zero registers");
            return None;
        }

        let words = self.read_registers(unit_id, address, count).await?;
        match decode_registers(&words[..usize::from(count)], scaling_factor) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(host = %self.host, port = self.port, address, error = %e, "Discarding undecodable reading");
                None
            }
        }
    }
}
