//! Modbus TCP device polling.
//!
//! [`DeviceManager`] runs one polling task per configured device. Each
//! task reads a value through a [`ModbusCollector`], stores it, and
//! escalates repeated failures to owner/admin notifications.

pub mod client;
pub mod collector;
pub mod decode;
pub mod events;
pub mod manager;
pub mod poller;

pub use client::{RegisterTransport, TcpTransport, TcpTransportFactory, TransportError, TransportFactory};
pub use collector::{CollectorConfig, ModbusCollector};
pub use events::{DeviceEvent, StopReason};
pub use manager::{AddOutcome, DeviceManager};
pub use poller::PollingConfig;
