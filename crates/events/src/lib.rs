//! DDMS alert fan-out.
//!
//! [`DisconnectNotifier`] creates deduplicated DEVICE_DISCONNECT
//! notifications for every owner and admin.

pub mod notifier;

pub use notifier::{DisconnectNotifier, NotifierConfig};
