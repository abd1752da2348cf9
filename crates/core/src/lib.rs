//! Domain types and pure logic shared by every DDMS crate.
//!
//! Nothing in this crate touches the network or the database. The
//! collaborator traits in [`store`] are the seam through which the
//! poller reaches the configuration store.

pub mod device;
pub mod error;
pub mod notification;
pub mod roles;
pub mod status;
pub mod store;
pub mod types;
