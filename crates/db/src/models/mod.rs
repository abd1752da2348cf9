//! Row types for the tables the poller touches.

pub mod device;
pub mod notification;
pub mod reading;
