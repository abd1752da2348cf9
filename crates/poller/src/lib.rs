//! `ddms-poller` configuration, shared by the binary and its tests.

pub mod config;
