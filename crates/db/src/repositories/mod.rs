//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod device_repo;
pub mod notification_repo;
pub mod reading_repo;
pub mod user_repo;

pub use device_repo::DeviceRepo;
pub use notification_repo::NotificationRepo;
pub use reading_repo::ReadingRepo;
pub use user_repo::UserRepo;
