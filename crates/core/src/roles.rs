//! Well-known role name constants.
//!
//! Only owners and admins receive device alerts.

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";

/// Roles whose holders are notified when a device stops responding.
pub const ALERT_RECIPIENT_ROLES: [&str; 2] = [ROLE_OWNER, ROLE_ADMIN];
