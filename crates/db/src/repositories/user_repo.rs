//! Repository for the `users` table (read-only from the poller).

use ddms_core::roles::ALERT_RECIPIENT_ROLES;
use ddms_core::types::DbId;
use sqlx::PgPool;

/// Provides the user lookups needed for alert fan-out.
pub struct UserRepo;

impl UserRepo {
    /// IDs of every user holding the owner or admin role.
    pub async fn admin_and_owner_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM users \
             WHERE LOWER(role::text) = ANY($1) \
             ORDER BY created_at ASC",
        )
        .bind(ALERT_RECIPIENT_ROLES.as_slice())
        .fetch_all(pool)
        .await
    }
}
