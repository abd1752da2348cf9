//! Repository for the `notifications` table.

use ddms_core::notification::{NewNotification, NotificationType};
use ddms_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::notification::{severity_label, type_label, NotificationRow};

/// Column list for `notifications` queries.
const COLUMNS: &str = "\
    id, type::text AS kind, severity::text AS severity, title, message, \
    user_id, device_id, metadata, read_at, dismissed_at, created_at";

/// Provides creation and deduplication lookups for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        input: &NewNotification,
    ) -> Result<NotificationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (id, type, severity, title, message, user_id, device_id, metadata, \
                 created_at, updated_at) \
             VALUES ($1, $2::notificationtype, $3::notificationseverity, $4, $5, $6, $7, $8::json, \
                 $9, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(DbId::new_v4())
            .bind(type_label(input.kind))
            .bind(severity_label(input.severity))
            .bind(&input.title)
            .bind(&input.message)
            .bind(input.user_id)
            .bind(input.device_id)
            .bind(&input.metadata)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Most recent non-dismissed notification of `kind` for a
    /// (user, device) pair created at or after `since`.
    pub async fn find_recent_undismissed(
        pool: &PgPool,
        user_id: DbId,
        device_id: DbId,
        kind: NotificationType,
        since: Timestamp,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 \
               AND device_id = $2 \
               AND type = $3::notificationtype \
               AND created_at >= $4 \
               AND dismissed_at IS NULL \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(device_id)
            .bind(type_label(kind))
            .bind(since)
            .fetch_optional(pool)
            .await
    }
}
