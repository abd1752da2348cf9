//! Reading rows (append-only time-series).

use ddms_core::device::Reading;
use ddms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `readings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadingRow {
    pub device_id: DbId,
    pub timestamp: Timestamp,
    pub value: f64,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            device_id: row.device_id,
            timestamp: row.timestamp,
            value: row.value,
        }
    }
}
