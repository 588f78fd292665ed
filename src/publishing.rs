use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::services::Record;

pub const SCHEDULE_FIELD: &str = "scheduledAt";

/// When the record goes public. Missing, null or unparsable values mean "immediately".
pub fn scheduled_at(record: &Record) -> Option<DateTime<Utc>> {
    match record.field(SCHEDULE_FIELD)? {
        Value::String(stamp) => DateTime::parse_from_rfc3339(stamp)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}

pub fn is_published(record: &Record, now: DateTime<Utc>) -> bool {
    scheduled_at(record).map_or(true, |at| at <= now)
}

pub fn published(records: Vec<Record>, now: DateTime<Utc>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| is_published(record, now))
        .collect()
}
