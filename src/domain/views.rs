//! View ledger keys: at most one counted view per media item, client and UTC day.

use sha2::{Digest, Sha256};
use time::{
    Duration, OffsetDateTime, UtcOffset, format_description::FormatItem,
    macros::format_description,
};
use uuid::Uuid;

const DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub media_id: Uuid,
    pub ip_hash: String,
    pub date_day: String,
}

impl ViewKey {
    pub fn new(media_id: Uuid, salt: &str, client_ip: &str, now: OffsetDateTime) -> Self {
        Self {
            media_id,
            ip_hash: hash_client_ip(salt, client_ip),
            date_day: utc_day(now),
        }
    }
}

/// Salted SHA-256 of the client address, hex encoded. Raw addresses are never stored.
pub fn hash_client_ip(salt: &str, client_ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(client_ip.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// `YYYY-MM-DD` for `now` in UTC.
pub fn utc_day(now: OffsetDateTime) -> String {
    now.to_offset(UtcOffset::UTC)
        .format(DAY_FORMAT)
        .unwrap_or_else(|_| now.date().to_string())
}

/// Ledger rows created before this instant are eligible for purging.
pub fn retention_cutoff(now: OffsetDateTime, retention_days: u32) -> OffsetDateTime {
    now - Duration::days(i64::from(retention_days))
}

/// Result of a view ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ViewOutcome {
    pub counted: bool,
    pub views: i64,
}
