//! Fetch window - how far back to ask SimpleFIN for transactions

use chrono::{DateTime, Duration, Utc};

/// Lookback for an item that has never synced.
/// SimpleFIN bridges reject or truncate requests beyond 365 days of history.
pub const INITIAL_LOOKBACK_DAYS: i64 = 364;

/// Overlap re-fetched before the last sync to pick up late-posting transactions
pub const RESYNC_OVERLAP_DAYS: i64 = 7;

/// Start of the transaction window for the next sync
pub fn sync_start_date(last_synced_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match last_synced_at {
        Some(last) => last - Duration::days(RESYNC_OVERLAP_DAYS),
        None => now - Duration::days(INITIAL_LOOKBACK_DAYS),
    }
}
