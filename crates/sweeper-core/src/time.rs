//! Age computation helpers.
//!
//! The scanner captures `now` once per cycle and threads it through every
//! predicate evaluation so that age does not drift while a large tree is
//! being walked (spec.md §4.3 edge cases).

use chrono::{DateTime, Utc};

/// `floor((now - mtime) / 24h)`, clamped to 0 for mtimes in the future.
pub fn age_days(now: DateTime<Utc>, mtime: DateTime<Utc>) -> u32 {
    let delta = now.signed_duration_since(mtime);
    let days = delta.num_days();
    if days < 0 {
        0
    } else {
        days.try_into().unwrap_or(u32::MAX)
    }
}
