//! # Date Handling Utilities
//!
//! Formatting of scan timestamps for product cards.

use chrono::{DateTime, Utc};

/// Format a scan timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
///
/// # Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use shelfscan_util::date_handling::format_scan_time;
///
/// let at = Utc.with_ymd_and_hms(2023, 1, 1, 9, 5, 7).unwrap();
/// assert_eq!(format_scan_time(&at), "2023-01-01 09:05:07 UTC");
/// ```
pub fn format_scan_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
