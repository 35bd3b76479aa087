//! Time helpers shared by the lifecycle and usage code.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Duration of `days` whole days.
#[inline]
pub(crate) fn days(days: u32) -> Duration {
    Duration::days(i64::from(days))
}

/// Whether two instants fall in the same calendar month (UTC).
#[inline]
pub(crate) fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_days() {
        assert_eq!(days(14).num_seconds(), 14 * 86_400);
        assert_eq!(days(0).num_seconds(), 0);
    }

    #[test]
    fn test_same_month() {
        let a = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let d = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert!(same_month(a, b));
        assert!(!same_month(b, c));
        assert!(!same_month(a, d));
    }
}
