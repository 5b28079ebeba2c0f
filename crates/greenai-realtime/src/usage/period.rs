//! Billing period boundaries for usage counters.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};

/// How counters are bucketed in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodPolicy {
    /// One period per UTC calendar month.
    CalendarMonth,
    /// Fixed windows of this many seconds, aligned to the Unix epoch.
    FixedWindow(u64),
}

impl PeriodPolicy {
    /// First instant of the period containing `at`.
    pub fn period_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::CalendarMonth => Utc
                .with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(at),
            Self::FixedWindow(secs) => {
                let secs = secs.max(1) as i64;
                let ts = at.timestamp();
                DateTime::from_timestamp(ts - ts.rem_euclid(secs), 0).unwrap_or(at)
            }
        }
    }

    /// Start of the period `n` periods before the one containing `at`.
    pub fn periods_back(&self, at: DateTime<Utc>, n: u32) -> DateTime<Utc> {
        let start = self.period_start(at);
        match *self {
            Self::CalendarMonth => start
                .checked_sub_months(Months::new(n))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            Self::FixedWindow(secs) => {
                start - chrono::Duration::seconds(secs.max(1) as i64 * i64::from(n))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_calendar_month_start() {
        let policy = PeriodPolicy::CalendarMonth;
        assert_eq!(policy.period_start(at(2025, 3, 31, 23, 59, 59)), at(2025, 3, 1, 0, 0, 0));
        assert_eq!(policy.period_start(at(2025, 4, 1, 0, 0, 0)), at(2025, 4, 1, 0, 0, 0));
    }

    #[test]
    fn test_calendar_months_back_crosses_year() {
        let policy = PeriodPolicy::CalendarMonth;
        assert_eq!(policy.periods_back(at(2025, 2, 14, 8, 0, 0), 3), at(2024, 11, 1, 0, 0, 0));
    }

    #[test]
    fn test_fixed_window_alignment() {
        let policy = PeriodPolicy::FixedWindow(60);
        assert_eq!(policy.period_start(at(2025, 1, 1, 10, 5, 42)), at(2025, 1, 1, 10, 5, 0));
        assert_eq!(policy.periods_back(at(2025, 1, 1, 10, 5, 42), 2), at(2025, 1, 1, 10, 3, 0));
    }
}
