use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

/// One calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    /// The month containing `ts` (UTC).
    pub fn containing(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    /// The following calendar month. Works on the month number alone, so
    /// short months never skip or repeat a bucket.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Short display label, e.g. `Jan 2024`.
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|first| first.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}", self.year, self.month))
    }
}

/// Closed time range `[start, end]` ending at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    /// The `days` days ending at `end`. Saturates at the earliest
    /// representable instant instead of overflowing.
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Every calendar month from the one containing `start` through the one
    /// containing `end`, ascending. Never empty.
    pub fn buckets(&self) -> Vec<MonthBucket> {
        let last = MonthBucket::containing(self.end);
        let mut current = MonthBucket::containing(self.start);
        let mut months = vec![current];

        while current < last {
            current = current.next();
            months.push(current);
        }

        months
    }
}

/// Monthly buckets for the window of `window_days` days ending at `window_end`.
pub fn build_monthly_buckets(window_end: DateTime<Utc>, window_days: u32) -> Vec<MonthBucket> {
    UsageWindow::trailing(window_end, window_days).buckets()
}
