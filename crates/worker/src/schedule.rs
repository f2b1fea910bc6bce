//! Wall-clock schedules for periodic jobs.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// When a periodic job fires. All times are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum Schedule {
    /// Once a day at a fixed time.
    Day { at: NaiveTime },
    /// Once a week on a fixed weekday and time.
    Week { weekday: Weekday, at: NaiveTime },
    /// Fixed period from whenever the job last fired.
    Interval { secs: u64 },
}

impl Schedule {
    pub fn daily(at: NaiveTime) -> Self {
        Self::Day { at }
    }

    pub fn weekly(weekday: Weekday, at: NaiveTime) -> Self {
        Self::Week { weekday, at }
    }

    pub fn every(secs: u64) -> Self {
        Self::Interval { secs }
    }

    /// First firing time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::Day { at } => {
                let today = now.date_naive().and_time(at).and_utc();
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Self::Week { weekday, at } => {
                let ahead = (7 + weekday.num_days_from_monday()
                    - now.weekday().num_days_from_monday())
                    % 7;
                let candidate = (now.date_naive() + Duration::days(i64::from(ahead)))
                    .and_time(at)
                    .and_utc();
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
            Self::Interval { secs } => now + Duration::seconds(secs.max(1) as i64),
        }
    }

    /// Time to wait from `now` until the next firing.
    pub fn until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}
