//! # Reporting Periods
//!
//! A [`Period`] is a half-open range of calendar days `[start, end)`.
//! Sales belong to the UTC day of their `created_at`; receivables and
//! payables belong to their `paid_date` (or `due_date`, depending on the
//! report).
//!
//! ```text
//!   month_of(2026-10-16)      = [2026-10-01, 2026-11-01)
//!   last_days(2026-10-16, 7)  = [2026-10-10, 2026-10-17)
//!   trailing_months(.., 3)    = [Aug, Sep, Oct]   (oldest first)
//! ```

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Period {
    /// First day included.
    #[ts(as = "String")]
    pub start: NaiveDate,
    /// First day excluded.
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl Period {
    /// Rejects ranges where `end` is not after `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        if end <= start {
            return Err(ValidationError::invalid("period", "end must be after start"));
        }
        Ok(Self { start, end })
    }

    /// Inclusive constructor for UI date pickers (`from..=to`).
    pub fn inclusive(from: NaiveDate, to: NaiveDate) -> ValidationResult<Self> {
        let end = to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ValidationError::invalid("period", "date out of range"))?;
        Self::new(from, end)
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date.succ_opt().unwrap_or(NaiveDate::MAX),
        }
    }

    /// The `n` days ending today, today included.
    pub fn last_days(today: NaiveDate, n: u32) -> Self {
        let n = n.max(1);
        Self {
            start: today
                .checked_sub_days(Days::new(u64::from(n - 1)))
                .unwrap_or(NaiveDate::MIN),
            end: today.succ_opt().unwrap_or(NaiveDate::MAX),
        }
    }

    /// Calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self::month_offset(date, 0)
    }

    /// Calendar month `delta` months away from the one containing `date`.
    pub fn month_offset(date: NaiveDate, delta: i32) -> Self {
        let (y, m) = shift_month(date.year(), date.month(), delta);
        let (ny, nm) = shift_month(y, m, 1);
        Self {
            start: first_of(y, m),
            end: first_of(ny, nm),
        }
    }

    /// `n` consecutive months ending with the month of `today`, oldest first.
    pub fn trailing_months(today: NaiveDate, n: u32) -> Vec<Self> {
        let n = n as i32;
        (0..n).map(|i| Self::month_offset(today, i - (n - 1))).collect()
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    #[inline]
    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        self.contains(at.date_naive())
    }

    /// Midnight UTC of `start`; lower bound for timestamp queries.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC of `end`; exclusive upper bound for timestamp queries.
    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc()
    }

    /// Days covered, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d < self.end)
    }

    /// "YYYY-MM" of the start day, used as the label of monthly buckets.
    pub fn month_label(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month())
    }
}

/// Named ranges offered by the cash-flow screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPreset {
    Today,
    Last7Days,
    CurrentMonth,
}

impl PeriodPreset {
    pub fn resolve(&self, today: NaiveDate) -> Period {
        match self {
            PeriodPreset::Today => Period::day(today),
            PeriodPreset::Last7Days => Period::last_days(today, 7),
            PeriodPreset::CurrentMonth => Period::month_of(today),
        }
    }
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn first_of(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}
