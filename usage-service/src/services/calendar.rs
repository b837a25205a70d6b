//! Calendar-month windows for the twelve-month history.

use chrono::{DateTime, Datelike, Months, NaiveDate, Timelike, Utc};
use serde::Serialize;

/// Number of slots in the history: eleven closed months plus the live one.
pub const HISTORY_MONTHS: usize = 12;

/// Half-open month window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn containing(date: NaiveDate) -> Self {
        let start = first_of_month(date);
        Self {
            start,
            end: next_month(start),
        }
    }

    pub fn key(&self) -> (i32, u32) {
        (self.start.year(), self.start.month())
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after `date`.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX)
}

/// First day of the month eleven months before `today`.
pub fn start_of_coverage(today: NaiveDate) -> NaiveDate {
    first_of_month(today)
        .checked_sub_months(Months::new((HISTORY_MONTHS - 1) as u32))
        .unwrap_or(NaiveDate::MIN)
}

/// The twelve contiguous month windows ending with the month of `today`.
///
/// Generation stops once a window would end after the first day of the
/// month following `today`.
pub fn coverage_windows(today: NaiveDate) -> Vec<MonthWindow> {
    let final_end = next_month(today);
    let mut windows = Vec::with_capacity(HISTORY_MONTHS);
    let mut start = start_of_coverage(today);

    while windows.len() < HISTORY_MONTHS {
        let end = next_month(start);
        if end > final_end {
            break;
        }
        windows.push(MonthWindow { start, end });
        start = end;
    }

    windows
}

/// Whole hours elapsed since the first instant of `now`'s month. Partial
/// hours are not counted.
pub fn elapsed_hours_in_month(now: DateTime<Utc>) -> i64 {
    i64::from(now.day() - 1) * 24 + i64::from(now.hour())
}
