//! Calendar bookkeeping for a single daily run.
//!
//! All pacing math is anchored to the day of month: campaigns are
//! assumed to start on day 1, so `days_running` equals the current
//! day. Days remaining are floored at 1 on the last day, and the
//! pacing divisor drops one extra day whenever more than one day is
//! left — the month is deliberately treated as one day shorter.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::Day;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthContext {
    pub date: NaiveDate,
    pub day: Day,
    pub days_in_month: Day,
}

impl MonthContext {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            day: date.day(),
            days_in_month: days_in_month(date),
        }
    }

    /// Days the campaigns have been running this month (day 1 start).
    pub fn days_running(&self) -> Day {
        self.day
    }

    /// Calendar days left in the month, never below 1.
    pub fn days_remaining(&self) -> Day {
        (self.days_in_month.saturating_sub(self.day)).max(1)
    }

    /// Days remaining with the pessimism margin applied: one day is
    /// dropped unless only a single day is left.
    pub fn effective_days_remaining(&self) -> Day {
        let remaining = self.days_remaining();
        if remaining > 1 {
            remaining - 1
        } else {
            remaining
        }
    }

    /// First day of the previous month, for trailing-month reports.
    pub fn previous_month(&self) -> NaiveDate {
        let first = self.date.with_day(1).expect("day 1 always valid");
        first.pred_opt().unwrap_or(first).with_day(1).expect("day 1 always valid")
    }
}

fn days_in_month(date: NaiveDate) -> Day {
    let (year, month) = (date.year(), date.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(y: i32, m: u32, d: u32) -> MonthContext {
        MonthContext::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn days_in_month_handles_short_and_long_months() {
        assert_eq!(ctx(2018, 6, 10).days_in_month, 30);
        assert_eq!(ctx(2018, 7, 10).days_in_month, 31);
        assert_eq!(ctx(2020, 2, 10).days_in_month, 29);
        assert_eq!(ctx(2018, 12, 10).days_in_month, 31);
    }

    #[test]
    fn days_remaining_floors_at_one_on_last_day() {
        assert_eq!(ctx(2018, 6, 30).days_remaining(), 1);
        assert_eq!(ctx(2018, 6, 29).days_remaining(), 1);
        assert_eq!(ctx(2018, 6, 10).days_remaining(), 20);
    }

    #[test]
    fn pessimism_margin_skips_the_last_day() {
        assert_eq!(ctx(2018, 6, 10).effective_days_remaining(), 19);
        assert_eq!(ctx(2018, 6, 29).effective_days_remaining(), 1);
        assert_eq!(ctx(2018, 6, 30).effective_days_remaining(), 1);
    }

    #[test]
    fn previous_month_is_first_of_prior_month() {
        assert_eq!(
            ctx(2018, 6, 15).previous_month(),
            NaiveDate::from_ymd_opt(2018, 5, 1).unwrap()
        );
        assert_eq!(
            ctx(2018, 1, 2).previous_month(),
            NaiveDate::from_ymd_opt(2017, 12, 1).unwrap()
        );
    }
}
