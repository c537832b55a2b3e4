//! End-of-month click projections from the month-to-date run rate.

use crate::types::Day;

/// Clicks per day so far. `days_running` is guaranteed ≥ 1 by the
/// schedule (projections are only taken from day 2 onward); a zero
/// divisor still maps to 0 rather than infinity.
pub fn per_day_rate(clicks: i64, days_running: Day) -> f64 {
    if days_running == 0 {
        return 0.0;
    }
    clicks as f64 / f64::from(days_running)
}

/// Clicks projected for the rest of the month, floored.
/// Non-finite intermediate values normalize to 0.
pub fn projected_clicks(clicks: i64, days_running: Day, days_remaining: Day) -> i64 {
    let projected = per_day_rate(clicks, days_running) * f64::from(days_remaining);
    if projected.is_finite() {
        projected.floor() as i64
    } else {
        0
    }
}

/// Clicks a budget can buy over the remaining days, floored.
/// A zero CPC (no clicks yet) normalizes to 0 instead of infinity.
pub fn clicks_for_budget(budget: f64, cpc: f64, days_remaining: Day) -> i64 {
    let projected = budget / cpc * f64::from(days_remaining);
    if projected.is_finite() {
        projected.floor() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_rate_times_days_floored() {
        // 50 clicks over 10 days, 20 effective days left → 100.
        assert_eq!(projected_clicks(50, 10, 20), 100);
        // 7/3 per day over 11 days → floor(25.66) = 25.
        assert_eq!(projected_clicks(7, 3, 11), 25);
    }

    #[test]
    fn zero_days_running_projects_zero() {
        assert_eq!(projected_clicks(50, 0, 20), 0);
    }

    #[test]
    fn zero_cpc_normalizes_to_zero_clicks() {
        assert_eq!(clicks_for_budget(1.50, 0.0, 10), 0);
        assert_eq!(clicks_for_budget(1.50, 0.10, 10), 150);
    }
}
