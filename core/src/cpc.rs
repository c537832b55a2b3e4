//! Cost-per-click sampling with fallback windows.
//!
//! CPCs feed budget formulas, so they are always rounded UP to two
//! decimals — the bias must never under-budget a campaign.

use crate::error::PacingResult;
use crate::platform::{AdPlatform, StatsWindow};
use crate::types::AccountId;

/// Round up to 2 decimal places.
pub fn ceil_2dp(value: f64) -> f64 {
    // Tolerate f64 representation noise just below an integer.
    ((value * 100.0) - 1e-9).ceil().max(0.0) / 100.0
}

/// Average CPC for a campaign over the requested window, rounded up.
/// A zero CPC (no spend or clicks recorded) resamples over the
/// all-time window. None means no clicks were ever generated — a
/// hard anomaly; the caller must alert and exclude the campaign from
/// this cycle's allocation.
pub fn sample(
    platform: &dyn AdPlatform,
    account: &AccountId,
    campaign: &str,
    window: StatsWindow,
) -> PacingResult<Option<f64>> {
    let cpc = ceil_2dp(platform.campaign_stats(account, campaign, window)?.avg_cpc);
    if cpc > 0.0 {
        return Ok(Some(cpc));
    }
    let all_time = ceil_2dp(
        platform
            .campaign_stats(account, campaign, StatsWindow::AllTime)?
            .avg_cpc,
    );
    if all_time > 0.0 {
        log::debug!("{campaign}: zero CPC in {window:?}, using all-time {all_time}");
        Ok(Some(all_time))
    } else {
        Ok(None)
    }
}

/// Raw CPC for a window with all-time fallback, without the caller
/// treating zero as an anomaly. Used by month-start selection where
/// a zero simply disqualifies the campaign.
pub fn sample_or_zero(
    platform: &dyn AdPlatform,
    account: &AccountId,
    campaign: &str,
    window: StatsWindow,
) -> PacingResult<f64> {
    Ok(sample(platform, account, campaign, window)?.unwrap_or(0.0))
}
