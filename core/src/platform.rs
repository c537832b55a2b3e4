//! Collaborator seams — the ad platform, the external click feed,
//! and email dispatch.
//!
//! RULE: The engine touches external systems only through these
//! traits. Labels are best-effort boolean flags: absence is `false`,
//! and removing an absent label is a no-op, never an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PacingResult;
use crate::types::AccountId;

/// Lookback window for a stats query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatsWindow {
    ThisMonth,
    LastMonth,
    Last7Days,
    AllTime,
}

/// One stats row: impressions, clicks, accumulated cost, CTR, and
/// the average cost-per-click over the window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
    pub ctr: f64,
    pub avg_cpc: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: AccountId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub name: String,
    pub enabled: bool,
    pub end_date: Option<NaiveDate>,
}

/// Account / campaign / budget access on the managed ad platform.
///
/// Budgets are associated to campaigns by name convention: a
/// campaign's daily budget carries the campaign's name.
pub trait AdPlatform {
    fn accounts_with_label(&self, label: &str) -> PacingResult<Vec<AccountRef>>;

    fn campaigns(&self, account: &AccountId) -> PacingResult<Vec<CampaignRecord>>;

    fn account_stats(&self, account: &AccountId, window: StatsWindow) -> PacingResult<WindowStats>;

    fn campaign_stats(
        &self,
        account: &AccountId,
        campaign: &str,
        window: StatsWindow,
    ) -> PacingResult<WindowStats>;

    fn enable_campaign(&mut self, account: &AccountId, campaign: &str) -> PacingResult<()>;

    fn pause_campaign(&mut self, account: &AccountId, campaign: &str) -> PacingResult<()>;

    /// Daily budget by name, or None when no such budget exists.
    fn budget_amount(&self, account: &AccountId, budget_name: &str) -> PacingResult<Option<f64>>;

    fn set_budget_amount(
        &mut self,
        account: &AccountId,
        budget_name: &str,
        amount: f64,
    ) -> PacingResult<()>;

    fn labels(&self, account: &AccountId) -> PacingResult<Vec<String>>;

    fn has_label(&self, account: &AccountId, label: &str) -> PacingResult<bool> {
        Ok(self.labels(account)?.iter().any(|l| l == label))
    }

    fn apply_label(&mut self, account: &AccountId, label: &str) -> PacingResult<()>;

    /// Remove a label if present; absent labels are ignored.
    fn remove_label(&mut self, account: &AccountId, label: &str) -> PacingResult<()>;
}

/// One record of the external click feed, matched by reference code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub op: String,
    pub clicks: FeedClicks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedClicks {
    pub sum: i64,
}

/// The external click-data endpoint. Fetched exactly once per run;
/// the result is reused across all accounts.
pub trait ClickFeed {
    fn fetch(&self) -> PacingResult<Vec<FeedRecord>>;
}

/// Look up external clicks for a reference code in a fetched feed.
/// None means the feed carries no record for this account.
pub fn feed_clicks_for(feed: &[FeedRecord], op: &str) -> Option<i64> {
    feed.iter().find(|r| r.op == op).map(|r| r.clicks.sum)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Fire-and-forget email dispatch; no delivery confirmation is
/// consumed by the engine.
pub trait Mailer {
    fn send(&mut self, message: &EmailMessage) -> PacingResult<()>;
}
