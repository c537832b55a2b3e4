//! In-memory implementations of the collaborator seams.
//!
//! Used by the test suite and by the runner's fixture mode: a JSON
//! fixture describes accounts, campaigns, per-window stats, and the
//! external feed, and the engine runs against it exactly as it would
//! against the live platform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PacingError, PacingResult};
use crate::platform::{
    AccountRef, AdPlatform, CampaignRecord, ClickFeed, EmailMessage, FeedRecord, Mailer,
    StatsWindow, WindowStats,
};
use crate::types::AccountId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCampaign {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Daily budget by name convention; None = no budget exists.
    #[serde(default)]
    pub budget: Option<f64>,
    /// Stats per lookback window; missing windows read as all-zero.
    #[serde(default)]
    pub stats: HashMap<StatsWindow, WindowStats>,
}

impl MemoryCampaign {
    pub fn stats_for(&self, window: StatsWindow) -> WindowStats {
        self.stats.get(&window).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAccount {
    pub id: AccountId,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub campaigns: Vec<MemoryCampaign>,
}

/// The whole managed platform as plain data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPlatform {
    pub accounts: Vec<MemoryAccount>,
}

impl MemoryPlatform {
    pub fn new(accounts: Vec<MemoryAccount>) -> Self {
        Self { accounts }
    }

    pub fn account(&self, id: &str) -> PacingResult<&MemoryAccount> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| PacingError::AccountNotFound { name: id.to_string() })
    }

    fn account_mut(&mut self, id: &str) -> PacingResult<&mut MemoryAccount> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PacingError::AccountNotFound { name: id.to_string() })
    }

    fn campaign(&self, account: &str, name: &str) -> PacingResult<&MemoryCampaign> {
        self.account(account)?
            .campaigns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PacingError::CampaignNotFound { name: name.to_string() })
    }

    fn campaign_mut(&mut self, account: &str, name: &str) -> PacingResult<&mut MemoryCampaign> {
        self.account_mut(account)?
            .campaigns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| PacingError::CampaignNotFound { name: name.to_string() })
    }
}

impl AdPlatform for MemoryPlatform {
    fn accounts_with_label(&self, label: &str) -> PacingResult<Vec<AccountRef>> {
        Ok(self
            .accounts
            .iter()
            .filter(|a| a.labels.iter().any(|l| l == label))
            .map(|a| AccountRef { id: a.id.clone(), name: a.name.clone() })
            .collect())
    }

    fn campaigns(&self, account: &AccountId) -> PacingResult<Vec<CampaignRecord>> {
        Ok(self
            .account(account)?
            .campaigns
            .iter()
            .map(|c| CampaignRecord {
                name: c.name.clone(),
                enabled: c.enabled,
                end_date: c.end_date,
            })
            .collect())
    }

    fn account_stats(&self, account: &AccountId, window: StatsWindow) -> PacingResult<WindowStats> {
        let mut total = WindowStats::default();
        for campaign in &self.account(account)?.campaigns {
            let stats = campaign.stats_for(window);
            total.impressions += stats.impressions;
            total.clicks += stats.clicks;
            total.cost += stats.cost;
        }
        if total.impressions > 0 {
            total.ctr = total.clicks as f64 / total.impressions as f64;
        }
        if total.clicks > 0 {
            total.avg_cpc = total.cost / total.clicks as f64;
        }
        Ok(total)
    }

    fn campaign_stats(
        &self,
        account: &AccountId,
        campaign: &str,
        window: StatsWindow,
    ) -> PacingResult<WindowStats> {
        Ok(self.campaign(account, campaign)?.stats_for(window))
    }

    fn enable_campaign(&mut self, account: &AccountId, campaign: &str) -> PacingResult<()> {
        self.campaign_mut(account, campaign)?.enabled = true;
        Ok(())
    }

    fn pause_campaign(&mut self, account: &AccountId, campaign: &str) -> PacingResult<()> {
        self.campaign_mut(account, campaign)?.enabled = false;
        Ok(())
    }

    fn budget_amount(&self, account: &AccountId, budget_name: &str) -> PacingResult<Option<f64>> {
        Ok(self.campaign(account, budget_name)?.budget)
    }

    fn set_budget_amount(
        &mut self,
        account: &AccountId,
        budget_name: &str,
        amount: f64,
    ) -> PacingResult<()> {
        let campaign = self.campaign_mut(account, budget_name)?;
        if campaign.budget.is_none() {
            return Err(PacingError::BudgetNotFound { name: budget_name.to_string() });
        }
        campaign.budget = Some(amount);
        Ok(())
    }

    fn labels(&self, account: &AccountId) -> PacingResult<Vec<String>> {
        Ok(self.account(account)?.labels.clone())
    }

    fn apply_label(&mut self, account: &AccountId, label: &str) -> PacingResult<()> {
        let account = self.account_mut(account)?;
        if !account.labels.iter().any(|l| l == label) {
            account.labels.push(label.to_string());
        }
        Ok(())
    }

    fn remove_label(&mut self, account: &AccountId, label: &str) -> PacingResult<()> {
        self.account_mut(account)?.labels.retain(|l| l != label);
        Ok(())
    }
}

/// A click feed with fixed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFeed {
    pub records: Vec<FeedRecord>,
}

impl ClickFeed for StaticFeed {
    fn fetch(&self) -> PacingResult<Vec<FeedRecord>> {
        Ok(self.records.clone())
    }
}

/// Collects outgoing mail instead of delivering it.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    pub sent: Vec<EmailMessage>,
}

impl Mailer for MemoryMailer {
    fn send(&mut self, message: &EmailMessage) -> PacingResult<()> {
        log::debug!("mail to {}: {}", message.recipient, message.subject);
        self.sent.push(message.clone());
        Ok(())
    }
}

/// A complete runnable scenario: platform state plus feed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub accounts: Vec<MemoryAccount>,
    #[serde(default)]
    pub feed: Vec<FeedRecord>,
}

impl Fixture {
    pub fn from_json(json: &str) -> PacingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_parts(self) -> (MemoryPlatform, StaticFeed) {
        (
            MemoryPlatform::new(self.accounts),
            StaticFeed { records: self.feed },
        )
    }
}
