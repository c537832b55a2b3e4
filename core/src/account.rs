//! Per-account snapshot — the unit of work for one daily cycle.
//!
//! Snapshots are rebuilt from live metrics on every run and never
//! persisted; durable state is carried by platform labels only.

use serde::{Deserialize, Serialize};

use crate::config::PacingConfig;
use crate::goal::{goals_for_tier, ClickGoals};
use crate::platform::{AccountRef, WindowStats};
use crate::types::AccountId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub name: String,
    /// Reference code parsed from campaign names; "N/A" when absent.
    pub op: String,
    pub tier: u32,
    pub clicks_platform: i64,
    /// None when the feed has no record for this account — distinct
    /// from a recorded zero.
    pub clicks_external: Option<i64>,
    pub surplus: i64,
    pub goals: ClickGoals,
    pub impressions: i64,
    pub cost: f64,
    pub ctr: f64,
}

impl AccountSnapshot {
    pub fn build(
        account: &AccountRef,
        op: String,
        tier: u32,
        stats: WindowStats,
        clicks_external: Option<i64>,
        surplus: Option<i64>,
        config: &PacingConfig,
    ) -> Self {
        if clicks_external.is_none() {
            log::warn!("{}: no external clicks data for {op}", account.name);
        }
        if surplus.is_none() {
            log::warn!("{}: no surplus entry for {op}, assuming 0", account.name);
        }
        let surplus = surplus.unwrap_or(0);
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            op,
            tier,
            clicks_platform: stats.clicks,
            clicks_external,
            surplus,
            goals: goals_for_tier(config, tier, surplus),
            impressions: stats.impressions,
            cost: stats.cost,
            ctr: stats.ctr,
        }
    }

    pub fn clicks_total(&self) -> i64 {
        self.clicks_platform + self.clicks_external.unwrap_or(0)
    }

    pub fn clicks_remaining(&self) -> i64 {
        self.goals.total() - self.clicks_total()
    }

    pub fn platform_goal_met(&self) -> bool {
        self.clicks_platform >= self.goals.platform
    }

    pub fn total_goal_met(&self) -> bool {
        self.platform_goal_met() && self.clicks_total() >= self.goals.total()
    }

    pub fn external_goal_met(&self) -> bool {
        self.clicks_external.unwrap_or(0) >= self.goals.external
    }
}

/// Extract the package tier from account labels: the first
/// contiguous digit run of the first label carrying one (e.g.
/// "Business 99", "Business 199 - 2024" → 199). Trailing digit
/// groups are decoration, never part of the tier.
pub fn tier_from_labels(labels: &[String]) -> Option<(u32, String)> {
    for label in labels {
        let Some(start) = label.find(|c: char| c.is_ascii_digit()) else {
            continue;
        };
        let run = &label[start..];
        let end = run
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(run.len());
        if let Ok(tier) = run[..end].parse::<u32>() {
            return Some((tier, label.clone()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parsed_from_package_label() {
        let labels = vec![
            "owner:MD".to_string(),
            "Business 199".to_string(),
            "PausedByScript".to_string(),
        ];
        assert_eq!(tier_from_labels(&labels), Some((199, "Business 199".to_string())));
    }

    #[test]
    fn tier_takes_the_first_digit_run_only() {
        let labels = vec!["Business 199 - 2024".to_string()];
        assert_eq!(
            tier_from_labels(&labels),
            Some((199, "Business 199 - 2024".to_string()))
        );
        let labels = vec!["49er promo 2".to_string()];
        assert_eq!(tier_from_labels(&labels), Some((49, "49er promo 2".to_string())));
    }

    #[test]
    fn no_numeric_label_means_no_tier() {
        let labels = vec!["Active".to_string(), "PausedByScript".to_string()];
        assert_eq!(tier_from_labels(&labels), None);
    }

    #[test]
    fn totals_treat_missing_external_as_zero() {
        let config = PacingConfig::default_test();
        let account = AccountRef { id: "a1".into(), name: "Acme d.o.o.".into() };
        let stats = WindowStats { clicks: 80, impressions: 4000, cost: 9.6, ctr: 0.02, avg_cpc: 0.12 };
        let snap = AccountSnapshot::build(&account, "OP0710307".into(), 99, stats, None, None, &config);
        assert_eq!(snap.clicks_total(), 80);
        assert_eq!(snap.goals.total(), 400);
        assert_eq!(snap.clicks_remaining(), 320);
        assert!(snap.platform_goal_met());
        assert!(!snap.total_goal_met());
    }
}
