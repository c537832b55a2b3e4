//! Budget allocation — the core arithmetic of the engine.
//!
//! Given the click gap the platform channel must still close and the
//! CPCs of the currently enabled campaigns, compute per-campaign
//! daily budgets. With several campaigns, budget is shared by
//! inverse-CPC weight: cheaper clicks get the larger share, which
//! maximizes click yield per currency unit.

use serde::{Deserialize, Serialize};

use crate::types::Day;

/// One enabled campaign entering allocation.
#[derive(Debug, Clone)]
pub struct CampaignInput {
    pub name: String,
    /// Sampled average CPC, ceiling-rounded, strictly positive.
    pub cpc: f64,
    /// Yesterday's daily budget.
    pub budget_prev: f64,
}

#[derive(Debug, Clone)]
pub struct AllocationInputs {
    /// remaining total clicks − projected external clicks.
    pub clicks_gap: i64,
    /// False when the feed had no record for this account; budgets
    /// then target the platform sub-goal alone.
    pub external_data_present: bool,
    pub goal_platform: i64,
    pub clicks_platform: i64,
    /// Month-to-date accumulated cost.
    pub cost: f64,
    /// Pessimism-adjusted days remaining, ≥ 1.
    pub days_remaining: Day,
}

/// Computed budget for one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLine {
    pub campaign: String,
    pub cpc: f64,
    pub budget_prev: f64,
    pub budget_new: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub lines: Vec<AllocationLine>,
    /// Platform clicks expected by month end under the new budgets.
    pub projected_platform_new: i64,
    /// Total cost expected by month end under the new budgets.
    pub projected_cost: f64,
}

/// Full record of one allocation pass, the unit consumed by
/// alerting and the persisted daily report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub op: String,
    pub account: String,
    pub lines: Vec<AllocationLine>,
    pub clicks_platform: i64,
    pub clicks_external: Option<i64>,
    pub goal_platform: i64,
    pub goal_external: i64,
    pub goal_total: i64,
    /// End-of-month clicks projected from the previous budgets.
    pub projected_platform_old: i64,
    pub projected_external_old: i64,
    /// End-of-month clicks projected from the new budgets.
    pub projected_platform_new: i64,
    pub projected_total_new: i64,
    pub cost: f64,
    pub projected_cost: f64,
}

/// Budgets never drop below CPC + 0.01 — at least one click per day
/// must stay affordable.
pub fn floor_at_cpc(budget: f64, cpc: f64) -> f64 {
    budget.max(cpc + 0.01)
}

pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Inverse-CPC weight of one campaign among N ≥ 2: the lower the
/// CPC, the larger the share. Weights sum to 1.
pub fn inverse_cpc_weight(cpc: f64, sum_cpc: f64, n: usize) -> f64 {
    (sum_cpc - cpc) / (sum_cpc * (n - 1) as f64)
}

/// Allocate budgets across the enabled campaigns. `campaigns` must
/// be non-empty with positive CPCs (zero-CPC campaigns are excluded
/// upstream by the sampler).
pub fn allocate(inputs: &AllocationInputs, campaigns: &[CampaignInput]) -> Allocation {
    assert!(!campaigns.is_empty(), "allocate() needs at least one campaign");
    if campaigns.len() == 1 {
        allocate_single(inputs, &campaigns[0])
    } else {
        allocate_multi(inputs, campaigns)
    }
}

fn allocate_single(inputs: &AllocationInputs, campaign: &CampaignInput) -> Allocation {
    let days = f64::from(inputs.days_remaining);
    let cpc = campaign.cpc;
    let gap_open = inputs.clicks_gap > 0 && inputs.external_data_present;

    let budget = if gap_open {
        // Close the gap, plus one extra click per day as margin.
        cpc * inputs.clicks_gap as f64 / days + cpc
    } else {
        // External channel covers the total: target the platform
        // sub-goal alone.
        (inputs.goal_platform - inputs.clicks_platform) as f64 / days * cpc + 0.01
    };
    let budget = floor_at_cpc(budget, cpc);

    let projected_platform_new =
        inputs.clicks_platform + crate::projection::clicks_for_budget(budget, cpc, inputs.days_remaining);
    let projected_cost = round_2dp(inputs.cost + budget * days);

    Allocation {
        lines: vec![AllocationLine {
            campaign: campaign.name.clone(),
            cpc,
            budget_prev: campaign.budget_prev,
            budget_new: budget,
        }],
        projected_platform_new,
        projected_cost,
    }
}

fn allocate_multi(inputs: &AllocationInputs, campaigns: &[CampaignInput]) -> Allocation {
    let n = campaigns.len();
    let days = f64::from(inputs.days_remaining);
    let sum_cpc: f64 = campaigns.iter().map(|c| c.cpc).sum();
    let avg_cpc = sum_cpc / n as f64;

    let target_clicks = if inputs.clicks_gap > 0 {
        inputs.clicks_gap
    } else {
        inputs.goal_platform - inputs.clicks_platform
    };

    let mut lines = Vec::with_capacity(n);
    for campaign in campaigns {
        let weight = inverse_cpc_weight(campaign.cpc, sum_cpc, n);
        let budget = target_clicks as f64 / days * avg_cpc * weight + 0.01;
        lines.push(AllocationLine {
            campaign: campaign.name.clone(),
            cpc: campaign.cpc,
            budget_prev: campaign.budget_prev,
            budget_new: floor_at_cpc(budget, campaign.cpc),
        });
    }

    let mut projected_platform_new = inputs.clicks_platform;
    let mut projected_cost = inputs.cost;
    for line in &lines {
        projected_platform_new += (line.budget_new / avg_cpc * days).round() as i64;
        projected_cost += line.budget_new / avg_cpc * days * line.cpc;
    }

    Allocation {
        lines,
        projected_platform_new,
        projected_cost: round_2dp(projected_cost),
    }
}

/// Last-day booster: budget = remaining clicks × trailing-week CPC ×
/// factor, per enabled campaign. Used manually when the total goal
/// would otherwise be missed.
pub fn maximized_budget(clicks_remaining: i64, cpc: f64, factor: f64) -> f64 {
    clicks_remaining.max(0) as f64 * cpc * factor
}
