//! The daily budget-adjustment decision engine.
//!
//! Evaluated once per account per day from the configured start day.
//! Decision order (fixed, never reordered):
//!   1. Underperformance check — may switch the other channel on.
//!   2. External-goal-reached alert (once per month).
//!   3. Resume-from-pause: stop, reactivate, or hold.
//!   4. Stop: total goal met → pause all, StoppedByScript.
//!   5. Pause: platform goal met, external projected to cover the
//!      rest → pause all, PausedByScript.
//!   6. Otherwise: allocate new daily budgets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::account::AccountSnapshot;
use crate::allocator::{self, AllocationInputs, AllocationSnapshot, CampaignInput};
use crate::calendar::MonthContext;
use crate::config::PacingConfig;
use crate::cpc;
use crate::error::PacingResult;
use crate::event::PacingEvent;
use crate::platform::{AdPlatform, StatsWindow};
use crate::projection;
use crate::state::{self, AccountState, LABEL_EXTERNAL_EMAIL_SENT, LABEL_TOTAL_EMAIL_SENT};
use crate::types::{parse_op, AccountId, CampaignKind};

/// Snapshot metrics returned when an account is paused or stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PausedMetrics {
    pub clicks_platform: i64,
    pub cost: f64,
    pub impressions: i64,
    pub ctr: f64,
}

/// Which channels currently have an enabled campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningKinds {
    Search,
    Display,
    Both,
    None,
}

/// Campaigns flipped by a channel switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchOutcome {
    pub enabled: Vec<String>,
    pub paused: Vec<String>,
}

/// Result of one daily evaluation.
#[derive(Debug, Clone)]
pub enum AdjustOutcome {
    /// Total goal met; campaigns paused for the rest of the month.
    Stopped(PausedMetrics),
    /// Platform goal met, external channel projected to cover the
    /// rest; campaigns paused, subject to daily re-evaluation.
    Paused(PausedMetrics),
    /// Budgets recomputed and written.
    Adjusted(AllocationSnapshot),
    /// Remained paused — external projection still covers the goal.
    Held,
    /// Nothing allocatable this cycle (no usable campaign/budget).
    Skipped,
}

/// Email idempotence flags, read from labels at the start of the
/// account's cycle and written back as alerts fire.
#[derive(Debug, Clone, Copy)]
pub struct EmailFlags {
    pub total_sent: bool,
    pub external_sent: bool,
}

impl EmailFlags {
    pub fn read(platform: &dyn AdPlatform, account: &AccountId) -> PacingResult<Self> {
        Ok(Self {
            total_sent: platform.has_label(account, LABEL_TOTAL_EMAIL_SENT)?,
            external_sent: platform.has_label(account, LABEL_EXTERNAL_EMAIL_SENT)?,
        })
    }
}

/// One daily evaluation for one account. `state` is the account's
/// state on entry (Active or PausedByScript; Stopped accounts are
/// filtered out by the engine loop).
#[allow(clippy::too_many_lines)]
pub fn adjust_budget(
    platform: &mut dyn AdPlatform,
    config: &PacingConfig,
    account: &AccountSnapshot,
    entry_state: AccountState,
    flags: &mut EmailFlags,
    month: &MonthContext,
    events: &mut Vec<PacingEvent>,
) -> PacingResult<AdjustOutcome> {
    let days_running = month.days_running();
    let days_remaining = month.effective_days_remaining();
    let clicks_remaining = account.clicks_remaining();
    let projected_external = projection::projected_clicks(
        account.clicks_external.unwrap_or(0),
        days_running,
        days_remaining,
    );

    // 1. Underperformance: only near month end, and only while a
    // positive goal exists to measure against.
    if month.days_remaining() <= config.thresholds.underperformance_window_days
        && account.goals.total() > 0
    {
        let attainment = account.clicks_total() as f64 / account.goals.total() as f64;
        let pace =
            f64::from(days_running) / f64::from(days_running + days_remaining - 1);
        if attainment / pace < config.thresholds.underperformance_ratio {
            let activated = match running_kinds(platform, &account.id)? {
                RunningKinds::Search => {
                    start_kind_campaigns(platform, &account.id, CampaignKind::Display)?;
                    Some(CampaignKind::Display)
                }
                RunningKinds::Display => {
                    start_kind_campaigns(platform, &account.id, CampaignKind::Search)?;
                    Some(CampaignKind::Search)
                }
                RunningKinds::Both | RunningKinds::None => None,
            };
            events.push(PacingEvent::Underperforming {
                account: account.name.clone(),
                clicks_total: account.clicks_total(),
                goal_total: account.goals.total(),
                performance_pct: (attainment / pace * 100.0).round() as i64,
                activated,
            });
        }
    }

    // 2. External sub-goal reached, alert once per month.
    if account.external_goal_met() && !flags.external_sent {
        platform.apply_label(&account.id, LABEL_EXTERNAL_EMAIL_SENT)?;
        flags.external_sent = true;
        events.push(PacingEvent::ExternalGoalReached {
            account: account.name.clone(),
            clicks: account.clicks_external.unwrap_or(0),
            goal: account.goals.external,
        });
    }

    // 3. Previously paused by the engine.
    if entry_state == AccountState::PausedByScript {
        if account.total_goal_met() {
            state::mark_stopped(platform, &account.id)?;
            push_total_goal_event(platform, account, flags, events)?;
            return Ok(AdjustOutcome::Stopped(paused_metrics(account)));
        }
        if projected_external < clicks_remaining {
            // External channel alone will no longer make the goal.
            if let Some(campaign) = start_lowest_cpc_campaign(platform, &account.id)? {
                events.push(PacingEvent::AccountReactivated {
                    account: account.name.clone(),
                    campaign,
                    date: month.date,
                });
            }
            // Reactivated: fall through to the budget recompute.
        } else {
            return Ok(AdjustOutcome::Held);
        }
    }

    // 4. Stop: both the platform sub-goal and the total goal are met.
    if account.total_goal_met() {
        pause_all_campaigns(platform, &account.id)?;
        state::mark_stopped(platform, &account.id)?;
        push_total_goal_event(platform, account, flags, events)?;
        return Ok(AdjustOutcome::Stopped(paused_metrics(account)));
    }

    // 5. Pause: platform sub-goal met and the external run rate is
    // projected to close the rest on its own. No email — the final,
    // user-visible alert belongs to the stop transition.
    if account.platform_goal_met() && projected_external >= clicks_remaining {
        pause_all_campaigns(platform, &account.id)?;
        state::mark_paused(platform, &account.id)?;
        events.push(PacingEvent::AccountPaused {
            account: account.name.clone(),
            op: account.op.clone(),
            clicks_platform: account.clicks_platform,
            cost: account.cost,
            impressions: account.impressions,
            ctr: account.ctr,
        });
        return Ok(AdjustOutcome::Paused(paused_metrics(account)));
    }

    // 6. Recompute budgets to close the gap the external channel
    // leaves open.
    let clicks_gap = clicks_remaining - projected_external;

    let mut no_cpc_alerted: Vec<String> = Vec::new();
    let mut sampled =
        collect_enabled_cpcs(platform, account, StatsWindow::ThisMonth, &mut no_cpc_alerted, events)?;

    // Ceiling check: an over-cost campaign is switched to the other
    // channel within the same OP group. A switch invalidates the
    // sampled set, so it is re-collected once afterwards over the
    // all-time window — scoped here, never carried across cycles.
    let mut switched = false;
    for (name, sampled_cpc) in sampled.clone() {
        if sampled_cpc > config.thresholds.cpc_ceiling {
            let outcome = switch_campaigns(platform, account, &name, config)?;
            let (enabled, paused) = match &outcome {
                Some(o) => {
                    switched = true;
                    (o.enabled.clone(), o.paused.clone())
                }
                None => (Vec::new(), Vec::new()),
            };
            events.push(PacingEvent::CpcOverCeiling {
                account: account.name.clone(),
                campaign: name,
                cpc: sampled_cpc,
                enabled,
                paused,
            });
        }
    }
    if switched {
        sampled =
            collect_enabled_cpcs(platform, account, StatsWindow::AllTime, &mut no_cpc_alerted, events)?;
    }

    // Attach budgets by name convention; campaigns without a budget
    // drop out of allocation (next run re-converges).
    let mut inputs_campaigns: Vec<CampaignInput> = Vec::new();
    for (name, sampled_cpc) in sampled {
        match platform.budget_amount(&account.id, &name)? {
            Some(budget_prev) => inputs_campaigns.push(CampaignInput {
                name,
                cpc: sampled_cpc,
                budget_prev,
            }),
            None => log::warn!("{}: no budget named '{name}', skipping", account.name),
        }
    }
    if inputs_campaigns.is_empty() {
        log::warn!("{}: nothing to allocate this cycle", account.name);
        return Ok(AdjustOutcome::Skipped);
    }

    let inputs = AllocationInputs {
        clicks_gap,
        external_data_present: account.clicks_external.is_some(),
        goal_platform: account.goals.platform,
        clicks_platform: account.clicks_platform,
        cost: account.cost,
        days_remaining,
    };
    let allocation = allocator::allocate(&inputs, &inputs_campaigns);

    for line in &allocation.lines {
        platform.set_budget_amount(&account.id, &line.campaign, line.budget_new)?;
        log::info!(
            "{}: budget {} {:.2} -> {:.2}",
            account.name,
            line.campaign,
            line.budget_prev,
            line.budget_new
        );
    }

    // Old projection: budget-based for a single campaign, run-rate
    // based across several.
    let projected_platform_old = if allocation.lines.len() == 1 {
        let line = &allocation.lines[0];
        account.clicks_platform
            + projection::clicks_for_budget(line.budget_prev, line.cpc, days_remaining)
    } else {
        account.clicks_platform
            + projection::projected_clicks(account.clicks_platform, days_running, days_remaining)
    };
    let projected_external_old = account.clicks_external.unwrap_or(0) + projected_external;

    let snapshot = AllocationSnapshot {
        op: account.op.clone(),
        account: account.name.clone(),
        lines: allocation.lines,
        clicks_platform: account.clicks_platform,
        clicks_external: account.clicks_external,
        goal_platform: account.goals.platform,
        goal_external: account.goals.external,
        goal_total: account.goals.total(),
        projected_platform_old,
        projected_external_old,
        projected_platform_new: allocation.projected_platform_new,
        projected_total_new: allocation.projected_platform_new + projected_external_old,
        cost: account.cost,
        projected_cost: allocation.projected_cost,
    };
    events.push(PacingEvent::BudgetAdjusted { snapshot: snapshot.clone() });
    Ok(AdjustOutcome::Adjusted(snapshot))
}

fn paused_metrics(account: &AccountSnapshot) -> PausedMetrics {
    PausedMetrics {
        clicks_platform: account.clicks_platform,
        cost: account.cost,
        impressions: account.impressions,
        ctr: account.ctr,
    }
}

fn push_total_goal_event(
    platform: &mut dyn AdPlatform,
    account: &AccountSnapshot,
    flags: &mut EmailFlags,
    events: &mut Vec<PacingEvent>,
) -> PacingResult<()> {
    if !flags.total_sent {
        platform.apply_label(&account.id, LABEL_TOTAL_EMAIL_SENT)?;
        flags.total_sent = true;
        events.push(PacingEvent::TotalGoalReached {
            account: account.name.clone(),
            clicks: account.clicks_total(),
            goal: account.goals.total(),
        });
    }
    Ok(())
}

/// Sample CPCs of all enabled campaigns. Campaigns that never
/// generated a click are alerted and excluded for this cycle.
/// `alerted` carries the already-alerted names so the post-switch
/// re-collection cannot emit a second NoCpc for the same campaign.
fn collect_enabled_cpcs(
    platform: &mut dyn AdPlatform,
    account: &AccountSnapshot,
    window: StatsWindow,
    alerted: &mut Vec<String>,
    events: &mut Vec<PacingEvent>,
) -> PacingResult<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for campaign in platform.campaigns(&account.id)? {
        if !campaign.enabled {
            continue;
        }
        match cpc::sample(platform, &account.id, &campaign.name, window)? {
            Some(value) => out.push((campaign.name, value)),
            None => {
                if !alerted.contains(&campaign.name) {
                    alerted.push(campaign.name.clone());
                    events.push(PacingEvent::NoCpc {
                        account: account.name.clone(),
                        campaign: campaign.name,
                    });
                }
            }
        }
    }
    Ok(out)
}

/// Which channels are currently live, counting OP campaigns only.
pub fn running_kinds(platform: &dyn AdPlatform, account: &AccountId) -> PacingResult<RunningKinds> {
    let mut search = false;
    let mut display = false;
    for campaign in platform.campaigns(account)? {
        if parse_op(&campaign.name).is_none() || !campaign.enabled {
            continue;
        }
        match CampaignKind::of(&campaign.name) {
            CampaignKind::Search => search = true,
            CampaignKind::Display => display = true,
        }
    }
    Ok(match (search, display) {
        (true, true) => RunningKinds::Both,
        (true, false) => RunningKinds::Search,
        (false, true) => RunningKinds::Display,
        (false, false) => RunningKinds::None,
    })
}

/// Enable every OP campaign of one channel, pause the other channel.
pub fn start_kind_campaigns(
    platform: &mut dyn AdPlatform,
    account: &AccountId,
    kind: CampaignKind,
) -> PacingResult<()> {
    state::mark_active(platform, account)?;
    for campaign in platform.campaigns(account)? {
        if parse_op(&campaign.name).is_none() {
            continue;
        }
        if CampaignKind::of(&campaign.name) == kind {
            platform.enable_campaign(account, &campaign.name)?;
        } else {
            platform.pause_campaign(account, &campaign.name)?;
        }
    }
    Ok(())
}

/// Pause everything, then re-enable the single OP campaign with the
/// lowest historical CPC (last month, all-time fallback); a tie
/// prefers a search campaign. Returns the enabled campaign's name.
pub fn start_lowest_cpc_campaign(
    platform: &mut dyn AdPlatform,
    account: &AccountId,
) -> PacingResult<Option<String>> {
    state::mark_active(platform, account)?;
    let mut lowest: Option<(f64, String)> = None;
    for campaign in platform.campaigns(account)? {
        if parse_op(&campaign.name).is_none() {
            continue;
        }
        let value = cpc::sample_or_zero(platform, account, &campaign.name, StatsWindow::LastMonth)?;
        let better = match &lowest {
            None => true,
            Some((best, _)) if value < *best => true,
            Some((best, _)) => {
                value == *best && CampaignKind::of(&campaign.name) == CampaignKind::Search
            }
        };
        if better {
            lowest = Some((value, campaign.name.clone()));
        }
        platform.pause_campaign(account, &campaign.name)?;
    }
    match lowest {
        Some((_, name)) => {
            platform.enable_campaign(account, &name)?;
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

/// Switch traffic away from an over-cost campaign: enable every
/// counterpart-channel campaign of the same OP group, pause the
/// over-cost one, and apply the tier's default daily budget to the
/// newly enabled campaigns. None when no counterpart exists.
pub fn switch_campaigns(
    platform: &mut dyn AdPlatform,
    account: &AccountSnapshot,
    active_name: &str,
    config: &PacingConfig,
) -> PacingResult<Option<SwitchOutcome>> {
    let target = CampaignKind::of(active_name).other();
    let mut enabled = Vec::new();
    for campaign in platform.campaigns(&account.id)? {
        if campaign.name == active_name
            || CampaignKind::of(&campaign.name) != target
            || !campaign.name.starts_with(&account.op)
        {
            continue;
        }
        platform.enable_campaign(&account.id, &campaign.name)?;
        log::info!("{}: campaign {} enabled", account.name, campaign.name);
        enabled.push(campaign.name);
    }
    if enabled.is_empty() {
        return Ok(None);
    }
    platform.pause_campaign(&account.id, active_name)?;
    log::info!("{}: campaign {active_name} paused", account.name);

    if let Some(default_budget) = config.default_budget_for(account.tier) {
        for name in &enabled {
            if platform.budget_amount(&account.id, name)?.is_some() {
                platform.set_budget_amount(&account.id, name, default_budget)?;
            }
        }
    } else {
        log::warn!("{}: no default budget for tier {}", account.name, account.tier);
    }

    Ok(Some(SwitchOutcome {
        enabled,
        paused: vec![active_name.to_string()],
    }))
}

/// Pause every campaign in the account, OP-prefixed or not.
pub fn pause_all_campaigns(platform: &mut dyn AdPlatform, account: &AccountId) -> PacingResult<()> {
    for campaign in platform.campaigns(account)? {
        platform.pause_campaign(account, &campaign.name)?;
    }
    Ok(())
}

/// True when at least one campaign is enabled.
pub fn any_enabled(platform: &dyn AdPlatform, account: &AccountId) -> PacingResult<bool> {
    Ok(platform.campaigns(account)?.iter().any(|c| c.enabled))
}

/// True when an enabled campaign carries an end date in the past —
/// the whole account is then considered ended.
pub fn end_date_passed(
    platform: &dyn AdPlatform,
    account: &AccountId,
    date: NaiveDate,
) -> PacingResult<bool> {
    for campaign in platform.campaigns(account)? {
        if campaign.enabled {
            if let Some(end) = campaign.end_date {
                return Ok(end < date);
            }
        }
    }
    Ok(false)
}

/// Month-start campaign selection: enable search campaigns whose
/// last-month CPC is non-zero and at most `threshold` (all-time
/// fallback while none is live yet); when none qualifies, enable the
/// single cheapest campaign across both channels.
pub fn month_start_selection(
    platform: &mut dyn AdPlatform,
    account: &AccountId,
    threshold: f64,
) -> PacingResult<()> {
    state::clear_script_labels(platform, account)?;

    let mut lowest_search: Option<(f64, String)> = None;
    let mut lowest_display: Option<(f64, String)> = None;
    let mut any_search_enabled = false;

    for campaign in platform.campaigns(account)? {
        if parse_op(&campaign.name).is_none() {
            continue;
        }
        match CampaignKind::of(&campaign.name) {
            CampaignKind::Display => {
                let value =
                    cpc::sample_or_zero(platform, account, &campaign.name, StatsWindow::LastMonth)?;
                if value > 0.0 && lowest_display.as_ref().map_or(true, |(best, _)| value < *best) {
                    lowest_display = Some((value, campaign.name.clone()));
                }
            }
            CampaignKind::Search => {
                let raw = platform
                    .campaign_stats(account, &campaign.name, StatsWindow::LastMonth)?
                    .avg_cpc;
                if raw > threshold {
                    continue;
                }
                let mut value = raw;
                if value == 0.0 && !any_search_enabled {
                    value = platform
                        .campaign_stats(account, &campaign.name, StatsWindow::AllTime)?
                        .avg_cpc;
                }
                if value > 0.0 {
                    platform.enable_campaign(account, &campaign.name)?;
                    any_search_enabled = true;
                    if lowest_search.as_ref().map_or(true, |(best, _)| value < *best) {
                        lowest_search = Some((value, campaign.name.clone()));
                    }
                }
            }
        }
    }

    if !any_search_enabled {
        let pick = match (&lowest_display, &lowest_search) {
            (Some((d, dname)), Some((s, _))) if d < s => Some(dname.clone()),
            (Some(_), Some((_, sname))) => Some(sname.clone()),
            (Some((_, dname)), None) => Some(dname.clone()),
            (None, Some((_, sname))) => Some(sname.clone()),
            (None, None) => None,
        };
        if let Some(name) = pick {
            platform.enable_campaign(account, &name)?;
        }
    }
    Ok(())
}

/// Apply the tier's default daily budget to every enabled campaign
/// that has a matching budget.
pub fn set_default_budgets(
    platform: &mut dyn AdPlatform,
    account: &AccountId,
    tier: u32,
    config: &PacingConfig,
) -> PacingResult<()> {
    let Some(default_budget) = config.default_budget_for(tier) else {
        log::warn!("account {account}: no default budget for tier {tier}");
        return Ok(());
    };
    for campaign in platform.campaigns(account)? {
        if campaign.enabled && platform.budget_amount(account, &campaign.name)?.is_some() {
            platform.set_budget_amount(account, &campaign.name, default_budget)?;
        }
    }
    Ok(())
}
