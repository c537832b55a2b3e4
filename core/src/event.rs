//! Engine events — every decision the daily run takes.
//!
//! Events are the only output channel of the decision layers: the
//! alerting module turns a subset of them into emails, the report
//! module folds them into the daily digest, and the store persists
//! each one as a JSON payload.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocator::AllocationSnapshot;
use crate::types::{CampaignKind, RunId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacingEvent {
    RunStarted {
        run_id: RunId,
        date: NaiveDate,
    },
    /// Day-1 reset: campaigns restarted, default budgets applied,
    /// script labels cleared.
    MonthStartReset {
        account: String,
    },
    /// Account retired: an enabled campaign's end date has passed.
    AccountEnded {
        account: String,
        op: String,
    },
    /// Attainment-to-pace ratio fell under the threshold late in the
    /// month. `activated` names the channel that was switched on, if
    /// any qualified.
    Underperforming {
        account: String,
        clicks_total: i64,
        goal_total: i64,
        performance_pct: i64,
        activated: Option<CampaignKind>,
    },
    /// External channel met its sub-goal. Emitted at most once per
    /// month per account.
    ExternalGoalReached {
        account: String,
        clicks: i64,
        goal: i64,
    },
    /// Total goal met. Emitted at most once per month per account.
    TotalGoalReached {
        account: String,
        clicks: i64,
        goal: i64,
    },
    /// All campaigns paused: platform sub-goal met, external channel
    /// projected to close the rest. Deliberately not emailed.
    AccountPaused {
        account: String,
        op: String,
        clicks_platform: i64,
        cost: f64,
        impressions: i64,
        ctr: f64,
    },
    /// Paused account re-enabled: external projection fell short.
    AccountReactivated {
        account: String,
        campaign: String,
        date: NaiveDate,
    },
    /// A campaign's CPC crossed the ceiling. Lists are the campaigns
    /// switched on/off; both empty when no counterpart existed.
    CpcOverCeiling {
        account: String,
        campaign: String,
        cpc: f64,
        enabled: Vec<String>,
        paused: Vec<String>,
    },
    /// No CPC over any window — the campaign never generated clicks.
    NoCpc {
        account: String,
        campaign: String,
    },
    BudgetAdjusted {
        snapshot: AllocationSnapshot,
    },
    /// A custom (P-suffixed) package reached its standalone target.
    CustomGoalReached {
        entry: String,
        clicks: i64,
        goal: i64,
    },
}

/// Extract a stable string name from an event variant.
/// Used for the event_type column in the run log.
pub fn event_type_name(event: &PacingEvent) -> &'static str {
    match event {
        PacingEvent::RunStarted { .. } => "run_started",
        PacingEvent::MonthStartReset { .. } => "month_start_reset",
        PacingEvent::AccountEnded { .. } => "account_ended",
        PacingEvent::Underperforming { .. } => "underperforming",
        PacingEvent::ExternalGoalReached { .. } => "external_goal_reached",
        PacingEvent::TotalGoalReached { .. } => "total_goal_reached",
        PacingEvent::AccountPaused { .. } => "account_paused",
        PacingEvent::AccountReactivated { .. } => "account_reactivated",
        PacingEvent::CpcOverCeiling { .. } => "cpc_over_ceiling",
        PacingEvent::NoCpc { .. } => "no_cpc",
        PacingEvent::BudgetAdjusted { .. } => "budget_adjusted",
        PacingEvent::CustomGoalReached { .. } => "custom_goal_reached",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub day: u32,
    pub event_type: String,
    pub payload: String, // JSON-serialized PacingEvent
}
