//! The daily run orchestrator.
//!
//! One `run()` = one calendar day. The external feed is fetched
//! exactly once and shared across every account; each account is
//! processed independently, and a failure in one logs and moves on
//! instead of aborting the run. All durable state lives in platform
//! labels, so a run can be retried without a local journal.

use chrono::NaiveDate;

use crate::account::{tier_from_labels, AccountSnapshot};
use crate::adjust::{self, AdjustOutcome, EmailFlags, PausedMetrics};
use crate::alert;
use crate::allocator;
use crate::calendar::MonthContext;
use crate::config::PacingConfig;
use crate::cpc;
use crate::error::PacingResult;
use crate::event::{event_type_name, EventLogEntry, PacingEvent};
use crate::platform::{
    feed_clicks_for, AccountRef, AdPlatform, ClickFeed, FeedRecord, Mailer, StatsWindow,
};
use crate::report::{self, DailyDigest, MonthlyRow, PausedRow};
use crate::state::{self, AccountState};
use crate::store::PacingStore;
use crate::types::{op_from_campaigns, RunId, OP_LEN, OP_MISSING};

/// What one daily run did, for the caller and the logs.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub date: NaiveDate,
    pub accounts_seen: usize,
    pub accounts_adjusted: usize,
    pub accounts_paused: usize,
    pub emails_sent: usize,
    pub events: Vec<PacingEvent>,
}

pub struct PacingEngine {
    run_id: RunId,
    config: PacingConfig,
    store: PacingStore,
}

impl PacingEngine {
    pub fn new(run_id: RunId, config: PacingConfig, store: PacingStore) -> Self {
        Self { run_id, config, store }
    }

    /// Engine over an in-memory store with the built-in test config.
    pub fn build_test(run_id: &str) -> PacingResult<Self> {
        let store = PacingStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(run_id.to_string(), PacingConfig::default_test(), store))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    pub fn store(&self) -> &PacingStore {
        &self.store
    }

    /// Execute one daily pacing cycle.
    pub fn run(
        &mut self,
        platform: &mut dyn AdPlatform,
        feed: &dyn ClickFeed,
        mailer: &mut dyn Mailer,
        date: NaiveDate,
    ) -> PacingResult<RunSummary> {
        let month = MonthContext::new(date);
        self.store
            .insert_run(&self.run_id, &date.to_string(), env!("CARGO_PKG_VERSION"))?;

        let mut events = vec![PacingEvent::RunStarted { run_id: self.run_id.clone(), date }];
        let mut digest = DailyDigest::default();

        // One fetch per run; a dead feed aborts the whole cycle
        // rather than silently pacing every account without external
        // data.
        let feed_data = feed.fetch()?;
        log::info!("feed fetched: {} records", feed_data.len());

        let accounts = platform.accounts_with_label(&self.config.active_flag)?;
        let accounts_seen = accounts.len();
        log::info!("run {} on {date}: {accounts_seen} accounts", self.run_id);

        for account in accounts {
            if self.config.ignore.contains(&account.name) {
                log::info!("{}: on the ignore list, skipping", account.name);
                continue;
            }
            if let Err(e) =
                self.process_account(platform, &feed_data, &account, &month, &mut events, &mut digest)
            {
                log::error!("{}: account cycle failed: {e}", account.name);
            }
        }

        self.check_custom_packages(&feed_data, &mut events);

        // Dispatch: per-event alerts first, then the digest.
        let mut emails_sent = 0;
        for event in &events {
            for message in alert::emails_for(event, &self.config.recipients) {
                match mailer.send(&message) {
                    Ok(()) => emails_sent += 1,
                    Err(e) => log::error!("mail '{}' failed: {e}", message.subject),
                }
            }
        }
        for message in report::digest_emails(&digest, date, &self.config.recipients) {
            match mailer.send(&message) {
                Ok(()) => emails_sent += 1,
                Err(e) => log::error!("mail '{}' failed: {e}", message.subject),
            }
        }

        if month.day == 1 {
            emails_sent += self.monthly_report(platform, mailer, &month)?;
        }

        // Persist the run log last; the decisions already happened.
        for event in &events {
            self.store.append_event(&EventLogEntry {
                id: None,
                run_id: self.run_id.clone(),
                day: month.day,
                event_type: event_type_name(event).to_string(),
                payload: serde_json::to_string(event)?,
            })?;
        }
        for snapshot in &digest.processed {
            self.store.insert_allocation(&self.run_id, snapshot)?;
        }

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            date,
            accounts_seen,
            accounts_adjusted: digest.processed.len(),
            accounts_paused: digest.paused.len(),
            emails_sent,
            events,
        })
    }

    fn process_account(
        &self,
        platform: &mut dyn AdPlatform,
        feed_data: &[FeedRecord],
        account: &AccountRef,
        month: &MonthContext,
        events: &mut Vec<PacingEvent>,
        digest: &mut DailyDigest,
    ) -> PacingResult<()> {
        let labels = platform.labels(&account.id)?;
        let Some((tier, tier_label)) = tier_from_labels(&labels) else {
            log::warn!("{}: no package tier label, skipping", account.name);
            return Ok(());
        };
        log::debug!("{}: tier {tier} from label '{tier_label}'", account.name);

        let campaigns = platform.campaigns(&account.id)?;
        let op = op_from_campaigns(campaigns.iter().map(|c| c.name.as_str()));
        if op == OP_MISSING {
            log::warn!("{}: no reference code in any campaign name", account.name);
        }

        let ended = adjust::end_date_passed(platform, &account.id, month.date)?;

        // Day 1: restart the month — unless the account is winding
        // down past its end date.
        if month.day == 1 {
            if ended {
                log::info!("{}: past end date, no month-start reset", account.name);
            } else {
                adjust::month_start_selection(
                    platform,
                    &account.id,
                    self.config.thresholds.cpc_ceiling,
                )?;
                adjust::set_default_budgets(platform, &account.id, tier, &self.config)?;
                events.push(PacingEvent::MonthStartReset { account: account.name.clone() });
            }
        }

        // Day 2: retire ended accounts, one day after their last
        // full-month reset was skipped.
        if month.day == 2 && ended {
            adjust::pause_all_campaigns(platform, &account.id)?;
            platform.remove_label(&account.id, &self.config.active_flag)?;
            events.push(PacingEvent::AccountEnded {
                account: account.name.clone(),
                op: op.clone(),
            });
            return Ok(());
        }

        let mut entry_state = AccountState::read(platform, &account.id)?;
        let enabled = adjust::any_enabled(platform, &account.id)?;
        if !enabled && entry_state != AccountState::PausedByScript {
            // Stopped for the month, or paused by hand.
            return Ok(());
        }
        if enabled && entry_state != AccountState::Active {
            // Someone re-enabled campaigns by hand; the labels are
            // stale. Trust the campaigns.
            log::info!("{}: campaigns enabled by hand, clearing script state", account.name);
            state::mark_active(platform, &account.id)?;
            entry_state = AccountState::Active;
        }

        let stats = platform.account_stats(&account.id, StatsWindow::ThisMonth)?;
        let clicks_external = feed_clicks_for(feed_data, &op);
        let surplus = self.config.surplus_for(&op, &account.name);
        let snapshot =
            AccountSnapshot::build(account, op, tier, stats, clicks_external, surplus, &self.config);

        let mut flags = EmailFlags::read(platform, &account.id)?;

        if month.day < self.config.thresholds.adjustment_start_day {
            // Too early for budget moves, but goal alerts still fire.
            self.early_goal_checks(platform, &snapshot, &mut flags, events)?;
            return Ok(());
        }

        let outcome = adjust::adjust_budget(
            platform,
            &self.config,
            &snapshot,
            entry_state,
            &mut flags,
            month,
            events,
        )?;
        match outcome {
            AdjustOutcome::Adjusted(allocation) => digest.processed.push(allocation),
            AdjustOutcome::Stopped(metrics) | AdjustOutcome::Paused(metrics) => {
                digest.paused.push(PausedRow {
                    op: snapshot.op.clone(),
                    account: snapshot.name.clone(),
                    metrics,
                });
            }
            AdjustOutcome::Held => {
                digest.paused.push(PausedRow {
                    op: snapshot.op.clone(),
                    account: snapshot.name.clone(),
                    metrics: PausedMetrics {
                        clicks_platform: snapshot.clicks_platform,
                        cost: snapshot.cost,
                        impressions: snapshot.impressions,
                        ctr: snapshot.ctr,
                    },
                });
            }
            AdjustOutcome::Skipped => {}
        }
        Ok(())
    }

    /// Goal alerts before the adjustment window opens: the external
    /// sub-goal email and, when the whole goal is already met, the
    /// stop transition.
    fn early_goal_checks(
        &self,
        platform: &mut dyn AdPlatform,
        snapshot: &AccountSnapshot,
        flags: &mut EmailFlags,
        events: &mut Vec<PacingEvent>,
    ) -> PacingResult<()> {
        if snapshot.external_goal_met() && !flags.external_sent {
            platform.apply_label(&snapshot.id, crate::state::LABEL_EXTERNAL_EMAIL_SENT)?;
            flags.external_sent = true;
            events.push(PacingEvent::ExternalGoalReached {
                account: snapshot.name.clone(),
                clicks: snapshot.clicks_external.unwrap_or(0),
                goal: snapshot.goals.external,
            });
        }
        if snapshot.total_goal_met() {
            adjust::pause_all_campaigns(platform, &snapshot.id)?;
            state::mark_stopped(platform, &snapshot.id)?;
            if !flags.total_sent {
                platform.apply_label(&snapshot.id, crate::state::LABEL_TOTAL_EMAIL_SENT)?;
                flags.total_sent = true;
                events.push(PacingEvent::TotalGoalReached {
                    account: snapshot.name.clone(),
                    clicks: snapshot.clicks_total(),
                    goal: snapshot.goals.total(),
                });
            }
        }
        Ok(())
    }

    /// Custom (P-suffixed) surplus entries carry a standalone click
    /// goal instead of a surplus. Checked against the feed only;
    /// these packages have no platform campaigns to steer.
    fn check_custom_packages(&self, feed_data: &[FeedRecord], events: &mut Vec<PacingEvent>) {
        for (entry, goal) in &self.config.surpluses {
            let is_custom = entry.len() > OP_LEN
                && entry.is_char_boundary(OP_LEN)
                && entry[OP_LEN..].starts_with(['P', 'p']);
            if !is_custom {
                continue;
            }
            let op = &entry[..OP_LEN];
            match feed_clicks_for(feed_data, op) {
                Some(clicks) if clicks >= *goal => {
                    events.push(PacingEvent::CustomGoalReached {
                        entry: entry.clone(),
                        clicks,
                        goal: *goal,
                    });
                }
                Some(clicks) => {
                    log::info!("custom package {entry}: {clicks}/{goal} clicks");
                }
                None => log::warn!("custom package {entry}: no feed record for {op}"),
            }
        }
    }

    /// Previous-month summary, emailed with a CSV attachment.
    pub fn monthly_report(
        &self,
        platform: &dyn AdPlatform,
        mailer: &mut dyn Mailer,
        month: &MonthContext,
    ) -> PacingResult<usize> {
        let previous = month.previous_month();
        let mut rows = Vec::new();
        for account in platform.accounts_with_label(&self.config.active_flag)? {
            let campaigns = platform.campaigns(&account.id)?;
            let op = op_from_campaigns(campaigns.iter().map(|c| c.name.as_str()));
            let stats = platform.account_stats(&account.id, StatsWindow::LastMonth)?;
            rows.push(MonthlyRow { op, account: account.name, stats });
        }
        rows.sort_by(|a, b| a.op.cmp(&b.op));

        let mut sent = 0;
        for message in report::monthly_emails(&rows, previous, &self.config.recipients) {
            match mailer.send(&message) {
                Ok(()) => sent += 1,
                Err(e) => log::error!("mail '{}' failed: {e}", message.subject),
            }
        }
        Ok(sent)
    }

    /// Last-resort booster: set every enabled campaign's budget to
    /// remaining clicks × trailing-week CPC × `factor`. Run by hand
    /// near month end when a goal would otherwise be missed.
    pub fn maximize_budgets(
        &self,
        platform: &mut dyn AdPlatform,
        feed: &dyn ClickFeed,
        factor: f64,
    ) -> PacingResult<usize> {
        let feed_data = feed.fetch()?;
        let mut updated = 0;
        for account in platform.accounts_with_label(&self.config.active_flag)? {
            if self.config.ignore.contains(&account.name) {
                continue;
            }
            let labels = platform.labels(&account.id)?;
            let Some((tier, _)) = tier_from_labels(&labels) else {
                continue;
            };
            let campaigns = platform.campaigns(&account.id)?;
            let op = op_from_campaigns(campaigns.iter().map(|c| c.name.as_str()));
            let stats = platform.account_stats(&account.id, StatsWindow::ThisMonth)?;
            let clicks_external = feed_clicks_for(&feed_data, &op);
            let surplus = self.config.surplus_for(&op, &account.name);
            let snapshot = AccountSnapshot::build(
                &account,
                op,
                tier,
                stats,
                clicks_external,
                surplus,
                &self.config,
            );
            let remaining = snapshot.clicks_remaining();
            if remaining <= 0 {
                continue;
            }
            for campaign in campaigns.iter().filter(|c| c.enabled) {
                let Some(value) =
                    cpc::sample(platform, &account.id, &campaign.name, StatsWindow::Last7Days)?
                else {
                    continue;
                };
                if platform.budget_amount(&account.id, &campaign.name)?.is_none() {
                    continue;
                }
                let budget = allocator::maximized_budget(remaining, value, factor);
                platform.set_budget_amount(&account.id, &campaign.name, budget)?;
                log::info!("{}: maximized {} to {budget:.2}", account.name, campaign.name);
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Retire accounts listed in the config: pause everything and
    /// drop the active flag so daily runs stop touching them.
    pub fn retire_accounts(&self, platform: &mut dyn AdPlatform) -> PacingResult<Vec<String>> {
        let mut retired = Vec::new();
        for account in platform.accounts_with_label(&self.config.active_flag)? {
            let campaigns = platform.campaigns(&account.id)?;
            let op = op_from_campaigns(campaigns.iter().map(|c| c.name.as_str()));
            if self.config.accounts_to_end.contains_key(&op) {
                adjust::pause_all_campaigns(platform, &account.id)?;
                platform.remove_label(&account.id, &self.config.active_flag)?;
                log::info!("{}: retired ({op})", account.name);
                retired.push(account.name);
            }
        }
        Ok(retired)
    }
}
