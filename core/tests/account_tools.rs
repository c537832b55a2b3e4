//! Side tools: custom package checks, the budget booster, and
//! config-driven retirement.

use chrono::NaiveDate;
use pacer_core::config::PacingConfig;
use pacer_core::engine::PacingEngine;
use pacer_core::memory::{MemoryAccount, MemoryCampaign, MemoryMailer, MemoryPlatform, StaticFeed};
use pacer_core::platform::{FeedClicks, FeedRecord, StatsWindow, WindowStats};
use pacer_core::store::PacingStore;
use std::collections::HashMap;

fn window(clicks: i64, cost: f64) -> WindowStats {
    let impressions = clicks * 40;
    WindowStats {
        impressions,
        clicks,
        cost,
        ctr: if impressions > 0 { clicks as f64 / impressions as f64 } else { 0.0 },
        avg_cpc: if clicks > 0 { cost / clicks as f64 } else { 0.0 },
    }
}

fn engine_with(config: PacingConfig, run_id: &str) -> PacingEngine {
    let store = PacingStore::in_memory().unwrap();
    store.migrate().unwrap();
    PacingEngine::new(run_id.to_string(), config, store)
}

fn feed_record(op: &str, clicks: i64) -> FeedRecord {
    FeedRecord { op: op.to_string(), clicks: FeedClicks { sum: clicks } }
}

/// Surplus entries with a 'P' after the reference code are
/// standalone click goals, checked against the feed alone.
#[test]
fn custom_package_goal_alerts_when_met() {
    let mut config = PacingConfig::default_test();
    config.surpluses.insert("OP0767222P - Prima custom".to_string(), 500);
    config.surpluses.insert("OP0767223P - Secunda custom".to_string(), 500);
    let mut engine = engine_with(config, "custom-1");

    let mut platform = MemoryPlatform::default();
    let feed = StaticFeed {
        records: vec![feed_record("OP0767222", 620), feed_record("OP0767223", 120)],
    };
    let mut mailer = MemoryMailer::default();

    engine
        .run(&mut platform, &feed, &mut mailer, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
        .unwrap();

    let alerts: Vec<_> = mailer
        .sent
        .iter()
        .filter(|m| m.subject.starts_with("Custom package goal reached"))
        .collect();
    assert_eq!(alerts.len(), 1, "only the met goal alerts");
    assert!(alerts[0].subject.contains("OP0767222P"), "subject: {}", alerts[0].subject);
    assert_eq!(engine.store().event_count("custom-1", "custom_goal_reached").unwrap(), 1);
}

/// The booster sets budget = remaining clicks × trailing-week CPC ×
/// factor on every enabled campaign with a budget.
#[test]
fn maximize_budgets_uses_trailing_week_cpc() {
    let mut stats = HashMap::new();
    stats.insert(StatsWindow::ThisMonth, window(30, 3.6));
    stats.insert(StatsWindow::Last7Days, window(100, 10.0)); // 0.10
    stats.insert(StatsWindow::AllTime, window(700, 77.0));
    let platform_account = MemoryAccount {
        id: "acc-1".to_string(),
        name: "Acme d.o.o.".to_string(),
        labels: vec!["Active".to_string(), "Business 99".to_string()],
        campaigns: vec![MemoryCampaign {
            name: "OP0710307 Search".to_string(),
            enabled: true,
            end_date: None,
            budget: Some(0.30),
            stats,
        }],
    };
    let mut platform = MemoryPlatform::new(vec![platform_account]);
    let feed = StaticFeed { records: vec![feed_record("OP0710307", 110)] };
    let engine = engine_with(PacingConfig::default_test(), "max-1");

    let updated = engine.maximize_budgets(&mut platform, &feed, 3.0).unwrap();

    assert_eq!(updated, 1);
    // Remaining 400 − 140 = 260 clicks at 0.10 CPC, tripled.
    let budget = platform.account("acc-1").unwrap().campaigns[0].budget.unwrap();
    assert!((budget - 78.0).abs() < 1e-9, "expected 78.0, got {budget}");
}

/// Accounts listed for retirement lose the active flag and have
/// every campaign paused.
#[test]
fn listed_accounts_are_retired() {
    let mut stats = HashMap::new();
    stats.insert(StatsWindow::ThisMonth, window(30, 3.6));
    let platform_account = MemoryAccount {
        id: "acc-1".to_string(),
        name: "Acme d.o.o.".to_string(),
        labels: vec!["Active".to_string(), "Business 99".to_string()],
        campaigns: vec![MemoryCampaign {
            name: "OP0710307 Search".to_string(),
            enabled: true,
            end_date: None,
            budget: Some(0.30),
            stats,
        }],
    };
    let mut platform = MemoryPlatform::new(vec![platform_account]);
    let mut config = PacingConfig::default_test();
    config
        .accounts_to_end
        .insert("OP0710307".to_string(), "Acme d.o.o.".to_string());
    let engine = engine_with(config, "retire-1");

    let retired = engine.retire_accounts(&mut platform).unwrap();

    assert_eq!(retired, vec!["Acme d.o.o.".to_string()]);
    let snapshot = platform.account("acc-1").unwrap();
    assert!(!snapshot.labels.iter().any(|l| l == "Active"));
    assert!(snapshot.campaigns.iter().all(|c| !c.enabled));
}
