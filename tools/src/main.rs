//! pacer-runner: headless daily pacing run over a JSON fixture.
//!
//! Usage:
//!   pacer-runner --date 2024-06-10 --fixture data/fixture.json
//!   pacer-runner --date 2024-06-29 --fixture run.json --db pacing.db
//!   pacer-runner --date 2024-06-29 --fixture run.json --maximize 3
//!   pacer-runner --fixture run.json --retire

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pacer_core::{
    config::PacingConfig,
    engine::PacingEngine,
    event::event_type_name,
    memory::{Fixture, MemoryMailer},
    store::PacingStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let date_str = arg_value(&args, "--date");
    let fixture_path = arg_value(&args, "--fixture").unwrap_or("data/fixture.json");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let db = arg_value(&args, "--db");
    let maximize = args.iter().any(|a| a == "--maximize").then(|| {
        args.windows(2)
            .find(|w| w[0] == "--maximize")
            .and_then(|w| w[1].parse::<f64>().ok())
            .unwrap_or(3.0)
    });
    let retire = args.iter().any(|a| a == "--retire");

    let config = PacingConfig::load(data_dir)?;

    let fixture_json = std::fs::read_to_string(fixture_path)
        .with_context(|| format!("cannot read fixture {fixture_path}"))?;
    let fixture = Fixture::from_json(&fixture_json)?;
    let (mut platform, feed) = fixture.into_parts();
    let mut mailer = MemoryMailer::default();

    let store = match db {
        Some(path) => PacingStore::open(path)?,
        None => PacingStore::in_memory()?,
    };
    store.migrate()?;

    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    let mut engine = PacingEngine::new(run_id.clone(), config, store);

    if retire {
        let retired = engine.retire_accounts(&mut platform)?;
        println!("retired {} accounts: {}", retired.len(), retired.join(", "));
        return Ok(());
    }

    if let Some(factor) = maximize {
        let updated = engine.maximize_budgets(&mut platform, &feed, factor)?;
        println!("maximized {updated} campaign budgets (factor {factor})");
        return Ok(());
    }

    let date: NaiveDate = date_str
        .context("--date YYYY-MM-DD is required")?
        .parse()
        .context("invalid --date")?;

    let summary = engine.run(&mut platform, &feed, &mut mailer, date)?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:    {}", summary.run_id);
    println!("  date:      {}", summary.date);
    println!("  accounts:  {}", summary.accounts_seen);
    println!("  adjusted:  {}", summary.accounts_adjusted);
    println!("  paused:    {}", summary.accounts_paused);
    println!("  emails:    {}", summary.emails_sent);
    println!();
    println!("=== EVENTS ===");
    for event in &summary.events {
        println!("  {}", event_type_name(event));
    }
    println!();
    println!("=== MAIL ===");
    for message in &mailer.sent {
        println!("  {} -> {}", message.subject, message.recipient);
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
