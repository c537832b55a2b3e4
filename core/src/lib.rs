//! pacer-core — budget pacing for multi-account ad campaigns.
//!
//! One run = one calendar day. The engine fetches the external click
//! feed once, then walks every eligible account sequentially:
//! goal derivation → click projections → state-machine decisions
//! (pause / stop / reactivate / switch) → budget allocation → alerts.
//!
//! RULES:
//!   - Accounts are processed one at a time, never concurrently.
//!   - The click feed is fetched once per run and reused.
//!   - Durable per-account state lives in platform labels only.
//!   - A failure inside one account degrades that account; the batch
//!     itself never aborts.

pub mod account;
pub mod adjust;
pub mod alert;
pub mod allocator;
pub mod calendar;
pub mod config;
pub mod cpc;
pub mod engine;
pub mod error;
pub mod event;
pub mod goal;
pub mod memory;
pub mod platform;
pub mod projection;
pub mod report;
pub mod state;
pub mod store;
pub mod types;
