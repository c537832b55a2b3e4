//! Pacing configuration — package tables, thresholds, and the
//! per-cycle surplus map, loaded from the data/ directory.
//!
//! The business constants here (CPC ceiling, underperformance ratio,
//! day thresholds) used to be literals inside the pacing routine;
//! they are data now and are curated per billing cycle alongside the
//! surplus map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Monthly click goals for one package tier, before any surplus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackageGoals {
    pub platform: i64,
    pub external: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackageEntry {
    tier: u32,
    goal_platform: i64,
    goal_external: i64,
    default_budget: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PackagesFile {
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingThresholds {
    /// CPC above this triggers a channel switch attempt.
    pub cpc_ceiling: f64,
    /// Attainment-to-pace ratio below this flags underperformance.
    pub underperformance_ratio: f64,
    /// Underperformance is only checked this many days before month end.
    pub underperformance_window_days: u32,
    /// Daily adjustment starts on this day of month.
    pub adjustment_start_day: u32,
    /// Share of a non-standard tier that falls on the platform channel.
    pub custom_platform_share: f64,
    /// Share of a non-standard tier that falls on the external channel.
    pub custom_external_share: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PacingFile {
    thresholds: PacingThresholds,
    recipients: Vec<String>,
    active_flag: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SurplusesFile {
    /// "<OP> - <account name>" → signed monthly click surplus.
    surpluses: HashMap<String, i64>,
    /// Account names excluded from processing outright.
    ignore: Vec<String>,
    /// OP → name of accounts to retire (Active flag removed).
    accounts_to_end: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub packages: HashMap<u32, PackageGoals>,
    pub default_budgets: HashMap<u32, f64>,
    pub thresholds: PacingThresholds,
    pub recipients: Vec<String>,
    /// Label marking accounts as members of the processed set.
    pub active_flag: String,
    pub surpluses: HashMap<String, i64>,
    pub ignore: Vec<String>,
    pub accounts_to_end: HashMap<String, String>,
}

impl PacingConfig {
    /// Load from the data/ directory.
    /// In tests, use PacingConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/packages.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: PackagesFile = serde_json::from_str(&content)?;
        let mut packages = HashMap::new();
        let mut default_budgets = HashMap::new();
        for p in file.packages {
            packages.insert(
                p.tier,
                PackageGoals {
                    platform: p.goal_platform,
                    external: p.goal_external,
                },
            );
            default_budgets.insert(p.tier, p.default_budget);
        }

        let pacing_path = format!("{data_dir}/pacing.json");
        let pacing_content = std::fs::read_to_string(&pacing_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {pacing_path}: {e}"))?;
        let pacing_file: PacingFile = serde_json::from_str(&pacing_content)?;

        let surplus_path = format!("{data_dir}/surpluses.json");
        let surplus_content = std::fs::read_to_string(&surplus_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {surplus_path}: {e}"))?;
        let surplus_file: SurplusesFile = serde_json::from_str(&surplus_content)?;

        Ok(Self {
            packages,
            default_budgets,
            thresholds: pacing_file.thresholds,
            recipients: pacing_file.recipients,
            active_flag: pacing_file.active_flag,
            surpluses: surplus_file.surpluses,
            ignore: surplus_file.ignore,
            accounts_to_end: surplus_file.accounts_to_end,
        })
    }

    /// Built-in configuration mirroring the production defaults.
    pub fn default_test() -> Self {
        let mut packages = HashMap::new();
        packages.insert(49, PackageGoals { platform: 40, external: 160 });
        packages.insert(99, PackageGoals { platform: 80, external: 320 });
        packages.insert(199, PackageGoals { platform: 160, external: 640 });
        packages.insert(399, PackageGoals { platform: 320, external: 1280 });

        let mut default_budgets = HashMap::new();
        default_budgets.insert(49, 0.15);
        default_budgets.insert(99, 0.30);
        default_budgets.insert(199, 0.60);
        default_budgets.insert(399, 1.00);

        Self {
            packages,
            default_budgets,
            thresholds: PacingThresholds {
                cpc_ceiling: 0.15,
                underperformance_ratio: 0.75,
                underperformance_window_days: 15,
                adjustment_start_day: 5,
                custom_platform_share: 0.20,
                custom_external_share: 0.80,
            },
            recipients: vec!["campaign-ops@example.com".to_string()],
            active_flag: "Active".to_string(),
            surpluses: HashMap::new(),
            ignore: Vec::new(),
            accounts_to_end: HashMap::new(),
        }
    }

    /// Surplus for one account, keyed "<OP> - <name>" in the curated map.
    pub fn surplus_for(&self, op: &str, account_name: &str) -> Option<i64> {
        self.surpluses.get(&format!("{op} - {account_name}")).copied()
    }

    /// Default daily budget for a tier, if one is configured.
    pub fn default_budget_for(&self, tier: u32) -> Option<f64> {
        self.default_budgets.get(&tier).copied()
    }
}
