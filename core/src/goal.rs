//! Goal model — monthly click goals derived from the package tier
//! plus the manually curated surplus.
//!
//! The surplus only ever moves the external-channel goal. A negative
//! surplus (a deficit) increases it; a large positive surplus can
//! push it negative, which is legal and simply means the external
//! channel has already overdelivered for the cycle.

use serde::{Deserialize, Serialize};

use crate::config::PacingConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClickGoals {
    pub platform: i64,
    pub external: i64,
}

impl ClickGoals {
    /// Total goal, always recomputed from the two channels.
    pub fn total(&self) -> i64 {
        self.platform + self.external
    }
}

/// Derive goals for a tier. Standard tiers use the package table;
/// any other tier falls back to the configured linear split. Unknown
/// tiers are never an error.
pub fn goals_for_tier(config: &PacingConfig, tier: u32, surplus: i64) -> ClickGoals {
    match config.packages.get(&tier) {
        Some(package) => ClickGoals {
            platform: package.platform,
            external: package.external - surplus,
        },
        None => {
            let t = &config.thresholds;
            ClickGoals {
                platform: (f64::from(tier) * t.custom_platform_share).round() as i64,
                external: (f64::from(tier) * t.custom_external_share).round() as i64 - surplus,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tiers_use_the_package_table() {
        let config = PacingConfig::default_test();
        for (tier, platform, external) in
            [(49, 40, 160), (99, 80, 320), (199, 160, 640), (399, 320, 1280)]
        {
            let goals = goals_for_tier(&config, tier, 0);
            assert_eq!(goals.platform, platform, "tier {tier} platform goal");
            assert_eq!(goals.external, external, "tier {tier} external goal");
            assert_eq!(goals.total(), platform + external);
        }
    }

    #[test]
    fn surplus_only_moves_the_external_goal() {
        let config = PacingConfig::default_test();
        let goals = goals_for_tier(&config, 99, 25);
        assert_eq!(goals.platform, 80);
        assert_eq!(goals.external, 295);

        let deficit = goals_for_tier(&config, 99, -10);
        assert_eq!(deficit.platform, 80);
        assert_eq!(deficit.external, 330);
    }

    #[test]
    fn surplus_can_push_the_external_goal_negative() {
        let config = PacingConfig::default_test();
        let goals = goals_for_tier(&config, 49, 500);
        assert_eq!(goals.external, -340);
        assert_eq!(goals.total(), -300);
    }

    #[test]
    fn non_table_tier_uses_the_linear_split() {
        let config = PacingConfig::default_test();
        let goals = goals_for_tier(&config, 150, 7);
        assert_eq!(goals.platform, 30);
        assert_eq!(goals.external, 120 - 7);

        // Rounding, not truncation.
        let odd = goals_for_tier(&config, 151, 0);
        assert_eq!(odd.platform, 30);
        assert_eq!(odd.external, 121);
    }
}
