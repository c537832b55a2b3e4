//! Account pacing state, persisted as platform labels.
//!
//! The state is an explicit enum with a defined transition surface.
//! INVARIANT: PausedByScript and StoppedByScript are mutually
//! exclusive — every transition that sets one clears the other.

use serde::{Deserialize, Serialize};

use crate::error::PacingResult;
use crate::platform::AdPlatform;
use crate::types::AccountId;

pub const LABEL_PAUSED: &str = "PausedByScript";
pub const LABEL_STOPPED: &str = "StoppedByScript";
pub const LABEL_TOTAL_EMAIL_SENT: &str = "GoalTotalEmailSent";
pub const LABEL_EXTERNAL_EMAIL_SENT: &str = "GoalExternalEmailSent";

/// All labels owned by the engine, cleared on month start.
pub const SCRIPT_LABELS: [&str; 4] = [
    LABEL_PAUSED,
    LABEL_STOPPED,
    LABEL_TOTAL_EMAIL_SENT,
    LABEL_EXTERNAL_EMAIL_SENT,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    /// At least one campaign enabled, no script-applied pause.
    Active,
    /// All campaigns paused: platform goal met, external channel
    /// projected to close the rest.
    PausedByScript,
    /// All campaigns paused: total goal met. Terminal for the month.
    StoppedByScript,
}

impl AccountState {
    /// Read the current state from labels. A stray Paused+Stopped
    /// combination resolves to Stopped (the stronger, terminal one).
    pub fn read(platform: &dyn AdPlatform, account: &AccountId) -> PacingResult<Self> {
        if platform.has_label(account, LABEL_STOPPED)? {
            return Ok(Self::StoppedByScript);
        }
        if platform.has_label(account, LABEL_PAUSED)? {
            return Ok(Self::PausedByScript);
        }
        Ok(Self::Active)
    }
}

/// Transition to PausedByScript.
pub fn mark_paused(platform: &mut dyn AdPlatform, account: &AccountId) -> PacingResult<()> {
    platform.remove_label(account, LABEL_STOPPED)?;
    platform.apply_label(account, LABEL_PAUSED)?;
    log::info!("label {LABEL_PAUSED} applied to account {account}");
    Ok(())
}

/// Transition to StoppedByScript.
pub fn mark_stopped(platform: &mut dyn AdPlatform, account: &AccountId) -> PacingResult<()> {
    platform.remove_label(account, LABEL_PAUSED)?;
    platform.apply_label(account, LABEL_STOPPED)?;
    log::info!("label {LABEL_STOPPED} applied to account {account}");
    Ok(())
}

/// Transition back to Active (clears both script states).
pub fn mark_active(platform: &mut dyn AdPlatform, account: &AccountId) -> PacingResult<()> {
    platform.remove_label(account, LABEL_PAUSED)?;
    platform.remove_label(account, LABEL_STOPPED)?;
    Ok(())
}

/// Remove every engine-owned label (month start reset).
pub fn clear_script_labels(platform: &mut dyn AdPlatform, account: &AccountId) -> PacingResult<()> {
    for label in SCRIPT_LABELS {
        platform.remove_label(account, label)?;
    }
    Ok(())
}
