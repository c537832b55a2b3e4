//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};

/// The canonical run identifier.
pub type RunId = String;

/// Day of month, 1-based.
pub type Day = u32;

/// A stable account identifier on the ad platform.
pub type AccountId = String;

/// Length of a reference code: two letters + seven digits.
pub const OP_LEN: usize = 9;

/// Placeholder when no reference code could be parsed.
pub const OP_MISSING: &str = "N/A";

/// Parse the reference code (OP) from a campaign name.
/// The code must sit at the very start of the name.
pub fn parse_op(campaign_name: &str) -> Option<String> {
    if campaign_name.len() < OP_LEN || !campaign_name.is_char_boundary(OP_LEN) {
        return None;
    }
    let prefix = &campaign_name[..OP_LEN];
    let (letters, digits) = prefix.split_at(2);
    if letters.eq_ignore_ascii_case("op") && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(prefix.to_string())
    } else {
        None
    }
}

/// Scan campaign names in order and return the first parseable
/// reference code, or "N/A" when none is found.
pub fn op_from_campaigns<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .find_map(parse_op)
        .unwrap_or_else(|| OP_MISSING.to_string())
}

/// Campaign channel, inferred from the campaign name.
/// Every campaign not tagged "display" counts as search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    Search,
    Display,
}

impl CampaignKind {
    pub fn of(campaign_name: &str) -> Self {
        if campaign_name.to_lowercase().contains("display") {
            Self::Display
        } else {
            Self::Search
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Search => Self::Display,
            Self::Display => Self::Search,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_parses_from_campaign_prefix() {
        assert_eq!(parse_op("OP0710307 Search").as_deref(), Some("OP0710307"));
        assert_eq!(parse_op("op0710307 display").as_deref(), Some("op0710307"));
        assert_eq!(parse_op("Brand campaign"), None);
        assert_eq!(parse_op("OP07103"), None);
    }

    #[test]
    fn missing_op_falls_back_to_na() {
        let names = ["Brand", "Generic display"];
        assert_eq!(op_from_campaigns(names), OP_MISSING);
    }

    #[test]
    fn kind_inferred_by_substring() {
        assert_eq!(
            CampaignKind::of("OP0710307 Display remarketing"),
            CampaignKind::Display
        );
        assert_eq!(CampaignKind::of("OP0710307 Search"), CampaignKind::Search);
        assert_eq!(CampaignKind::of("OP0710307 brand"), CampaignKind::Search);
    }
}
