//! Event-to-email mapping.
//!
//! Only a subset of events is user-visible; the rest stay in the run
//! log. AccountPaused in particular is intentionally silent — the
//! final stop alert is the one the recipients act on.

use crate::event::PacingEvent;
use crate::platform::EmailMessage;
use crate::types::CampaignKind;

/// Subject and body for an alert-worthy event; None for events that
/// only feed the run log or the digest.
pub fn render(event: &PacingEvent) -> Option<(String, String)> {
    match event {
        PacingEvent::Underperforming {
            account,
            clicks_total,
            goal_total,
            performance_pct,
            activated,
        } => {
            let mut body = format!(
                "Account {account} is underperforming: {clicks_total} of {goal_total} \
                 total clicks, at {performance_pct}% of the expected pace.\n"
            );
            match activated {
                Some(CampaignKind::Display) => {
                    body.push_str("Display campaigns have been switched on to compensate.\n");
                }
                Some(CampaignKind::Search) => {
                    body.push_str("Search campaigns have been switched on to compensate.\n");
                }
                None => body.push_str("No additional channel was available to switch on.\n"),
            }
            Some((format!("Account {account} is underperforming"), body))
        }
        PacingEvent::ExternalGoalReached { account, clicks, goal } => Some((
            format!("External click goal reached for {account}"),
            format!(
                "The external channel delivered {clicks} clicks against a goal of {goal} \
                 for account {account}.\n"
            ),
        )),
        PacingEvent::TotalGoalReached { account, clicks, goal } => Some((
            format!("Click goal reached for {account} - campaigns stopped"),
            format!(
                "Account {account} reached {clicks} of {goal} total clicks. All campaigns \
                 have been paused for the rest of the month.\n"
            ),
        )),
        PacingEvent::AccountReactivated { account, campaign, date } => Some((
            format!("Campaigns reactivated for {account}"),
            format!(
                "External clicks are no longer projected to cover the goal for account \
                 {account}. Campaign {campaign} was re-enabled on {date}.\n"
            ),
        )),
        PacingEvent::CpcOverCeiling { account, campaign, cpc, enabled, paused } => {
            let subject = format!("CPC too high for campaign {campaign} ({account})");
            let mut body = format!(
                "Campaign {campaign} in account {account} has an average CPC of {cpc:.2}, \
                 above the configured ceiling.\n"
            );
            if enabled.is_empty() {
                body.push_str("No campaign on the other channel was available to switch to.\n");
            } else {
                body.push_str(&format!(
                    "Enabled instead: {}.\nPaused: {}.\n",
                    enabled.join(", "),
                    paused.join(", ")
                ));
            }
            Some((subject, body))
        }
        PacingEvent::NoCpc { account, campaign } => Some((
            format!("No CPC data for campaign {campaign} ({account})"),
            format!(
                "Campaign {campaign} in account {account} has never generated a click, \
                 over any lookback window. It was excluded from today's budget \
                 allocation and needs manual review.\n"
            ),
        )),
        PacingEvent::CustomGoalReached { entry, clicks, goal } => Some((
            format!("Custom package goal reached: {entry}"),
            format!(
                "Custom package {entry} reached {clicks} clicks against a goal of {goal}. \
                 The package needs to be closed manually.\n"
            ),
        )),
        PacingEvent::RunStarted { .. }
        | PacingEvent::MonthStartReset { .. }
        | PacingEvent::AccountEnded { .. }
        | PacingEvent::AccountPaused { .. }
        | PacingEvent::BudgetAdjusted { .. } => None,
    }
}

/// Fan one event out to all configured recipients.
pub fn emails_for(event: &PacingEvent, recipients: &[String]) -> Vec<EmailMessage> {
    let Some((subject, body)) = render(event) else {
        return Vec::new();
    };
    recipients
        .iter()
        .map(|recipient| EmailMessage {
            recipient: recipient.clone(),
            subject: subject.clone(),
            body: body.clone(),
            attachment: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_event_is_silent() {
        let event = PacingEvent::AccountPaused {
            account: "Acme".into(),
            op: "OP0710307".into(),
            clicks_platform: 80,
            cost: 12.5,
            impressions: 4000,
            ctr: 0.02,
        };
        assert!(render(&event).is_none(), "pause must not email");
    }

    #[test]
    fn stop_event_emails_every_recipient() {
        let event = PacingEvent::TotalGoalReached { account: "Acme".into(), clicks: 480, goal: 480 };
        let recipients = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let emails = emails_for(&event, &recipients);
        assert_eq!(emails.len(), 2);
        assert!(emails[0].subject.contains("Acme"));
    }
}
