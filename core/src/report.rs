//! Daily digest and monthly report rendering.
//!
//! The digest is one email per run: a section for accounts the
//! engine is holding paused (with a machine-readable JSON attachment
//! for downstream tooling) and a section for accounts whose budgets
//! were recomputed. The monthly report summarizes the previous
//! month per account, as text plus CSV and JSON attachments.

use chrono::{Datelike, NaiveDate};
use serde_json::json;

use crate::adjust::PausedMetrics;
use crate::allocator::AllocationSnapshot;
use crate::platform::{Attachment, EmailMessage, WindowStats};

/// One paused account in the digest.
#[derive(Debug, Clone)]
pub struct PausedRow {
    pub op: String,
    pub account: String,
    pub metrics: PausedMetrics,
}

#[derive(Debug, Clone, Default)]
pub struct DailyDigest {
    pub paused: Vec<PausedRow>,
    pub processed: Vec<AllocationSnapshot>,
}

impl DailyDigest {
    pub fn is_empty(&self) -> bool {
        self.paused.is_empty() && self.processed.is_empty()
    }
}

fn format_line(snapshot: &AllocationSnapshot) -> String {
    let campaign_col = if snapshot.lines.len() == 1 {
        snapshot.lines[0].campaign.clone()
    } else {
        "multiple campaigns".to_string()
    };
    let budgets: Vec<String> = snapshot
        .lines
        .iter()
        .map(|l| format!("{} {:.2} -> {:.2} (CPC {:.2})", l.campaign, l.budget_prev, l.budget_new, l.cpc))
        .collect();
    format!(
        "{op} | {account} | {campaign_col}\n  \
         platform {clicks_p}/{goal_p}, external {clicks_e}/{goal_e}, total goal {goal_t}\n  \
         projected: platform {proj_old} -> {proj_new}, total {proj_total}\n  \
         cost {cost:.2}, projected cost {proj_cost:.2}\n  \
         budgets: {budgets}",
        op = snapshot.op,
        account = snapshot.account,
        clicks_p = snapshot.clicks_platform,
        goal_p = snapshot.goal_platform,
        clicks_e = snapshot
            .clicks_external
            .map_or_else(|| "n/a".to_string(), |c| c.to_string()),
        goal_e = snapshot.goal_external,
        goal_t = snapshot.goal_total,
        proj_old = snapshot.projected_platform_old,
        proj_new = snapshot.projected_platform_new,
        proj_total = snapshot.projected_total_new,
        cost = snapshot.cost,
        proj_cost = snapshot.projected_cost,
        budgets = budgets.join("; "),
    )
}

/// The digest body as plain text.
pub fn digest_body(digest: &DailyDigest, date: NaiveDate) -> String {
    let mut body = format!("Daily pacing report for {date}\n\n");

    body.push_str(&format!("Paused accounts ({}):\n", digest.paused.len()));
    if digest.paused.is_empty() {
        body.push_str("  none\n");
    }
    for row in &digest.paused {
        body.push_str(&format!(
            "  {} | {} | clicks {} | cost {:.2} | impressions {} | CTR {:.2}%\n",
            row.op,
            row.account,
            row.metrics.clicks_platform,
            row.metrics.cost,
            row.metrics.impressions,
            row.metrics.ctr * 100.0,
        ));
    }

    body.push_str(&format!("\nAdjusted accounts ({}):\n", digest.processed.len()));
    if digest.processed.is_empty() {
        body.push_str("  none\n");
    }
    for snapshot in &digest.processed {
        body.push_str(&format_line(snapshot));
        body.push('\n');
    }
    body
}

/// Machine-readable paused-accounts attachment:
/// `{"date":[y,m,d],"stats":{"OP...":{...}}}`.
pub fn paused_json(digest: &DailyDigest, date: NaiveDate) -> String {
    let mut stats = serde_json::Map::new();
    for row in &digest.paused {
        stats.insert(
            row.op.clone(),
            json!({
                "account": row.account,
                "clicks": row.metrics.clicks_platform,
                "cost": row.metrics.cost,
                "impressions": row.metrics.impressions,
                "ctr": row.metrics.ctr,
            }),
        );
    }
    json!({
        "date": [date.year(), date.month(), date.day()],
        "stats": stats,
    })
    .to_string()
}

/// The digest email, with the paused-accounts JSON attached when any
/// account is being held paused.
pub fn digest_emails(
    digest: &DailyDigest,
    date: NaiveDate,
    recipients: &[String],
) -> Vec<EmailMessage> {
    if digest.is_empty() {
        return Vec::new();
    }
    let body = digest_body(digest, date);
    let attachment = (!digest.paused.is_empty()).then(|| Attachment {
        file_name: format!("paused_{date}.json"),
        mime_type: "application/json".to_string(),
        content: paused_json(digest, date),
    });
    recipients
        .iter()
        .map(|recipient| EmailMessage {
            recipient: recipient.clone(),
            subject: format!("Daily pacing report {date}"),
            body: body.clone(),
            attachment: attachment.clone(),
        })
        .collect()
}

// ── Monthly report ─────────────────────────────────────────────

/// One account's previous-month totals.
#[derive(Debug, Clone)]
pub struct MonthlyRow {
    pub op: String,
    pub account: String,
    pub stats: WindowStats,
}

pub fn monthly_body(rows: &[MonthlyRow], month: NaiveDate) -> String {
    let mut body = format!(
        "Monthly report for {}-{:02} ({} accounts)\n\n",
        month.year(),
        month.month(),
        rows.len()
    );
    for row in rows {
        body.push_str(&format!(
            "{} | {} | impressions {} | clicks {} | cost {:.2} | CTR {:.2}% | CPC {:.2}\n",
            row.op,
            row.account,
            row.stats.impressions,
            row.stats.clicks,
            row.stats.cost,
            row.stats.ctr * 100.0,
            row.stats.avg_cpc,
        ));
    }
    body
}

/// Semicolon-separated CSV, one row per account.
pub fn monthly_csv(rows: &[MonthlyRow]) -> String {
    let mut csv = String::from("op;account;impressions;clicks;cost;ctr;avg_cpc\n");
    for row in rows {
        csv.push_str(&format!(
            "{};{};{};{};{:.2};{:.4};{:.2}\n",
            row.op,
            row.account,
            row.stats.impressions,
            row.stats.clicks,
            row.stats.cost,
            row.stats.ctr,
            row.stats.avg_cpc,
        ));
    }
    csv
}

pub fn monthly_json(rows: &[MonthlyRow], month: NaiveDate) -> String {
    let mut stats = serde_json::Map::new();
    for row in rows {
        stats.insert(
            row.op.clone(),
            json!({
                "account": row.account,
                "impressions": row.stats.impressions,
                "clicks": row.stats.clicks,
                "cost": row.stats.cost,
                "ctr": row.stats.ctr,
                "avg_cpc": row.stats.avg_cpc,
            }),
        );
    }
    json!({
        "month": [month.year(), month.month()],
        "stats": stats,
    })
    .to_string()
}

/// Two messages per recipient: the report with the CSV attached and
/// a JSON companion for downstream tooling.
pub fn monthly_emails(
    rows: &[MonthlyRow],
    month: NaiveDate,
    recipients: &[String],
) -> Vec<EmailMessage> {
    let tag = format!("{}-{:02}", month.year(), month.month());
    let body = monthly_body(rows, month);
    let csv = Attachment {
        file_name: format!("monthly_{tag}.csv"),
        mime_type: "text/csv".to_string(),
        content: monthly_csv(rows),
    };
    let json = Attachment {
        file_name: format!("monthly_{tag}.json"),
        mime_type: "application/json".to_string(),
        content: monthly_json(rows, month),
    };
    let mut out = Vec::with_capacity(recipients.len() * 2);
    for recipient in recipients {
        out.push(EmailMessage {
            recipient: recipient.clone(),
            subject: format!("Monthly report {tag}"),
            body: body.clone(),
            attachment: Some(csv.clone()),
        });
        out.push(EmailMessage {
            recipient: recipient.clone(),
            subject: format!("Monthly report {tag} (JSON)"),
            body: String::new(),
            attachment: Some(json.clone()),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paused_row() -> PausedRow {
        PausedRow {
            op: "OP0710307".into(),
            account: "Acme d.o.o.".into(),
            metrics: PausedMetrics { clicks_platform: 80, cost: 12.5, impressions: 4000, ctr: 0.02 },
        }
    }

    #[test]
    fn empty_digest_sends_nothing() {
        let digest = DailyDigest::default();
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert!(digest_emails(&digest, date, &["x@example.com".into()]).is_empty());
    }

    #[test]
    fn paused_accounts_attach_json() {
        let digest = DailyDigest { paused: vec![paused_row()], processed: vec![] };
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let emails = digest_emails(&digest, date, &["x@example.com".into()]);
        assert_eq!(emails.len(), 1);
        let attachment = emails[0].attachment.as_ref().expect("JSON attachment");
        let parsed: serde_json::Value = serde_json::from_str(&attachment.content).unwrap();
        assert_eq!(parsed["date"][2], 10);
        assert_eq!(parsed["stats"]["OP0710307"]["clicks"], 80);
    }

    #[test]
    fn monthly_csv_has_header_and_rows() {
        let rows = vec![MonthlyRow {
            op: "OP0710307".into(),
            account: "Acme".into(),
            stats: WindowStats { impressions: 900, clicks: 45, cost: 7.2, ctr: 0.05, avg_cpc: 0.16 },
        }];
        let csv = monthly_csv(&rows);
        assert!(csv.starts_with("op;account;"));
        assert!(csv.contains("OP0710307;Acme;900;45;7.20;"), "csv was: {csv}");
    }
}
