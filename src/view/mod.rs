//! Presentation of aggregated results.
//!
//! `render` is pure: it maps an [`AggregateResult`] to a [`ViewModel`]
//! which can then be written out as an HTML fragment (dashboard) or as
//! plain text (CLI). Nothing here touches the network.

use crate::aggregate::{AggregateResult, LeaderboardRanks};
use crate::api::{BarkPowerRecord, LeaderboardEntry};
use serde::Serialize;

const HASHSCAN_ACCOUNT_URL: &str = "https://hashscan.io/mainnet/account";
const PROGRESS_WIDTH: usize = 30;

/// Floor and group thousands the way the en-US locale does (`1,234,567`).
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    group_thousands(value.floor() as i64)
}

pub fn group_thousands(value: i64) -> String {
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Token balances are unsigned and may exceed `i64::MAX`.
pub fn format_balance(value: u64) -> String {
    group_digits(&value.to_string())
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn hashscan_url(account_id: &str) -> String {
    format!("{}/{}", HASHSCAN_ACCOUNT_URL, account_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UsageIndicator {
    Used { percent: f64 },
    /// Nothing was allocated today, so there is no meaningful ratio.
    NoPowerToUse,
}

impl UsageIndicator {
    pub fn from_allocation(allocated: f64, remaining: f64) -> Self {
        let used = allocated - remaining;
        let percent = used / allocated * 100.0;
        if allocated == 0.0 || !percent.is_finite() {
            UsageIndicator::NoPowerToUse
        } else {
            UsageIndicator::Used { percent }
        }
    }

    pub fn caption(&self) -> String {
        match self {
            UsageIndicator::Used { percent } => format!("{}% Used", percent.floor() as i64),
            UsageIndicator::NoPowerToUse => "No Bark Power to Use".to_string(),
        }
    }

    /// Bar fill, clamped to 0..=100. The sentinel state renders full.
    pub fn fill_percent(&self) -> f64 {
        match self {
            UsageIndicator::Used { percent } => percent.clamp(0.0, 100.0),
            UsageIndicator::NoPowerToUse => 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarkFigures {
    pub refilled: f64,
    pub remaining: f64,
    pub used_today: f64,
    pub total_given: f64,
    pub total_received: f64,
}

impl BarkFigures {
    fn from_record(allocated: f64, record: &BarkPowerRecord) -> Self {
        Self {
            refilled: allocated,
            remaining: record.barking_power,
            used_today: allocated - record.barking_power,
            total_given: record.total_barks_donated,
            total_received: record.barks_received.unwrap_or(0.0),
        }
    }
}

/// The collapsible "more details" block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountDetails {
    pub account_id: Option<String>,
    pub twitter_handle: Option<String>,
    /// `None` renders as "N/A" in the detailed view.
    pub token_balance: Option<u64>,
    /// HODL balance at last refill (`hodlRelativeBarkingPower / 2`).
    pub hodl_balance: Option<f64>,
    /// LP balance at last refill (`lpRelativeBarkingPower / 3`).
    pub lp_balance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Body {
    Detailed {
        figures: BarkFigures,
        usage: UsageIndicator,
        details: AccountDetails,
    },
    ReceivedOnly {
        total_received: f64,
    },
    Basic {
        token_balance: Option<u64>,
        details: Option<AccountDetails>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub label: Option<String>,
    pub body: Option<Body>,
    pub ranks: Option<LeaderboardRanks>,
    pub details_expanded: bool,
    pub error: Option<String>,
}

/// One rendered line, shared by the HTML and text writers.
struct Line {
    label: &'static str,
    value: String,
    link: Option<String>,
}

impl Line {
    fn new(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            link: None,
        }
    }

    fn linked(label: &'static str, value: String, link: String) -> Self {
        Self {
            label,
            value,
            link: Some(link),
        }
    }
}

pub fn render(result: &AggregateResult, details_expanded: bool) -> ViewModel {
    let handle = result
        .user
        .as_ref()
        .and_then(|u| u.twitter_handle())
        .map(str::to_string);

    let body = match result.bark_power.as_ref() {
        Some(record) if record.today_allocated_barks.is_some() => {
            let allocated = record.today_allocated_barks.unwrap_or(0.0);
            Body::Detailed {
                figures: BarkFigures::from_record(allocated, record),
                usage: UsageIndicator::from_allocation(allocated, record.barking_power),
                details: AccountDetails {
                    account_id: record
                        .account_id
                        .clone()
                        .or_else(|| result.account_id.clone()),
                    twitter_handle: handle,
                    token_balance: result.token_balance,
                    hodl_balance: Some(record.hodl_relative_barking_power / 2.0),
                    lp_balance: Some(record.lp_relative_barking_power / 3.0),
                },
            }
        }
        Some(BarkPowerRecord {
            barks_received: Some(received),
            ..
        }) => Body::ReceivedOnly {
            total_received: *received,
        },
        _ => {
            let details = (result.account_id.is_some() || handle.is_some()).then(|| {
                AccountDetails {
                    account_id: result.account_id.clone(),
                    twitter_handle: handle,
                    ..Default::default()
                }
            });
            Body::Basic {
                token_balance: result.token_balance,
                details,
            }
        }
    };

    ViewModel {
        label: Some(result.label.to_string()),
        body: Some(body),
        ranks: result.ranks.source.map(|_| result.ranks.clone()),
        details_expanded,
        error: None,
    }
}

impl ViewModel {
    /// Cleared state: every optional section hidden.
    pub fn baseline() -> Self {
        Self {
            label: None,
            body: None,
            ranks: None,
            details_expanded: false,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::baseline()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.is_none() && self.body.is_none() && self.error.is_none()
    }

    pub fn usage(&self) -> Option<UsageIndicator> {
        match &self.body {
            Some(Body::Detailed { usage, .. }) => Some(*usage),
            _ => None,
        }
    }

    /// Whether a "show more details" control makes sense for this body.
    pub fn has_details(&self) -> bool {
        match &self.body {
            Some(Body::Detailed { .. }) => true,
            Some(Body::Basic { details, .. }) => details.is_some(),
            _ => false,
        }
    }

    pub fn toggle_details(&mut self) {
        if self.has_details() {
            self.details_expanded = !self.details_expanded;
        }
    }

    fn main_lines(&self) -> Vec<Line> {
        let mut lines = Vec::new();
        if let Some(label) = &self.label {
            lines.push(Line::new("Account Label", label.clone()));
        }
        match &self.body {
            Some(Body::Detailed { figures, .. }) => {
                lines.push(Line::new("Bark Power Refilled", format_count(figures.refilled)));
                lines.push(Line::new(
                    "Barking Power Remaining",
                    format_count(figures.remaining),
                ));
                lines.push(Line::new(
                    "Bark Power Used Today",
                    format_count(figures.used_today),
                ));
                lines.push(Line::new("Total Barks Given", format_count(figures.total_given)));
                lines.push(Line::new(
                    "Total Barks Received",
                    format_count(figures.total_received),
                ));
            }
            Some(Body::ReceivedOnly { total_received }) => {
                lines.push(Line::new("Total Barks Received", format_count(*total_received)));
            }
            Some(Body::Basic { token_balance, .. }) => {
                if let Some(balance) = token_balance {
                    lines.push(Line::new(
                        "$hbark Token Balance",
                        format_balance(*balance),
                    ));
                }
            }
            None => {}
        }
        lines
    }

    fn detail_lines(&self) -> Vec<Line> {
        let mut lines = Vec::new();
        let (details, full) = match &self.body {
            Some(Body::Detailed { details, .. }) => (details, true),
            Some(Body::Basic {
                details: Some(details),
                ..
            }) => (details, false),
            _ => return lines,
        };

        if let Some(id) = &details.account_id {
            lines.push(Line::linked("Account ID", id.clone(), hashscan_url(id)));
        }
        if let Some(handle) = &details.twitter_handle {
            lines.push(Line::new("Twitter Handle", format!("@{}", handle)));
        }
        if full {
            lines.push(Line::new(
                "$hbark Token Balance",
                details
                    .token_balance
                    .map(format_balance)
                    .unwrap_or_else(|| "N/A".to_string()),
            ));
            if let Some(hodl) = details.hodl_balance {
                lines.push(Line::new(
                    "$hBARK Balance (HODL) at time of last refill",
                    format_count(hodl),
                ));
            }
            if let Some(lp) = details.lp_balance {
                lines.push(Line::new(
                    "$hBARK Balance (LP) at time of last refill",
                    format_count(lp),
                ));
            }
        }
        lines
    }

    fn rank_lines(&self) -> Vec<Line> {
        let Some(ranks) = &self.ranks else {
            return Vec::new();
        };
        let show = |r: Option<u64>| r.map(|r| r.to_string()).unwrap_or_else(|| "n/a".into());
        vec![
            Line::new("Barks Given Leaderboard Position", show(ranks.given)),
            Line::new("Barks Received Leaderboard Position", show(ranks.received)),
        ]
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();

        if let Some(error) = &self.error {
            html.push_str(&format!("<p class=\"error\">{}</p>\n", escape_html(error)));
            return html;
        }

        for line in self.main_lines() {
            html.push_str(&line_html(&line));
        }

        if let Some(usage) = self.usage() {
            let color = match usage {
                UsageIndicator::Used { .. } => "#00cc99",
                UsageIndicator::NoPowerToUse => "#ff0000",
            };
            html.push_str(&format!(
                "<div class=\"progress\"><div class=\"progress-bar\" style=\"width:{:.2}%;background-color:{}\">{}</div></div>\n",
                usage.fill_percent(),
                color,
                escape_html(&usage.caption()),
            ));
        }

        let details = self.detail_lines();
        if !details.is_empty() {
            let display = if self.details_expanded { "block" } else { "none" };
            html.push_str(&format!(
                "<hr>\n<div id=\"extraDetails\" class=\"toggle-section\" style=\"display:{}\">\n",
                display
            ));
            for line in &details {
                html.push_str(&line_html(line));
            }
            html.push_str("</div>\n");
        }

        let ranks = self.rank_lines();
        if !ranks.is_empty() {
            html.push_str("<div id=\"leaderboardPositions\">\n");
            for line in &ranks {
                html.push_str(&line_html(line));
            }
            html.push_str("</div>\n");
        }

        html
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if let Some(error) = &self.error {
            out.push_str(&format!("  error: {}\n", error));
            return out;
        }

        for line in self.main_lines() {
            out.push_str(&format!("  {}: {}\n", line.label, line.value));
        }

        if let Some(usage) = self.usage() {
            let filled = ((usage.fill_percent() / 100.0) * PROGRESS_WIDTH as f64).round() as usize;
            let glyph = match usage {
                UsageIndicator::Used { .. } => '#',
                UsageIndicator::NoPowerToUse => 'x',
            };
            out.push_str(&format!(
                "  [{}{}] {}\n",
                glyph.to_string().repeat(filled),
                "-".repeat(PROGRESS_WIDTH - filled.min(PROGRESS_WIDTH)),
                usage.caption()
            ));
        }

        if self.details_expanded {
            let details = self.detail_lines();
            if !details.is_empty() {
                out.push_str("\n  ## Details\n");
                for line in &details {
                    match &line.link {
                        Some(link) => out.push_str(&format!(
                            "  {}: {} ({})\n",
                            line.label, line.value, link
                        )),
                        None => out.push_str(&format!("  {}: {}\n", line.label, line.value)),
                    }
                }
            }
        }

        let ranks = self.rank_lines();
        if !ranks.is_empty() {
            out.push('\n');
            for line in &ranks {
                out.push_str(&format!("  {}: {}\n", line.label, line.value));
            }
        }

        out
    }
}

fn line_html(line: &Line) -> String {
    match &line.link {
        Some(link) => format!(
            "<p><strong>{}:</strong> <a href=\"{}\" target=\"_blank\">{}</a></p>\n",
            escape_html(line.label),
            escape_html(link),
            escape_html(&line.value)
        ),
        None => format!(
            "<p><strong>{}:</strong> {}</p>\n",
            escape_html(line.label),
            escape_html(&line.value)
        ),
    }
}

// --- Leaderboard table ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub position: usize,
    pub display_name: String,
    pub remaining: f64,
}

impl LeaderboardRow {
    /// Query that re-runs the lookup for this row when it is selected.
    pub fn query(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardTable {
    pub rows: Vec<LeaderboardRow>,
}

impl LeaderboardTable {
    pub fn from_entries(entries: &[LeaderboardEntry]) -> Self {
        let rows = entries
            .iter()
            .enumerate()
            .map(|(i, e)| LeaderboardRow {
                position: i + 1,
                display_name: e.display_name().to_string(),
                remaining: e.barking_power,
            })
            .collect();
        Self { rows }
    }

    pub fn row(&self, position: usize) -> Option<&LeaderboardRow> {
        position.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Table body rows; each name links back into the lookup route.
    pub fn to_html(&self, check_path: &str) -> String {
        if self.rows.is_empty() {
            return "<tr><td colspan=\"3\" style=\"text-align:center;color:#666\">No leaderboard data</td></tr>"
                .to_string();
        }
        self.rows
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td><a href=\"{}?q={}\">{}</a></td><td>{}</td></tr>",
                    r.position,
                    check_path,
                    urlencoding::encode(r.query()),
                    escape_html(&r.display_name),
                    format_count(r.remaining),
                )
            })
            .collect()
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("  {:>5}  {:<32} {:>16}\n", "#", "Twitter User", "Barks Remaining");
        for r in &self.rows {
            out.push_str(&format!(
                "  {:>5}  {:<32} {:>16}\n",
                r.position,
                r.display_name,
                format_count(r.remaining)
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AccountLabel, RankSource};
    use crate::api::UserRecord;

    fn base(label: AccountLabel) -> AggregateResult {
        AggregateResult {
            label,
            bark_power: None,
            user: None,
            token_balance: None,
            account_id: None,
            ranks: LeaderboardRanks::default(),
            link_status: None,
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.9), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(1234567.89), "1,234,567");
        assert_eq!(format_count(-1500.0), "-1,500");
        assert_eq!(format_count(f64::NAN), "N/A");
        assert_eq!(group_thousands(100_000), "100,000");
        assert_eq!(group_thousands(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn test_format_balance_full_u64_range() {
        assert_eq!(format_balance(0), "0");
        assert_eq!(format_balance(420_000_000), "420,000,000");
        assert_eq!(format_balance(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_usage_percentage() {
        let usage = UsageIndicator::from_allocation(500.0, 125.0);
        assert_eq!(usage, UsageIndicator::Used { percent: 75.0 });
        assert_eq!(usage.caption(), "75% Used");

        let untouched = UsageIndicator::from_allocation(200.0, 200.0);
        assert_eq!(untouched, UsageIndicator::Used { percent: 0.0 });
    }

    #[test]
    fn test_zero_allocation_is_sentinel() {
        let usage = UsageIndicator::from_allocation(0.0, 0.0);
        assert_eq!(usage, UsageIndicator::NoPowerToUse);
        assert_eq!(usage.caption(), "No Bark Power to Use");
        assert_eq!(usage.fill_percent(), 100.0);

        let usage = UsageIndicator::from_allocation(0.0, 5.0);
        assert_eq!(usage, UsageIndicator::NoPowerToUse);
    }

    #[test]
    fn test_detailed_view() {
        let result = AggregateResult {
            bark_power: Some(BarkPowerRecord {
                account_id: None,
                today_allocated_barks: Some(500.0),
                barking_power: 125.0,
                total_barks_donated: 2500.0,
                barks_received: Some(1200.0),
                hodl_relative_barking_power: 2001.0,
                lp_relative_barking_power: 3002.0,
            }),
            user: Some(UserRecord {
                account_id: Some("0.0.999".into()),
                twitter_handle: Some("pup".into()),
                is_verified: true,
                signed_term_message: true,
            }),
            token_balance: Some(123_456),
            account_id: Some("0.0.999".into()),
            ranks: LeaderboardRanks {
                given: Some(2),
                received: None,
                source: Some(RankSource::Position),
            },
            ..base(AccountLabel::SignedTerms)
        };

        let view = render(&result, true);
        let Some(Body::Detailed { figures, usage, details }) = &view.body else {
            panic!("expected detailed body");
        };
        assert_eq!(figures.used_today, 375.0);
        assert_eq!(*usage, UsageIndicator::Used { percent: 75.0 });
        assert_eq!(details.account_id.as_deref(), Some("0.0.999"));
        assert_eq!(details.hodl_balance, Some(1000.5));
        assert_eq!(details.lp_balance.map(f64::floor), Some(1000.0));

        let text = view.to_text();
        assert!(text.contains("Account Label: Signed Terms"));
        assert!(text.contains("Bark Power Used Today: 375"));
        assert!(text.contains("75% Used"));
        assert!(text.contains("$hbark Token Balance: 123,456"));
        assert!(text.contains("HODL) at time of last refill: 1,000"));
        assert!(text.contains("Twitter Handle: @pup"));
        assert!(text.contains("Barks Given Leaderboard Position: 2"));
        assert!(text.contains("Barks Received Leaderboard Position: n/a"));

        let html = view.to_html();
        assert!(html.contains("https://hashscan.io/mainnet/account/0.0.999"));
        assert!(html.contains("display:block"));
        assert!(html.contains("$hbark Token Balance:</strong> 123,456"));
    }

    #[test]
    fn test_details_collapsed_by_default() {
        let result = AggregateResult {
            bark_power: Some(BarkPowerRecord {
                today_allocated_barks: Some(0.0),
                ..Default::default()
            }),
            account_id: Some("0.0.1".into()),
            ranks: LeaderboardRanks {
                source: Some(RankSource::Position),
                ..Default::default()
            },
            ..base(AccountLabel::RefilledNotRegistered)
        };

        let mut view = render(&result, false);
        assert_eq!(view.usage(), Some(UsageIndicator::NoPowerToUse));
        assert!(!view.to_text().contains("Account ID"));
        assert!(view.to_html().contains("display:none"));
        assert!(view.to_html().contains("No Bark Power to Use"));
        assert!(!view.to_text().contains("$hbark Token Balance"));

        view.toggle_details();
        assert!(view.details_expanded);
        let text = view.to_text();
        assert!(text.contains("Account ID: 0.0.1"));
        assert!(text.contains("$hbark Token Balance: N/A"));
    }

    #[test]
    fn test_received_only_view() {
        let result = AggregateResult {
            bark_power: Some(BarkPowerRecord::received_only(1000.0)),
            ranks: LeaderboardRanks {
                given: None,
                received: Some(5),
                source: Some(RankSource::Scan),
            },
            ..base(AccountLabel::NotLinked)
        };

        let view = render(&result, false);
        assert!(matches!(view.body, Some(Body::ReceivedOnly { .. })));
        assert!(view.usage().is_none());
        assert!(!view.has_details());

        let text = view.to_text();
        assert!(text.contains("Total Barks Received: 1,000"));
        assert!(text.contains("Barks Received Leaderboard Position: 5"));
        assert!(!text.contains("Used"));
    }

    #[test]
    fn test_basic_view_without_allocation() {
        let result = AggregateResult {
            token_balance: Some(0),
            account_id: Some("0.0.12345".into()),
            ..base(AccountLabel::NoTokenNoAllocation)
        };

        let view = render(&result, true);
        assert!(view.usage().is_none());
        assert!(view.ranks.is_none());
        assert!(view.has_details());

        let text = view.to_text();
        assert!(text.contains("$hbark Token Balance: 0"));
        assert!(text.contains("Account ID: 0.0.12345"));
        assert!(!text.contains("Leaderboard Position"));
        assert!(!text.contains("HODL"));
    }

    #[test]
    fn test_huge_balance_renders_unsigned() {
        let result = AggregateResult {
            token_balance: Some(u64::MAX),
            account_id: Some("0.0.1".into()),
            ..base(AccountLabel::HolderNoAllocation)
        };
        let text = render(&result, false).to_text();
        assert!(text.contains("$hbark Token Balance: 18,446,744,073,709,551,615"));
        assert!(!text.contains("-"));
    }

    #[test]
    fn test_baseline_and_error() {
        let blank = ViewModel::baseline();
        assert!(blank.is_blank());
        assert_eq!(blank.to_html(), "");
        assert_eq!(blank.to_text(), "");

        let err = ViewModel::error("boom <b>");
        assert!(err.label.is_none());
        assert!(err.body.is_none());
        assert_eq!(err.to_html(), "<p class=\"error\">boom &lt;b&gt;</p>\n");
    }

    #[test]
    fn test_html_escapes_dynamic_values() {
        let result = AggregateResult {
            user: Some(UserRecord {
                twitter_handle: Some("<img>".into()),
                ..Default::default()
            }),
            ..base(AccountLabel::PartiallyLinked)
        };
        let html = render(&result, true).to_html();
        assert!(html.contains("@&lt;img&gt;"));
        assert!(!html.contains("<img>"));
    }

    #[test]
    fn test_leaderboard_table() {
        let entries = vec![
            LeaderboardEntry {
                twitter_handle: Some("alpha".into()),
                account_id: "0.0.1".into(),
                barking_power: 12_500.0,
                ..Default::default()
            },
            LeaderboardEntry {
                twitter_handle: None,
                account_id: "0.0.2".into(),
                barking_power: 900.0,
                ..Default::default()
            },
        ];

        let table = LeaderboardTable::from_entries(&entries);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.row(1).unwrap().query(), "alpha");
        assert_eq!(table.row(2).unwrap().query(), "0.0.2");
        assert!(table.row(0).is_none());
        assert!(table.row(3).is_none());

        let html = table.to_html("/check");
        assert!(html.contains("<a href=\"/check?q=alpha\">alpha</a>"));
        assert!(html.contains("12,500"));

        let text = table.to_text();
        assert!(text.contains("0.0.2"));
        assert!(text.contains("900"));
    }
}
