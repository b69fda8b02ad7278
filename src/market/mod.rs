//! $HBARK market data from the GeckoTerminal pool.
//!
//! GeckoTerminal sends most numbers as JSON strings, so every numeric
//! field goes through `lenient_f64`. Trade history is enriched with the
//! sender's Hedera account, linked handle and $HBARK balance; enrichment
//! is best-effort and never fails the history.

use crate::api::{lenient_f64, ApiError, BarkBackend, Lookup};
use crate::classify::AccountId;
use crate::view::{escape_html, format_balance, format_count};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const HBAR_ADDRESS: &str = "0x0000000000000000000000000000000000163b5a";
pub const HBARK_ADDRESS: &str = "0x00000000000000000000000000000000004ca367";
const NETWORK_PREFIX: &str = "hedera-hashgraph_";
const UNKNOWN_HANDLE: &str = "Unknown";

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Pool attributes with base/quote token relationships included.
    async fn pool(&self) -> Result<PoolResponse, ApiError>;

    /// Most recent swaps on the pool, in whatever order the API returns.
    async fn trades(&self) -> Result<TradesResponse, ApiError>;
}

// --- GeckoTerminal wire types ---

#[derive(Debug, Clone, Deserialize)]
pub struct PoolResponse {
    pub data: PoolData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolData {
    pub attributes: PoolAttributes,
    #[serde(default)]
    pub relationships: PoolRelationships,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub base_token_price_usd: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quote_token_price_usd: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub base_token_price_quote_token: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quote_token_price_base_token: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fdv_usd: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reserve_in_usd: f64,
    #[serde(default)]
    pub volume_usd: Window<Amount>,
    #[serde(default)]
    pub price_change_percentage: Window<Amount>,
    #[serde(default)]
    pub transactions: Window<TxCounts>,
}

/// GeckoTerminal buckets stats by window; only the 24h one is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Window<T> {
    #[serde(default)]
    pub h24: T,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(transparent)]
pub struct Amount(#[serde(deserialize_with = "lenient_f64")] pub f64);

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TxCounts {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolRelationships {
    #[serde(default)]
    pub base_token: Option<Relationship>,
    #[serde(default)]
    pub quote_token: Option<Relationship>,
    #[serde(default)]
    pub dex: Option<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    pub data: RelationshipData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipData {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradesResponse {
    #[serde(default)]
    pub data: Vec<TradeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeData {
    pub attributes: TradeAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeAttributes {
    pub block_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub tx_from_address: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub from_token_address: String,
    #[serde(default)]
    pub to_token_address: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub from_token_amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub to_token_amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_from_in_usd: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_to_in_usd: f64,
}

pub fn strip_network_prefix(id: &str) -> &str {
    id.strip_prefix(NETWORK_PREFIX).unwrap_or(id)
}

/// Round to `decimals` places, matching how prices are shown.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// --- Pool summary ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub name: String,
    pub base_price_usd: f64,
    pub quote_price_usd: f64,
    pub base_in_quote: f64,
    pub quote_in_base: f64,
    pub fdv_usd: f64,
    pub volume_24h_usd: f64,
    pub reserve_usd: f64,
    pub price_change_24h: f64,
    pub buys_24h: u64,
    pub sells_24h: u64,
    pub base_token: Option<String>,
    pub quote_token: Option<String>,
    pub dex: Option<String>,
}

impl PoolSummary {
    pub fn from_response(resp: &PoolResponse) -> Self {
        let a = &resp.data.attributes;
        let rel = &resp.data.relationships;
        let token = |r: &Option<Relationship>| {
            r.as_ref()
                .map(|r| strip_network_prefix(&r.data.id).to_string())
        };

        Self {
            name: a.name.clone(),
            base_price_usd: a.base_token_price_usd,
            quote_price_usd: a.quote_token_price_usd,
            base_in_quote: a.base_token_price_quote_token,
            quote_in_base: a.quote_token_price_base_token,
            fdv_usd: a.fdv_usd,
            volume_24h_usd: a.volume_usd.h24.0,
            reserve_usd: a.reserve_in_usd,
            price_change_24h: a.price_change_percentage.h24.0,
            buys_24h: a.transactions.h24.buys,
            sells_24h: a.transactions.h24.sells,
            base_token: token(&rel.base_token),
            quote_token: token(&rel.quote_token),
            dex: rel.dex.as_ref().map(|d| d.data.id.clone()),
        }
    }

    fn lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Pool Name", self.name.clone()),
            ("$hbark Token Price (USD)", format!("${:.7}", self.base_price_usd)),
            ("$hbar Token Price (USD)", format!("${:.4}", self.quote_price_usd)),
            ("1 $hbark =", format!("{:.8} $hbar", self.base_in_quote)),
            ("1 $hbar =", format!("{:.2} $hbark", self.quote_in_base)),
            ("Fully Diluted Valuation (USD)", format!("${}", format_count(self.fdv_usd))),
            ("Price Change (24h)", format!("{}%", self.price_change_24h)),
            ("Volume (24h USD)", format!("${}", format_count(self.volume_24h_usd))),
            ("Liquidity (USD)", format!("${}", format_count(self.reserve_usd))),
            (
                "Transactions (24h)",
                format!("{} Buys, {} Sells", self.buys_24h, self.sells_24h),
            ),
        ];
        if let Some(dex) = &self.dex {
            lines.push(("DEX", dex.clone()));
        }
        if let Some(base) = &self.base_token {
            lines.push(("Base Token Contract", base.clone()));
        }
        if let Some(quote) = &self.quote_token {
            lines.push(("Quote Token Contract", quote.clone()));
        }
        lines
    }

    pub fn to_html(&self) -> String {
        self.lines()
            .into_iter()
            .map(|(label, value)| {
                format!(
                    "<p><strong>{}</strong> {}</p>\n",
                    escape_html(label),
                    escape_html(&value)
                )
            })
            .collect()
    }

    pub fn to_text(&self) -> String {
        self.lines()
            .into_iter()
            .map(|(label, value)| format!("  {:<32} {}\n", label, value))
            .collect()
    }
}

pub async fn fetch_pool_summary<M: MarketSource + ?Sized>(
    source: &M,
) -> Result<PoolSummary, ApiError> {
    let resp = source.pool().await?;
    let summary = PoolSummary::from_response(&resp);
    info!(
        pool = %summary.name,
        price_usd = summary.base_price_usd,
        volume_24h = summary.volume_24h_usd,
        "fetched pool summary"
    );
    Ok(summary)
}

// --- Trade history ---

fn token_alias(address: &str) -> String {
    match address {
        HBAR_ADDRESS => "HBAR".to_string(),
        HBARK_ADDRESS => "HBARK".to_string(),
        other => other.to_string(),
    }
}

/// USD totals keep 7 decimals for HBARK (sub-cent price), 2 otherwise.
fn usd_total(amount: f64, price: f64, token: &str) -> f64 {
    round_to(amount * price, if token == "HBARK" { 7 } else { 2 })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub number: usize,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub kind: String,
    pub from_address: Option<String>,
    pub twitter: String,
    pub hbark_balance: u64,
    pub from_amount: f64,
    pub from_token: String,
    pub price_from_usd: f64,
    pub total_from_usd: f64,
    pub to_amount: f64,
    pub to_token: String,
    pub price_to_usd: f64,
    pub total_to_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeHistory {
    pub trades: Vec<TradeRecord>,
}

impl TradeHistory {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for t in &self.trades {
            out.push_str(&format!(
                "  #{:<3} {}  {:<4} {} {} (${}) -> {} {} (${})\n",
                t.number,
                t.timestamp.format("%Y-%m-%d %H:%M:%S"),
                t.kind,
                format_count(t.from_amount),
                t.from_token,
                t.total_from_usd,
                format_count(t.to_amount),
                t.to_token,
                t.total_to_usd,
            ));
            out.push_str(&format!(
                "        account: {}  twitter: {}  $hbark: {}\n",
                t.from_address.as_deref().unwrap_or("?"),
                t.twitter,
                format_balance(t.hbark_balance),
            ));
        }
        out
    }
}

/// Mirror account, handle and balance for one trade sender.
struct Sender {
    account: Option<AccountId>,
    twitter: String,
}

async fn identify_sender<B: BarkBackend + ?Sized>(backend: &B, evm_address: &str) -> Sender {
    let account = match backend.mirror_account(evm_address).await {
        Ok(account) => account,
        Err(e) => {
            warn!(address = evm_address, error = %e, "mirror account lookup failed");
            None
        }
    };

    let twitter = match &account {
        Some(id) => match backend.user_by_account(id).await {
            Ok(Lookup::Found(user)) => user.twitter_handle().map(str::to_string),
            Ok(Lookup::NotFound) => None,
            Err(e) => {
                warn!(account = %id, error = %e, "user lookup failed");
                None
            }
        },
        None => None,
    };

    Sender {
        account,
        twitter: twitter.unwrap_or_else(|| UNKNOWN_HANDLE.to_string()),
    }
}

/// Fetch recent trades, oldest first, each enriched with its sender.
pub async fn fetch_trade_history<M, B>(market: &M, backend: &B) -> Result<TradeHistory, ApiError>
where
    M: MarketSource + ?Sized,
    B: BarkBackend + ?Sized,
{
    let mut trades = market.trades().await?.data;
    trades.sort_by_key(|t| t.attributes.block_timestamp);

    let mut balances: HashMap<String, u64> = HashMap::new();
    let mut records = Vec::with_capacity(trades.len());

    for (i, trade) in trades.iter().enumerate() {
        let a = &trade.attributes;
        let sender = identify_sender(backend, &a.tx_from_address).await;

        let hbark_balance = match &sender.account {
            Some(id) => match balances.get(id.as_str()) {
                Some(b) => *b,
                None => {
                    let balance = backend.token_balance(id).await.unwrap_or_else(|e| {
                        warn!(account = %id, error = %e, "balance lookup failed");
                        0
                    });
                    balances.insert(id.to_string(), balance);
                    balance
                }
            },
            None => 0,
        };

        let from_token = token_alias(&a.from_token_address);
        let to_token = token_alias(&a.to_token_address);
        let from_amount = a.from_token_amount.round();
        let to_amount = a.to_token_amount.round();

        records.push(TradeRecord {
            number: i + 1,
            timestamp: a.block_timestamp,
            tx_hash: a.tx_hash.clone(),
            kind: a.kind.to_uppercase(),
            from_address: sender.account.as_ref().map(|id| id.to_string()),
            twitter: sender.twitter,
            hbark_balance,
            from_amount,
            price_from_usd: round_to(a.price_from_in_usd, 7),
            total_from_usd: usd_total(from_amount, a.price_from_in_usd, &from_token),
            from_token,
            to_amount,
            price_to_usd: round_to(a.price_to_in_usd, 7),
            total_to_usd: usd_total(to_amount, a.price_to_in_usd, &to_token),
            to_token,
        });
    }

    debug!(
        trades = records.len(),
        senders = balances.len(),
        "built trade history"
    );
    Ok(TradeHistory { trades: records })
}
