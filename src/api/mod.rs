//! Typed contracts for the game backend and the Hedera mirror node.
//!
//! The backend signals "no such user" with a successful response carrying
//! `code = "HBARK_USER_NOT_FOUND"` (some routes answer 404 with the same
//! body). That is surfaced as [`Lookup::NotFound`], never as an error.

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::HttpBackend;

use crate::classify::{AccountId, SocialHandle};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Sentinel `code` the backend uses for missing users / allocations.
pub const USER_NOT_FOUND_CODE: &str = "HBARK_USER_NOT_FOUND";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }
}

/// A registered player, owned by the game backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub is_verified: bool,
    /// The backend has sent both booleans and the signed message itself
    /// here; any non-empty value counts as signed.
    #[serde(default, deserialize_with = "truthy")]
    pub signed_term_message: bool,
}

impl UserRecord {
    pub fn twitter_handle(&self) -> Option<&str> {
        self.twitter_handle.as_deref().filter(|h| !h.is_empty())
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Daily barking-power allocation for one account.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarkPowerRecord {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub today_allocated_barks: Option<f64>,
    /// Remaining power for today.
    #[serde(default)]
    pub barking_power: f64,
    #[serde(default)]
    pub total_barks_donated: f64,
    #[serde(default)]
    pub barks_received: Option<f64>,
    #[serde(default)]
    pub hodl_relative_barking_power: f64,
    #[serde(default)]
    pub lp_relative_barking_power: f64,
}

impl BarkPowerRecord {
    /// Partial record for handles known only from the leaderboard.
    pub fn received_only(barks_received: f64) -> Self {
        Self {
            barks_received: Some(barks_received),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub twitter_handle: Option<String>,
    /// Empty for handles that never linked an account (sent as null).
    #[serde(default, deserialize_with = "string_or_null")]
    pub account_id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub barking_power: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub barks_received: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_barks_donated: f64,
}

impl LeaderboardEntry {
    /// Handle if linked, otherwise the account id.
    pub fn display_name(&self) -> &str {
        match self.twitter_handle.as_deref() {
            Some(h) if !h.is_empty() => h,
            _ => &self.account_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardPosition {
    #[serde(default)]
    pub rank: Option<u64>,
}

/// Mirror node `/tokens/{id}/balances` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenBalances {
    #[serde(default)]
    pub balances: Vec<TokenBalanceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenBalanceEntry {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub balance: u64,
}

impl TokenBalances {
    /// First entry's balance, 0 when the account holds none.
    pub fn first_balance(&self) -> u64 {
        self.balances.first().map(|b| b.balance).unwrap_or(0)
    }
}

/// Mirror node `/accounts/{idOrAddress}` response (only the id is used).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorAccount {
    #[serde(default)]
    pub account: Option<String>,
}

/// Everything the aggregator needs from the outside world.
#[async_trait]
pub trait BarkBackend: Send + Sync {
    async fn user_by_account(&self, id: &AccountId) -> Result<Lookup<UserRecord>, ApiError>;

    async fn user_by_handle(&self, handle: &SocialHandle)
        -> Result<Lookup<UserRecord>, ApiError>;

    async fn barking_power(&self, id: &AccountId) -> Result<Lookup<BarkPowerRecord>, ApiError>;

    /// $HBARK balance held by the account (0 when none).
    async fn token_balance(&self, id: &AccountId) -> Result<u64, ApiError>;

    /// Position on the barks-received leaderboard.
    async fn received_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError>;

    /// Position on the barks-given (total donated) leaderboard.
    async fn given_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError>;

    /// Top `limit` entries ranked by barks received.
    async fn received_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError>;

    /// Top `limit` entries ranked by remaining barking power.
    async fn remaining_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError>;

    /// Resolve an EVM address to a Hedera account id via the mirror node.
    async fn mirror_account(&self, evm_address: &str) -> Result<Option<AccountId>, ApiError>;
}

/// Interpret a backend response that may carry the not-found sentinel.
pub fn interpret_lookup<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    what: &'static str,
) -> Result<Lookup<T>, ApiError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(Lookup::NotFound);
    }

    let parsed: Result<serde_json::Value, _> = serde_json::from_str(body);

    let sentinel = parsed
        .as_ref()
        .ok()
        .and_then(|v| v.get("code"))
        .and_then(|c| c.as_str())
        .map(|c| c == USER_NOT_FOUND_CODE)
        .unwrap_or(false);
    if sentinel {
        return Ok(Lookup::NotFound);
    }

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let value = parsed.map_err(|source| ApiError::Decode { what, source })?;
    serde_json::from_value(value)
        .map(Lookup::Found)
        .map_err(|source| ApiError::Decode { what, source })
}

/// Accepts a number, a numeric string or null (0.0).
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts bool, non-empty string, non-zero number or null.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(_) => true,
    })
}
