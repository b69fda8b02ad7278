//! In-memory backend for tests.

use super::{
    ApiError, BarkBackend, BarkPowerRecord, LeaderboardEntry, LeaderboardPosition, Lookup,
    UserRecord,
};
use crate::classify::{AccountId, SocialHandle};
use crate::market::{MarketSource, PoolResponse, TradesResponse};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Configurable backend that records every call it receives.
///
/// Unknown accounts and handles answer with the not-found sentinel;
/// unknown leaderboard positions answer 404; endpoints marked with
/// [`MockBackend::failing`] answer 503.
#[derive(Default)]
pub struct MockBackend {
    users_by_account: HashMap<String, UserRecord>,
    users_by_handle: HashMap<String, UserRecord>,
    bark_power: HashMap<String, BarkPowerRecord>,
    balances: HashMap<String, u64>,
    received_positions: HashMap<String, u64>,
    given_positions: HashMap<String, u64>,
    received_board: Vec<LeaderboardEntry>,
    remaining_board: Vec<LeaderboardEntry>,
    mirror_accounts: HashMap<String, String>,
    pool: Option<serde_json::Value>,
    trades: Option<serde_json::Value>,
    failing: HashSet<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        if let Some(id) = user.account_id.clone() {
            self.users_by_account.insert(id, user.clone());
        }
        if let Some(handle) = user.twitter_handle.clone() {
            self.users_by_handle.insert(handle.to_lowercase(), user);
        }
        self
    }

    /// Register a user reachable only through the by-handle route.
    pub fn with_handle_user(mut self, handle: &str, user: UserRecord) -> Self {
        self.users_by_handle.insert(handle.to_lowercase(), user);
        self
    }

    pub fn with_bark_power(mut self, account: &str, record: BarkPowerRecord) -> Self {
        self.bark_power.insert(account.to_string(), record);
        self
    }

    pub fn with_balance(mut self, account: &str, balance: u64) -> Self {
        self.balances.insert(account.to_string(), balance);
        self
    }

    pub fn with_positions(mut self, account: &str, given: u64, received: u64) -> Self {
        self.given_positions.insert(account.to_string(), given);
        self.received_positions.insert(account.to_string(), received);
        self
    }

    pub fn with_received_board(mut self, entries: Vec<LeaderboardEntry>) -> Self {
        self.received_board = entries;
        self
    }

    pub fn with_remaining_board(mut self, entries: Vec<LeaderboardEntry>) -> Self {
        self.remaining_board = entries;
        self
    }

    pub fn with_mirror_account(mut self, evm_address: &str, account: &str) -> Self {
        self.mirror_accounts
            .insert(evm_address.to_string(), account.to_string());
        self
    }

    pub fn with_pool(mut self, pool: serde_json::Value) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_trades(mut self, trades: serde_json::Value) -> Self {
        self.trades = Some(trades);
        self
    }

    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.insert(endpoint);
        self
    }

    /// Endpoint names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    fn record(&self, endpoint: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(endpoint);
        if self.failing.contains(endpoint) {
            return Err(ApiError::Status {
                status: 503,
                body: format!("{endpoint} unavailable"),
            });
        }
        Ok(())
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, key: &str) -> Lookup<T> {
    match map.get(key) {
        Some(v) => Lookup::Found(v.clone()),
        None => Lookup::NotFound,
    }
}

fn position(map: &HashMap<String, u64>, key: &str) -> Result<LeaderboardPosition, ApiError> {
    match map.get(key) {
        Some(rank) => Ok(LeaderboardPosition { rank: Some(*rank) }),
        None => Err(ApiError::Status {
            status: 404,
            body: "position not found".to_string(),
        }),
    }
}

#[async_trait]
impl BarkBackend for MockBackend {
    async fn user_by_account(&self, id: &AccountId) -> Result<Lookup<UserRecord>, ApiError> {
        self.record("user_by_account")?;
        Ok(lookup(&self.users_by_account, id.as_str()))
    }

    async fn user_by_handle(
        &self,
        handle: &SocialHandle,
    ) -> Result<Lookup<UserRecord>, ApiError> {
        self.record("user_by_handle")?;
        Ok(lookup(
            &self.users_by_handle,
            &handle.as_str().to_lowercase(),
        ))
    }

    async fn barking_power(&self, id: &AccountId) -> Result<Lookup<BarkPowerRecord>, ApiError> {
        self.record("barking_power")?;
        Ok(lookup(&self.bark_power, id.as_str()))
    }

    async fn token_balance(&self, id: &AccountId) -> Result<u64, ApiError> {
        self.record("token_balance")?;
        Ok(self.balances.get(id.as_str()).copied().unwrap_or(0))
    }

    async fn received_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError> {
        self.record("received_position")?;
        position(&self.received_positions, id.as_str())
    }

    async fn given_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError> {
        self.record("given_position")?;
        position(&self.given_positions, id.as_str())
    }

    async fn received_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.record("received_leaderboard")?;
        Ok(self
            .received_board
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn remaining_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.record("remaining_leaderboard")?;
        Ok(self
            .remaining_board
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mirror_account(&self, evm_address: &str) -> Result<Option<AccountId>, ApiError> {
        self.record("mirror_account")?;
        Ok(self
            .mirror_accounts
            .get(evm_address)
            .and_then(|a| a.parse().ok()))
    }
}

#[async_trait]
impl MarketSource for MockBackend {
    async fn pool(&self) -> Result<PoolResponse, ApiError> {
        self.record("pool")?;
        let value = self.pool.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            what: "pool",
            source,
        })
    }

    async fn trades(&self) -> Result<TradesResponse, ApiError> {
        self.record("trades")?;
        let value = self
            .trades
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "data": [] }));
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            what: "trades",
            source,
        })
    }
}
