//! reqwest-backed implementation of [`BarkBackend`] and [`MarketSource`].
//!
//! All endpoints are public; no auth headers are needed.

use super::{
    interpret_lookup, ApiError, BarkBackend, BarkPowerRecord, LeaderboardEntry,
    LeaderboardPosition, Lookup, MirrorAccount, TokenBalances, UserRecord,
};
use crate::classify::{AccountId, SocialHandle};
use crate::config::ApiConfig;
use crate::market::{MarketSource, PoolResponse, TradesResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub struct HttpBackend {
    client: reqwest::Client,
    backend_url: String,
    mirror_node_url: String,
    gecko_terminal_url: String,
    network: String,
    token_id: String,
    pool_address: String,
}

impl HttpBackend {
    pub fn new(api: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            backend_url: api.backend_url.trim_end_matches('/').to_string(),
            mirror_node_url: api.mirror_node_url.trim_end_matches('/').to_string(),
            gecko_terminal_url: api.gecko_terminal_url.trim_end_matches('/').to_string(),
            network: api.network.clone(),
            token_id: api.token_id.clone(),
            pool_address: api.pool_address.clone(),
        })
    }

    fn leaderboard_url(&self, rest: &str) -> String {
        format!("{}/barking-power/leaderboard/{}", self.backend_url, rest)
    }

    fn pool_url(&self) -> String {
        format!(
            "{}/networks/{}/pools/{}",
            self.gecko_terminal_url, self.network, self.pool_address
        )
    }

    /// GET a route that may answer with the not-found sentinel.
    async fn get_lookup<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &'static str,
    ) -> Result<Lookup<T>, ApiError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(url = url, status = status.as_u16(), "backend lookup");
        interpret_lookup(status, &body, what)
    }

    /// GET a route where anything but 2xx is an error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &'static str,
    ) -> Result<T, ApiError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        debug!(url = url, status = status.as_u16(), bytes = body.len(), "fetched");
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { what, source })
    }
}

#[async_trait]
impl BarkBackend for HttpBackend {
    async fn user_by_account(&self, id: &AccountId) -> Result<Lookup<UserRecord>, ApiError> {
        let url = format!("{}/users/{}", self.backend_url, id);
        self.get_lookup(&url, "user").await
    }

    async fn user_by_handle(
        &self,
        handle: &SocialHandle,
    ) -> Result<Lookup<UserRecord>, ApiError> {
        // handles are free text; `#` or `?` would otherwise end the path
        let url = format!(
            "{}/users/twitter/{}",
            self.backend_url,
            urlencoding::encode(handle.as_str())
        );
        self.get_lookup(&url, "user").await
    }

    async fn barking_power(&self, id: &AccountId) -> Result<Lookup<BarkPowerRecord>, ApiError> {
        let url = format!("{}/barking-power/{}", self.backend_url, id);
        self.get_lookup(&url, "barking power").await
    }

    async fn token_balance(&self, id: &AccountId) -> Result<u64, ApiError> {
        let url = format!(
            "{}/tokens/{}/balances?account.id={}",
            self.mirror_node_url, self.token_id, id
        );
        let balances: TokenBalances = self.get_json(&url, "token balances").await?;
        Ok(balances.first_balance())
    }

    async fn received_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError> {
        let url = self.leaderboard_url(&format!("{}/position", id));
        self.get_json(&url, "barks received position").await
    }

    async fn given_position(&self, id: &AccountId) -> Result<LeaderboardPosition, ApiError> {
        let url = self.leaderboard_url(&format!("totalBarksDonated/{}/position", id));
        self.get_json(&url, "barks given position").await
    }

    async fn received_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let url = self.leaderboard_url(&limit.to_string());
        self.get_json(&url, "barks received leaderboard").await
    }

    async fn remaining_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let url = self.leaderboard_url(&format!("barkingPower/{}", limit));
        self.get_json(&url, "barking power leaderboard").await
    }

    async fn mirror_account(&self, evm_address: &str) -> Result<Option<AccountId>, ApiError> {
        let url = format!(
            "{}/accounts/{}",
            self.mirror_node_url,
            urlencoding::encode(evm_address)
        );
        let account: MirrorAccount = self.get_json(&url, "mirror account").await?;
        Ok(account.account.and_then(|a| a.parse().ok()))
    }
}

#[async_trait]
impl MarketSource for HttpBackend {
    async fn pool(&self) -> Result<PoolResponse, ApiError> {
        let url = format!("{}?include=base_token%2Cquote_token", self.pool_url());
        self.get_json(&url, "pool").await
    }

    async fn trades(&self) -> Result<TradesResponse, ApiError> {
        let url = format!("{}/trades", self.pool_url());
        self.get_json(&url, "trades").await
    }
}
