//! Account aggregation.
//!
//! Given a classified query, fans out to the backend, merges the answers
//! into one [`AggregateResult`] and decides which [`AccountLabel`] the
//! account gets. Required lookups fail the whole resolve; leaderboard
//! positions are best-effort.

use crate::api::{
    ApiError, BarkBackend, BarkPowerRecord, LeaderboardEntry, Lookup, UserRecord,
};
use crate::classify::{AccountId, Identifier, SocialHandle};
use futures::TryFutureExt;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no barks received for @{0}")]
    NoDataForHandle(String),
    #[error("{step} lookup failed: {source}")]
    AggregationFailed {
        step: &'static str,
        #[source]
        source: ApiError,
    },
}

fn required(step: &'static str) -> impl FnOnce(ApiError) -> ResolveError {
    move |source| ResolveError::AggregationFailed { step, source }
}

/// Human-readable classification shown at the top of every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLabel {
    NoTokenNoAllocation,
    HolderNoAllocation,
    RefilledNotRegistered,
    SignedTerms,
    TwitterLinked,
    HolderAllocated,
    NotLinked,
    PartiallyLinked,
}

impl AccountLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountLabel::NoTokenNoAllocation => {
                "Account does not currently hold $HBARK and has not been allocated Bark Power"
            }
            AccountLabel::HolderNoAllocation => {
                "$HBARK Holder, but has not been allocated Bark Power"
            }
            AccountLabel::RefilledNotRegistered => {
                "Holds $HBARK and has been refilled with Bark Power"
            }
            AccountLabel::SignedTerms => "Signed Terms",
            AccountLabel::TwitterLinked => "Twitter Account Linked",
            AccountLabel::HolderAllocated => "$HBARK Holder, allocated Bark Power",
            AccountLabel::NotLinked => "Has not linked with Hedera Account",
            AccountLabel::PartiallyLinked => "Has not fully linked a Hedera Account",
        }
    }
}

impl fmt::Display for AccountLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AccountLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Label for an account the allocation service has never refilled.
pub fn no_allocation_label(token_balance: u64) -> AccountLabel {
    if token_balance > 0 {
        AccountLabel::HolderNoAllocation
    } else {
        AccountLabel::NoTokenNoAllocation
    }
}

/// Label for a registered user: signed terms beat a linked handle.
pub fn label_for_user(user: &UserRecord) -> AccountLabel {
    if user.signed_term_message {
        AccountLabel::SignedTerms
    } else if user.twitter_handle().is_some() {
        AccountLabel::TwitterLinked
    } else {
        AccountLabel::HolderAllocated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Verified and signed the terms.
    Full,
    Partial,
}

impl LinkStatus {
    pub fn of(user: &UserRecord) -> Self {
        if user.is_verified && user.signed_term_message {
            LinkStatus::Full
        } else {
            LinkStatus::Partial
        }
    }
}

/// Where a rank came from: the backend's position endpoints, or a
/// client-side scan of a leaderboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSource {
    Position,
    Scan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardRanks {
    pub given: Option<u64>,
    pub received: Option<u64>,
    pub source: Option<RankSource>,
}

impl LeaderboardRanks {
    pub fn is_empty(&self) -> bool {
        self.given.is_none() && self.received.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub label: AccountLabel,
    pub bark_power: Option<BarkPowerRecord>,
    pub user: Option<UserRecord>,
    pub token_balance: Option<u64>,
    pub account_id: Option<String>,
    pub ranks: LeaderboardRanks,
    pub link_status: Option<LinkStatus>,
}

impl AggregateResult {
    fn labelled(label: AccountLabel) -> Self {
        Self {
            label,
            bark_power: None,
            user: None,
            token_balance: None,
            account_id: None,
            ranks: LeaderboardRanks::default(),
            link_status: None,
        }
    }
}

/// 1-based position of `handle` in `entries`, compared case-insensitively.
pub fn rank_by_scan<'a>(
    entries: &'a [LeaderboardEntry],
    handle: &SocialHandle,
) -> Option<(u64, &'a LeaderboardEntry)> {
    entries
        .iter()
        .position(|e| e.twitter_handle.as_deref().is_some_and(|h| handle.matches(h)))
        .map(|idx| (idx as u64 + 1, &entries[idx]))
}

pub struct Aggregator<B: ?Sized> {
    /// Leaderboard page size used when scanning for an unlinked handle.
    scan_limit: u32,
    backend: Arc<B>,
}

impl<B: BarkBackend + ?Sized> Aggregator<B> {
    pub fn new(backend: Arc<B>, scan_limit: u32) -> Self {
        Self {
            scan_limit,
            backend,
        }
    }

    pub async fn resolve(&self, identifier: &Identifier) -> Result<AggregateResult, ResolveError> {
        debug!(query = %identifier, "resolving");
        let result = match identifier {
            Identifier::Account(id) => self.resolve_account(id).await,
            Identifier::Handle(handle) => self.resolve_handle(handle).await,
        }?;
        info!(query = %identifier, label = %result.label, "resolved account");
        Ok(result)
    }

    async fn resolve_account(&self, id: &AccountId) -> Result<AggregateResult, ResolveError> {
        let (balance, bark_power, user) = futures::try_join!(
            self.backend
                .token_balance(id)
                .map_err(required("token balance")),
            self.backend
                .barking_power(id)
                .map_err(required("barking power")),
            self.backend
                .user_by_account(id)
                .map_err(required("user registry")),
        )?;

        let Lookup::Found(bark_power) = bark_power else {
            return Ok(AggregateResult {
                token_balance: Some(balance),
                account_id: Some(id.to_string()),
                ..AggregateResult::labelled(no_allocation_label(balance))
            });
        };

        let (label, user) = match user {
            Lookup::NotFound => (AccountLabel::RefilledNotRegistered, None),
            Lookup::Found(user) => (label_for_user(&user), Some(user)),
        };
        let link_status = user.as_ref().map(LinkStatus::of);
        let ranks = self.position_ranks(id).await;

        Ok(AggregateResult {
            label,
            bark_power: Some(bark_power),
            user,
            token_balance: Some(balance),
            account_id: Some(id.to_string()),
            ranks,
            link_status,
        })
    }

    async fn resolve_handle(&self, handle: &SocialHandle) -> Result<AggregateResult, ResolveError> {
        let user = self
            .backend
            .user_by_handle(handle)
            .await
            .map_err(required("user registry"))?;

        let user = match user {
            Lookup::Found(user) => user,
            Lookup::NotFound => {
                return self.scan_for_handle(handle, AccountLabel::NotLinked, None).await
            }
        };

        match user.account_id().and_then(|id| id.parse::<AccountId>().ok()) {
            Some(id) => self.resolve_linked(&id, user).await,
            None => {
                self.scan_for_handle(handle, AccountLabel::PartiallyLinked, Some(user))
                    .await
            }
        }
    }

    /// Handle lookup found a user with an account: same fan-out and label
    /// rules as a direct account query.
    async fn resolve_linked(
        &self,
        id: &AccountId,
        user: UserRecord,
    ) -> Result<AggregateResult, ResolveError> {
        let (bark_power, balance) = futures::try_join!(
            self.backend
                .barking_power(id)
                .map_err(required("barking power")),
            self.backend
                .token_balance(id)
                .map_err(required("token balance")),
        )?;
        let link_status = Some(LinkStatus::of(&user));

        let Lookup::Found(bark_power) = bark_power else {
            return Ok(AggregateResult {
                user: Some(user),
                token_balance: Some(balance),
                account_id: Some(id.to_string()),
                link_status,
                ..AggregateResult::labelled(no_allocation_label(balance))
            });
        };

        let ranks = self.position_ranks(id).await;
        Ok(AggregateResult {
            label: label_for_user(&user),
            bark_power: Some(bark_power),
            user: Some(user),
            token_balance: Some(balance),
            account_id: Some(id.to_string()),
            ranks,
            link_status,
        })
    }

    async fn scan_for_handle(
        &self,
        handle: &SocialHandle,
        label: AccountLabel,
        user: Option<UserRecord>,
    ) -> Result<AggregateResult, ResolveError> {
        let entries = self
            .backend
            .received_leaderboard(self.scan_limit)
            .await
            .map_err(required("barks received leaderboard"))?;

        let Some((rank, entry)) = rank_by_scan(&entries, handle) else {
            debug!(handle = %handle, scanned = entries.len(), "handle not on leaderboard");
            return Err(ResolveError::NoDataForHandle(handle.to_string()));
        };

        debug!(handle = %handle, rank = rank, "handle found by leaderboard scan");
        let link_status = user.as_ref().map(LinkStatus::of);
        Ok(AggregateResult {
            bark_power: Some(BarkPowerRecord::received_only(entry.barks_received)),
            user,
            ranks: LeaderboardRanks {
                given: None,
                received: Some(rank),
                source: Some(RankSource::Scan),
            },
            link_status,
            ..AggregateResult::labelled(label)
        })
    }

    /// Both position lookups run together; either may fail on its own.
    async fn position_ranks(&self, id: &AccountId) -> LeaderboardRanks {
        let (given, received) = futures::join!(
            self.backend.given_position(id),
            self.backend.received_position(id),
        );

        let given = given
            .map(|p| p.rank)
            .unwrap_or_else(|e| {
                warn!(account = %id, error = %e, "barks given position unavailable");
                None
            });
        let received = received
            .map(|p| p.rank)
            .unwrap_or_else(|e| {
                warn!(account = %id, error = %e, "barks received position unavailable");
                None
            });

        LeaderboardRanks {
            given,
            received,
            source: Some(RankSource::Position),
        }
    }
}
