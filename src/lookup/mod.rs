//! Query entry point shared by the CLI and the dashboard.
//!
//! Every check starts from a blank [`ViewModel`]; a failure replaces the
//! whole view with a single user-facing message.

use crate::aggregate::{AggregateResult, Aggregator, ResolveError};
use crate::api::{ApiError, BarkBackend};
use crate::classify::{classify, ClassifyError};
use crate::config::LeaderboardConfig;
use crate::view::{render, LeaderboardTable, ViewModel};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const INVALID_INPUT_MESSAGE: &str = "Please enter a Hedera account ID or Twitter handle.";
pub const NO_DATA_MESSAGE: &str = "No barks received for this Twitter handle.";

#[derive(Error, Debug)]
pub enum LookupError {
    #[error(transparent)]
    InvalidInput(#[from] ClassifyError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl LookupError {
    /// Message shown to the person who typed the query.
    pub fn user_message(&self) -> String {
        match self {
            LookupError::InvalidInput(_) => INVALID_INPUT_MESSAGE.to_string(),
            LookupError::Resolve(ResolveError::NoDataForHandle(_)) => NO_DATA_MESSAGE.to_string(),
            LookupError::Resolve(e @ ResolveError::AggregationFailed { .. }) => format!(
                "An error occurred: {}. Please ensure the account ID or Twitter handle is correct and try again.",
                e
            ),
        }
    }
}

#[derive(Clone)]
pub struct LookupService {
    backend: Arc<dyn BarkBackend>,
    aggregator: Arc<Aggregator<dyn BarkBackend>>,
    table_limit: u32,
}

impl LookupService {
    pub fn new(backend: Arc<dyn BarkBackend>, leaderboard: &LeaderboardConfig) -> Self {
        let aggregator = Arc::new(Aggregator::new(backend.clone(), leaderboard.scan_limit));
        Self {
            backend,
            aggregator,
            table_limit: leaderboard.table_limit,
        }
    }

    pub fn table_limit(&self) -> u32 {
        self.table_limit
    }

    /// Classify and resolve without rendering.
    pub async fn resolve(&self, raw: &str) -> Result<AggregateResult, LookupError> {
        let identifier = classify(raw)?;
        Ok(self.aggregator.resolve(&identifier).await?)
    }

    /// Run one query end to end and produce the view to show.
    pub async fn check(&self, raw: &str, details_expanded: bool) -> ViewModel {
        let mut view = self.clear();
        match self.resolve(raw).await {
            Ok(result) => view = render(&result, details_expanded),
            Err(e) => {
                match &e {
                    LookupError::InvalidInput(_) => info!(query = raw, "rejected query"),
                    LookupError::Resolve(err) => warn!(query = raw, error = %err, "lookup failed"),
                }
                view.error = Some(e.user_message());
            }
        }
        view
    }

    /// Reset to the blank view.
    pub fn clear(&self) -> ViewModel {
        ViewModel::baseline()
    }

    pub async fn load_leaderboard(&self, limit: Option<u32>) -> Result<LeaderboardTable, ApiError> {
        let limit = limit.unwrap_or(self.table_limit);
        let entries = self.backend.remaining_leaderboard(limit).await?;
        info!(limit = limit, rows = entries.len(), "loaded barking power leaderboard");
        Ok(LeaderboardTable::from_entries(&entries))
    }

    /// Selecting a row re-runs the lookup for that row's name.
    pub async fn select_row(
        &self,
        table: &LeaderboardTable,
        position: usize,
        details_expanded: bool,
    ) -> Option<ViewModel> {
        let row = table.row(position)?;
        Some(self.check(row.query(), details_expanded).await)
    }
}
