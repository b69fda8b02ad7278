//! Bark Power lookups for The Barking Game.
//!
//! Classifies a query (Hedera account ID or Twitter handle), aggregates
//! the game backend and mirror node answers into one result, and renders
//! it for the CLI and the axum dashboard.

pub mod aggregate;
pub mod api;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod lookup;
pub mod market;
pub mod view;
