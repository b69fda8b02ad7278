//! Axum-based Bark Power dashboard.
//!
//! Provides:
//!   GET /                      → HTML search page (blank state)
//!   GET /check?q=..&details=.. → HTML result for one query
//!   GET /leaderboard           → HTML barking power leaderboard
//!   GET /api/check?q=..        → JSON AggregateResult or {"error": ..}
//!   GET /api/leaderboard       → JSON leaderboard rows
//!   GET /api/pool              → JSON pool summary
//!
//! Each request resolves on its own, so overlapping lookups never share
//! or overwrite each other's output.

use crate::aggregate::ResolveError;
use crate::lookup::{LookupError, LookupService};
use crate::market::{fetch_pool_summary, MarketSource};
use crate::view::{escape_html, ViewModel};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the dashboard routes.
#[derive(Clone)]
pub struct DashboardState {
    pub lookup: LookupService,
    pub market: Arc<dyn MarketSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub details: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Build the Axum router.
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/check", get(check_html))
        .route("/leaderboard", get(leaderboard_html))
        .route("/api/check", get(api_check))
        .route("/api/leaderboard", get(api_leaderboard))
        .route("/api/pool", get(api_pool))
        .with_state(state)
}

/// Start the dashboard server.
pub async fn serve(state: DashboardState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- API Handlers ---

async fn api_check(
    State(state): State<DashboardState>,
    Query(params): Query<CheckParams>,
) -> impl IntoResponse {
    let raw = params.q.unwrap_or_default();
    match state.lookup.resolve(&raw).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            let status = match &e {
                LookupError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                LookupError::Resolve(ResolveError::NoDataForHandle(_)) => StatusCode::NOT_FOUND,
                LookupError::Resolve(ResolveError::AggregationFailed { .. }) => {
                    StatusCode::BAD_GATEWAY
                }
            };
            (status, Json(serde_json::json!({ "error": e.user_message() }))).into_response()
        }
    }
}

async fn api_leaderboard(
    State(state): State<DashboardState>,
    Query(params): Query<LeaderboardParams>,
) -> impl IntoResponse {
    match state.lookup.load_leaderboard(params.limit).await {
        Ok(table) => Json(table.rows).into_response(),
        Err(e) => {
            warn!(error = %e, "leaderboard fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn api_pool(State(state): State<DashboardState>) -> impl IntoResponse {
    match fetch_pool_summary(state.market.as_ref()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            warn!(error = %e, "pool fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// --- HTML Pages ---

async fn index_html(State(state): State<DashboardState>) -> Html<String> {
    Html(check_page("", &state.lookup.clear()))
}

async fn check_html(
    State(state): State<DashboardState>,
    Query(params): Query<CheckParams>,
) -> Html<String> {
    let raw = params.q.unwrap_or_default();
    let view = state.lookup.check(&raw, params.details).await;
    Html(check_page(&raw, &view))
}

async fn leaderboard_html(
    State(state): State<DashboardState>,
    Query(params): Query<LeaderboardParams>,
) -> Html<String> {
    let body = match state.lookup.load_leaderboard(params.limit).await {
        Ok(table) => format!(
            "<table>\n  <tr><th>#</th><th>Twitter User</th><th>Barks Remaining</th></tr>\n  {}\n</table>",
            table.to_html("/check")
        ),
        Err(e) => {
            warn!(error = %e, "leaderboard fetch failed");
            format!(
                "<p class=\"error\">Error loading leaderboard: {}</p>",
                escape_html(&e.to_string())
            )
        }
    };
    Html(page("Barking Power Leaderboard", &body))
}

/// Search form, result block and the details / clear controls.
fn check_page(query: &str, view: &ViewModel) -> String {
    let mut controls = String::new();
    if view.has_details() {
        controls.push_str(&format!(
            "<a class=\"btn\" href=\"/check?q={}&details={}\">{}</a> ",
            urlencoding::encode(query),
            !view.details_expanded,
            if view.details_expanded { "Hide Details" } else { "Show More Details" },
        ));
    }
    if !view.is_blank() {
        controls.push_str("<a class=\"btn\" href=\"/\">Clear</a>");
    }

    let body = format!(
        r#"<form action="/check" method="get">
  <input type="text" name="q" value="{query}" placeholder="Hedera account ID (0.0.x) or @handle" autofocus>
  <button type="submit">Check Bark Power</button>
</form>
<div id="result">
{result}</div>
<div class="controls">{controls}</div>"#,
        query = escape_html(query),
        result = view.to_html(),
        controls = controls,
    );
    page("Bark Power Checker", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: 'SF Mono', 'Fira Code', monospace; background: #0d1117; color: #c9d1d9; padding: 20px; }}
  h1 {{ color: #58a6ff; margin-bottom: 20px; font-size: 1.4em; }}
  a {{ color: #58a6ff; }}
  nav {{ margin-bottom: 15px; font-size: 0.85em; }}
  form {{ display: flex; gap: 10px; margin-bottom: 20px; }}
  input {{ flex: 1; max-width: 420px; background: #161b22; color: #c9d1d9; border: 1px solid #30363d; border-radius: 6px; padding: 8px 12px; }}
  button, .btn {{ background: #238636; color: #fff; border: none; border-radius: 6px; padding: 8px 14px; text-decoration: none; font-size: 0.85em; }}
  #result p {{ margin: 6px 0; }}
  hr {{ border: none; border-top: 1px solid #21262d; margin: 12px 0; }}
  .error {{ color: #e74c3c; }}
  .controls {{ margin-top: 15px; }}
  .progress {{ background: #21262d; border-radius: 6px; overflow: hidden; max-width: 420px; margin: 10px 0; }}
  .progress-bar {{ color: #0d1117; font-size: 0.8em; font-weight: bold; padding: 4px 8px; white-space: nowrap; }}
  table {{ width: 100%; border-collapse: collapse; background: #161b22; border: 1px solid #30363d; border-radius: 8px; overflow: hidden; margin-bottom: 15px; }}
  th {{ background: #21262d; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.8em; text-transform: uppercase; letter-spacing: 0.5px; }}
  td {{ padding: 8px 12px; border-top: 1px solid #21262d; font-size: 0.85em; }}
  tr:hover {{ background: #1c2128; }}
</style>
</head>
<body>
<h1>{title}</h1>
<nav><a href="/">Check</a> | <a href="/leaderboard">Leaderboard</a> | <a href="/api/pool">Pool</a></nav>
{body}
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    )
}
