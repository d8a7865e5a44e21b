use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::Database;
use crate::notify::{RecipientId, RecipientRegistry};
use crate::scheduler::MatchBoard;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registry: RecipientRegistry,
    pub board: MatchBoard,
    pub dry_run: bool,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/batches", get(batches_handler))
        .route("/api/notifications", get(notifications_handler))
        .route("/api/recipients", get(list_recipients_handler))
        .route(
            "/api/recipients/:id",
            post(add_recipient_handler).delete(remove_recipient_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve the dashboard HTML page, injecting the dry_run flag.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = DASHBOARD_HTML.replace(
        r#"<body>"#,
        &format!(r#"<body data-dryrun="{}">"#, state.dry_run),
    );
    Html(html)
}

#[derive(Serialize)]
struct StatsResponse {
    recipients: usize,
    batches: usize,
    matches: usize,
    #[serde(flatten)]
    journal: crate::db::Stats,
}

/// GET /api/stats
async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let journal = state
        .db
        .get_stats()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let batches = state.board.list().await;
    Ok(Json(StatsResponse {
        recipients: state.registry.len().await,
        matches: batches.iter().map(|b| b.matches.len()).sum(),
        batches: batches.len(),
        journal,
    }))
}

/// GET /api/batches
async fn batches_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.board.list().await)
}

/// GET /api/notifications
async fn notifications_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .list_recent_notifications(50)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/recipients
async fn list_recipients_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

/// POST /api/recipients/:id
async fn add_recipient_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RecipientId>,
) -> StatusCode {
    if state.registry.add(id).await {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// DELETE /api/recipients/:id
async fn remove_recipient_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RecipientId>,
) -> StatusCode {
    if state.registry.remove(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>matchwatch</title>
<style>
  body { background: #0f1117; color: #e0e0e0; font-family: system-ui, sans-serif; margin: 2rem; }
  h1 { font-size: 1.3rem; }
  h2 { font-size: 1rem; color: #8888aa; margin-top: 2rem; }
  table { border-collapse: collapse; width: 100%; }
  td, th { border-bottom: 1px solid #2a2d3a; padding: .4rem; text-align: left; font-size: .9rem; }
  td { white-space: pre-line; }
  .dry { color: #ffb020; }
</style>
</head>
<body>
<h1>matchwatch <span id="mode"></span></h1>
<div id="stats"></div>
<h2>Watching</h2>
<table id="batches"><tr><th>Batch</th><th>Next poll</th><th>Retries</th><th>Matches</th></tr></table>
<h2>Recent notifications</h2>
<table id="notes"><tr><th>Sent</th><th>Event</th><th>Match</th><th>Delivered</th><th>Failed</th></tr></table>
<script>
  if (document.body.dataset.dryrun === "true") {
    const dry = document.createElement("span");
    dry.className = "dry";
    dry.textContent = "(dry run)";
    document.getElementById("mode").appendChild(dry);
  }
  // Provider data is untrusted: cells are filled with textContent only.
  const row = cells => {
    const tr = document.createElement("tr");
    for (const c of cells) {
      const td = document.createElement("td");
      td.textContent = c;
      tr.appendChild(td);
    }
    return tr;
  };
  const fill = (id, rows) => {
    const table = document.getElementById(id);
    while (table.rows.length > 1) table.deleteRow(1);
    rows.forEach(r => table.appendChild(r));
  };
  async function refresh() {
    const stats = await (await fetch("/api/stats")).json();
    document.getElementById("stats").textContent =
      `${stats.recipients} recipients · ${stats.matches} matches in ${stats.batches} batches · ${stats.notifications} notifications sent`;
    const batches = await (await fetch("/api/batches")).json();
    fill("batches", batches.map(b => row([
      b.next_poll.batch_id, b.next_poll.due, b.next_poll.retries,
      b.matches.map(m => `${m.home_team} ${m.home_score}-${m.away_score} ${m.away_team} (${m.status})`).join("\n")
    ])));
    const notes = await (await fetch("/api/notifications")).json();
    fill("notes", notes.map(n => row([n.sent_at, n.event, n.match_id, n.delivered, n.failed])));
  }
  refresh();
  setInterval(refresh, 10000);
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_never_injects_markup() {
        assert!(!DASHBOARD_HTML.contains("innerHTML"));
        assert!(DASHBOARD_HTML.contains("td.textContent = c"));
    }

    #[tokio::test]
    async fn test_index_marks_dry_run() {
        let state = AppState {
            db: Database::open_in_memory().unwrap(),
            registry: RecipientRegistry::default(),
            board: MatchBoard::new(),
            dry_run: true,
        };
        let resp = index_handler(State(Arc::new(state))).await.into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains(r#"<body data-dryrun="true">"#));
    }
}
