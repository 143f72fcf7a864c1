use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::sync::EventPage;

#[derive(Debug, Deserialize)] pub struct SinceParams { pub since: Option<u64> }

pub async fn events(State(s): State<AppState>, Query(p): Query<SinceParams>) -> Json<EventPage> {
    Json(s.relay.since(p.since.unwrap_or(0)))
}

pub async fn stream(State(s): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Sync stream subscriber connected");
    s.relay.sse()
}
