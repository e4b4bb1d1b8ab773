//! `GET /api/search?query=...` - forwards to the upstream search endpoint

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::error::ProxyError;
use super::ServerState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ProxyError> {
    let query = params
        .query
        .filter(|q| !q.is_empty())
        .ok_or(ProxyError::MissingQuery)?;

    let upstream = state.client.search_raw(&query).await?;
    match upstream.body {
        Some(body) => Ok(Json(body).into_response()),
        None => Err(ProxyError::Upstream(upstream.status)),
    }
}
