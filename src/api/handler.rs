use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::{Json, debug_handler};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult};
use crate::scoring::{LeaderboardResponse, compute_leaderboard};
use crate::view::render::render_page;
use crate::view::{PageQuery, ViewState, fetch_board};

/// `GET /api/leaderboard`: scores the configured repository from scratch.
#[instrument(skip(state))]
#[debug_handler]
pub async fn leaderboard(State(state): State<Arc<AppState>>) -> JsonResult<LeaderboardResponse> {
    let scored = compute_leaderboard(state.source.as_ref(), &state.roster, &state.env).await?;
    Ok(Json(scored))
}

/// `GET /`: the loading state, which immediately moves on to the board.
#[instrument]
pub async fn loading_page(Query(query): Query<PageQuery>) -> Html<String> {
    Html(render_page(&ViewState::Loading, query.debug_enabled()))
}

/// `GET /board`: fetches the leaderboard JSON and renders either the board or the error page.
#[instrument(skip(state))]
pub async fn board_page(
    Query(query): Query<PageQuery>,
    State(state): State<Arc<AppState>>,
) -> Html<String> {
    let url = state.env.leaderboard_url();
    let fetched = fetch_board(&state.http, &url).await;
    let view = ViewState::settle(fetched, &state.roster);

    Html(render_page(&view, query.debug_enabled()))
}
