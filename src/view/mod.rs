//! The scoreboard page.
//!
//! The page has three states. `GET /` renders [`ViewState::Loading`], which hands off to
//! `GET /board`; that fetches the leaderboard JSON over HTTP and settles into
//! [`ViewState::Success`] or [`ViewState::Failure`]. Retrying from a failure goes back through
//! `Loading`. Nothing retries on its own.

pub mod render;

use chrono::Utc;
use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::constants::RECENT_RECORDS_SHOWN;
use crate::scoring::LeaderboardResponse;
use crate::scoring::roster::Roster;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Success(Board),
    Failure(String),
}

impl ViewState {
    /// Settles a finished fetch into `Success` or `Failure`
    pub fn settle(fetched: ViewResult<LeaderboardResponse>, roster: &Roster) -> Self {
        match fetched {
            Ok(response) => ViewState::Success(Board::build(&response, roster)),
            Err(e) => {
                tracing::warn!(error = %e, "leaderboard fetch failed");
                ViewState::Failure(e.to_string())
            }
        }
    }

    /// Manual retry: a failure goes back to loading, anything else stays put
    pub fn retry(&self) -> Self {
        match self {
            ViewState::Failure(_) => ViewState::Loading,
            other => other.clone(),
        }
    }

    /// The page route that renders this state
    pub fn route(&self) -> &'static str {
        match self {
            ViewState::Loading => "/",
            ViewState::Success(_) | ViewState::Failure(_) => "/board",
        }
    }
}

/// Query string shared by the page routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub debug: Option<String>,
}

impl PageQuery {
    pub fn debug_enabled(&self) -> bool {
        self.debug
            .as_deref()
            .is_some_and(|flag| !matches!(flag, "" | "0" | "false" | "off"))
    }
}

/// Fetches the leaderboard JSON the way a browser would, busting caches with a timestamp.
#[instrument(skip(client))]
pub async fn fetch_board(client: &reqwest::Client, url: &str) -> ViewResult<LeaderboardResponse> {
    let res = client
        .get(url)
        .query(&[("ts", Utc::now().timestamp_millis())])
        .send()
        .await?;

    if !res.status().is_success() {
        return Err(ViewError::Status(res.status()));
    }

    res.json::<LeaderboardResponse>()
        .await
        .map_err(ViewError::Decode)
}

/// Everything the success page shows, already ordered and computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub standings: Vec<Standing>,
    pub tug_of_war: Option<TugOfWar>,
    pub raw_scores: String,
    pub recent: Vec<RecentRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub rank: usize,
    pub name: String,
    pub score: u32,
    /// Commits (or files) behind the score
    pub contributions: usize,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TugOfWar {
    pub left: (String, f64),
    pub right: (String, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentRecord {
    pub sha: String,
    pub author: String,
    pub message: String,
    pub points: u32,
}

impl Board {
    pub fn build(response: &LeaderboardResponse, roster: &Roster) -> Self {
        let board = &response.board;

        let standings: Vec<Standing> = rank(&board.scores)
            .into_iter()
            .enumerate()
            .map(|(idx, (name, score))| Standing {
                rank: idx + 1,
                contributions: board.contributions(&name),
                avatar: roster.avatar(&name).to_string(),
                name,
                score,
            })
            .collect();

        let raw_scores =
            serde_json::to_string_pretty(&board.scores).unwrap_or_else(|_| String::from("{}"));

        Self {
            tug_of_war: tug_of_war(&standings),
            standings,
            raw_scores,
            recent: recent_records(response),
        }
    }
}

/// Orders participants by descending score. The sort is stable, so ties keep the order the
/// scores arrived in.
pub fn rank<'a, I>(scores: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = (&'a String, &'a u32)>,
{
    let mut ranked: Vec<(String, u32)> = scores
        .into_iter()
        .map(|(name, score)| (name.clone(), *score))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Splits the bar between exactly two participants; any other head count gets no bar.
pub fn tug_of_war(standings: &[Standing]) -> Option<TugOfWar> {
    let [left, right] = standings else {
        return None;
    };

    let total = (f64::from(left.score) + f64::from(right.score)).max(1.0);
    Some(TugOfWar {
        left: (left.name.clone(), f64::from(left.score) / total * 100.0),
        right: (right.name.clone(), f64::from(right.score) / total * 100.0),
    })
}

fn recent_records(response: &LeaderboardResponse) -> Vec<RecentRecord> {
    if let Some(commits) = &response.processed_commits {
        return commits
            .iter()
            .take(RECENT_RECORDS_SHOWN)
            .map(|commit| RecentRecord {
                sha: commit.sha.clone(),
                author: commit
                    .author
                    .clone()
                    .or_else(|| commit.login.clone())
                    .unwrap_or_else(|| String::from("Unknown")),
                message: commit.message.clone(),
                points: commit.points,
            })
            .collect();
    }

    response
        .processed_files
        .iter()
        .flatten()
        .take(RECENT_RECORDS_SHOWN)
        .map(|file| RecentRecord {
            sha: file.sha.clone(),
            author: file.participant.clone(),
            message: format!("{}: {}", file.path, file.message),
            points: file.points,
        })
        .collect()
}

pub type ViewResult<T> = core::result::Result<T, ViewError>;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Error fetching data: {0}")]
    Status(StatusCode),

    #[error("Error fetching data: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error reading leaderboard data: {0}")]
    Decode(#[source] reqwest::Error),
}
