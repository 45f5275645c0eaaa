pub mod commits;
pub mod files;
pub mod roster;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::scoring::commits::ProcessedCommit;
use crate::scoring::files::{FileScan, FileTrace, ProcessedFile};
use crate::scoring::roster::Roster;
use crate::util::env::Env;
use crate::util::github::{GithubResult, RepoSource};

// pattern order is the tag priority: the lowest matching index wins
static TAGS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([r"(?i)\[easy\]", r"(?i)\[medium\]", r"(?i)\[hard\]"])
        .expect("difficulty tag patterns are valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    const PRIORITY: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Finds the tag a message is scored by.
    ///
    /// Tags are checked in priority order (`[Easy]`, then `[Medium]`, then `[Hard]`), ignoring
    /// case and where in the message they appear; the first tag present wins.
    pub fn from_message(message: &str) -> Option<Self> {
        TAGS.matches(message)
            .iter()
            .next()
            .map(|idx| Self::PRIORITY[idx])
    }

    pub fn points(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Points a commit message is worth; untagged messages are worth nothing
pub fn points_for(message: &str) -> u32 {
    Difficulty::from_message(message)
        .map(|difficulty| difficulty.points())
        .unwrap_or(0)
}

/// A qualifying record as shown in a participant's detail list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub message: String,
    pub sha: String,
    pub points: u32,
    pub date: DateTime<Utc>,

    /// The scored file, in file mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Per-participant totals and the records behind them.
///
/// Both maps keep first-seen order, and a participant only appears once they have at least one
/// record worth points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub scores: IndexMap<String, u32>,
    pub details: IndexMap<String, Vec<DetailEntry>>,
}

impl Leaderboard {
    /// Adds `entry` to `participant`'s total and detail list. Returns `false` (and records
    /// nothing) for entries worth no points.
    pub fn record(&mut self, participant: &str, entry: DetailEntry) -> bool {
        if entry.points == 0 {
            return false;
        }

        *self.scores.entry(participant.to_string()).or_insert(0) += entry.points;
        self.details
            .entry(participant.to_string())
            .or_default()
            .push(entry);

        true
    }

    pub fn contributions(&self, participant: &str) -> usize {
        self.details.get(participant).map(Vec::len).unwrap_or(0)
    }
}

/// Body of `GET /api/leaderboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    #[serde(flatten)]
    pub board: Leaderboard,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_commits: Option<Vec<ProcessedCommit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<Vec<FileTrace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_files: Option<Vec<ProcessedFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scored_files: Option<usize>,
}

/// Scores the repository using whichever attribution policy is configured.
#[instrument(skip_all, fields(attribution = ?env.attribution))]
pub async fn compute_leaderboard(
    source: &dyn RepoSource,
    roster: &Roster,
    env: &Env,
) -> GithubResult<LeaderboardResponse> {
    if env.attribution.is_file_mode() {
        files::score_files(source, roster, &FileScan::from(env)).await
    } else {
        let commits = source.list_commits(None, env.commits_per_page).await?;
        Ok(commits::score_commits(&commits, roster, env.attribution))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scoring::roster::Attribution;
    use crate::util::github::test::{StaticRepo, commit};
    use crate::util::github::EntryKind;

    fn entry(sha: &str, points: u32) -> DetailEntry {
        DetailEntry {
            message: format!("{sha} message"),
            sha: sha.to_string(),
            points,
            date: Utc::now(),
            path: None,
        }
    }

    #[test]
    fn test_points_for_each_tag() {
        assert_eq!(points_for("[Easy] two sum"), 1);
        assert_eq!(points_for("[Medium] lru cache"), 2);
        assert_eq!(points_for("[Hard] median of two arrays"), 3);
        assert_eq!(points_for("update readme"), 0);
        assert_eq!(points_for("Easy: missing brackets"), 0);
    }

    #[test]
    fn test_points_ignore_case() {
        assert_eq!(points_for("[EASY] shouting"), 1);
        assert_eq!(points_for("solved [medium]"), 2);
        assert_eq!(points_for("[hArD] mixed"), 3);
    }

    #[test]
    fn test_hard_anywhere_with_other_brackets() {
        assert_eq!(points_for("[WIP] [Hard] trapping rain water [v2]"), 3);
        assert_eq!(points_for("refactor (cleanup) {x} finally [hard]"), 3);
        assert_eq!(points_for("[Hard]"), 3);
    }

    #[test]
    fn test_priority_is_scan_order_not_position() {
        assert_eq!(points_for("[Medium] also [Hard] fix"), 2);
        assert_eq!(points_for("[Hard] then [Easy]"), 1);
        assert_eq!(points_for("[hard] [medium] [easy]"), 1);
        assert_eq!(
            Difficulty::from_message("[Hard] and [Medium]"),
            Some(Difficulty::Medium)
        );
    }

    #[test]
    fn test_record_skips_zero_points() {
        let mut board = Leaderboard::default();

        assert!(!board.record("x", entry("a", 0)));
        assert!(board.scores.is_empty());
        assert!(board.details.is_empty());

        assert!(board.record("x", entry("b", 2)));
        assert!(board.record("x", entry("c", 3)));
        assert_eq!(board.scores["x"], 5);
        assert_eq!(board.contributions("x"), 2);
        assert_eq!(board.contributions("y"), 0);
    }

    #[test]
    fn test_response_shape() {
        let mut board = Leaderboard::default();
        board.record("x", entry("a", 1));

        let body = serde_json::to_value(LeaderboardResponse {
            board,
            total_files: Some(3),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(body["scores"]["x"], 1);
        assert_eq!(body["details"]["x"][0]["sha"], "a");
        assert!(body["details"]["x"][0].get("path").is_none());
        assert_eq!(body["totalFiles"], 3);
        assert!(body.get("processedCommits").is_none());
        assert!(body.get("scoredFiles").is_none());
    }

    #[tokio::test]
    async fn test_compute_dispatches_on_policy() {
        let repo = StaticRepo {
            commits: vec![commit("a", Some("lolidrk"), "Kalyani", "[Hard] big")],
            tree: vec![(String::from("tanmay/a.rs"), EntryKind::Blob)],
            by_path: [(
                String::from("tanmay/a.rs"),
                vec![commit("b", None, "Tanmay", "[Easy] a")],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let roster = Roster::with_extra_aliases(&[]);

        let commit_env = Env::from_pairs(Vec::new()).unwrap();
        let by_commit = compute_leaderboard(&repo, &roster, &commit_env)
            .await
            .unwrap();
        assert_eq!(by_commit.board.scores.get("kalyani"), Some(&3));
        assert!(by_commit.processed_commits.is_some());

        let file_env = Env::from_pairs(vec![
            (String::from("ATTRIBUTION"), String::from("folder")),
            (String::from("FILE_LOOKUP_DELAY_MS"), String::from("0")),
        ])
        .unwrap();
        assert_eq!(file_env.attribution, Attribution::Folder);

        let by_file = compute_leaderboard(&repo, &roster, &file_env).await.unwrap();
        assert_eq!(by_file.board.scores.get("tanmay"), Some(&1));
        assert_eq!(by_file.total_files, Some(1));
    }
}
