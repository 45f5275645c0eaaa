use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::scoring::roster::{Attribution, Roster};
use crate::scoring::{DetailEntry, Leaderboard, LeaderboardResponse, points_for};
use crate::util::github::GitCommit;

/// One fetched commit as seen by the scorer, kept for the diagnostic panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedCommit {
    pub sha: String,
    /// The participant the commit was attributed to
    pub author: Option<String>,
    pub login: Option<String>,
    pub author_name: String,
    pub message: String,
    pub points: u32,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Scores every commit in `commits` under `policy`.
///
/// Commits keep their upstream order (newest first) in both the detail lists and the processed
/// list. Untagged commits and commits the policy can't attribute are listed as processed but
/// never counted.
#[instrument(skip(commits, roster), fields(commit_count = commits.len()))]
pub fn score_commits(
    commits: &[GitCommit],
    roster: &Roster,
    policy: Attribution,
) -> LeaderboardResponse {
    let mut board = Leaderboard::default();
    let mut processed = Vec::with_capacity(commits.len());

    for commit in commits {
        let points = points_for(commit.message());
        let participant = roster.resolve_commit(policy, commit);

        let reason = match (&participant, points) {
            (None, _) => Some(String::from("no author handle")),
            (Some(_), 0) => Some(String::from("no difficulty tag")),
            (Some(participant), _) => {
                board.record(
                    participant,
                    DetailEntry {
                        message: commit.message().to_string(),
                        sha: commit.sha.clone(),
                        points,
                        date: commit.date(),
                        path: None,
                    },
                );
                None
            }
        };

        if let Some(reason) = &reason {
            tracing::trace!(sha = %commit.sha, reason, "commit not counted");
        }

        processed.push(ProcessedCommit {
            sha: commit.sha.clone(),
            author: participant,
            login: commit.login().map(str::to_owned),
            author_name: commit.author_name().to_string(),
            message: commit.message().to_string(),
            points,
            skipped: reason.is_some(),
            reason,
        });
    }

    tracing::info!(scores = ?board.scores, "leaderboard computed from commits");

    LeaderboardResponse {
        board,
        processed_commits: Some(processed),
        ..Default::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::github::test::commit;

    fn roster() -> Roster {
        Roster::with_extra_aliases(&[])
    }

    #[test]
    fn test_example_commit_set() {
        let commits = vec![
            commit("1", Some("x"), "X", "[Easy] fix"),
            commit("2", Some("x"), "X", "no tag"),
            commit("3", Some("y"), "Y", "[Hard] big"),
        ];

        let res = score_commits(&commits, &roster(), Attribution::Handle);

        assert_eq!(res.board.scores.len(), 2);
        assert_eq!(res.board.scores["x"], 1);
        assert_eq!(res.board.scores["y"], 3);
        assert_eq!(res.board.details["x"].len(), 1);
        assert_eq!(res.board.details["x"][0].sha, "1");

        let processed = res.processed_commits.unwrap();
        assert_eq!(processed.len(), 3);
        assert!(processed[1].skipped);
        assert_eq!(processed[1].points, 0);
        assert_eq!(processed[1].reason.as_deref(), Some("no difficulty tag"));
    }

    #[test]
    fn test_totals_match_details() {
        let commits = vec![
            commit("1", Some("lolidrk"), "Kalyani", "[Medium] a"),
            commit("2", None, "Tanmay Kulkarni", "[Hard] b"),
            commit("3", Some("Tanmay-Kulkarni101"), "Tanmay", "[easy] c"),
            commit("4", Some("lolidrk"), "Kalyani", "[Hard] [Easy] d"),
            commit("5", Some("lolidrk"), "Kalyani", "chore"),
        ];

        let res = score_commits(&commits, &roster(), Attribution::Aliased);

        for (participant, total) in &res.board.scores {
            let summed: u32 = res.board.details[participant].iter().map(|d| d.points).sum();
            assert_eq!(summed, *total, "mismatch for {participant}");
        }

        assert_eq!(res.board.scores["kalyani"], 3);
        assert_eq!(res.board.scores["tanmay"], 4);
        assert_eq!(res.board.scores.len(), res.board.details.len());
    }

    #[test]
    fn test_zero_point_participants_absent() {
        let commits = vec![
            commit("1", Some("lurker"), "Lurker", "typo fix"),
            commit("2", Some("x"), "X", "[Easy] a"),
        ];

        let res = score_commits(&commits, &roster(), Attribution::Handle);

        assert!(!res.board.scores.contains_key("lurker"));
        assert!(!res.board.details.contains_key("lurker"));
        assert_eq!(res.processed_commits.unwrap().len(), 2);
    }

    #[test]
    fn test_handle_policy_skips_unlinked() {
        let commits = vec![commit("1", None, "Anon", "[Hard] a")];

        let res = score_commits(&commits, &roster(), Attribution::Handle);
        assert!(res.board.scores.is_empty());

        let processed = res.processed_commits.unwrap();
        assert!(processed[0].skipped);
        assert_eq!(processed[0].author, None);
        assert_eq!(processed[0].reason.as_deref(), Some("no author handle"));

        let res = score_commits(&commits, &roster(), Attribution::HandleOrName);
        assert_eq!(res.board.scores["Anon"], 3);
    }

    #[test]
    fn test_detail_order_mirrors_input() {
        let commits = vec![
            commit("newest", Some("x"), "X", "[Easy] c"),
            commit("middle", Some("y"), "Y", "[Easy] b"),
            commit("oldest", Some("x"), "X", "[Medium] a"),
        ];

        let first = score_commits(&commits, &roster(), Attribution::Handle);
        let second = score_commits(&commits, &roster(), Attribution::Handle);

        let shas: Vec<_> = first.board.details["x"].iter().map(|d| d.sha.as_str()).collect();
        assert_eq!(shas, vec!["newest", "oldest"]);
        assert_eq!(first.board.scores.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(first.board, second.board);
    }
}
