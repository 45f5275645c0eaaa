//! File-ownership scoring.
//!
//! Every code file under a participant's top-level folder is worth the points of the newest
//! tagged commit that touched it, credited to the folder's owner regardless of who authored the
//! commit. Scoring runs as two stages: [`enumerate`] turns the repository tree into lookup
//! candidates, and [`resolve`] looks each candidate up one at a time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::SKIPPED_EXTENSIONS;
use crate::scoring::roster::Roster;
use crate::scoring::{DetailEntry, Leaderboard, LeaderboardResponse, points_for};
use crate::util::env::Env;
use crate::util::github::{EntryKind, GitTree, GithubResult, RepoSource};

#[derive(Debug, Clone)]
pub struct FileScan {
    pub branch: String,
    pub per_page: u8,
    /// Pause between consecutive per-file lookups
    pub delay: Duration,
    pub trace_limit: usize,
}

impl From<&Env> for FileScan {
    fn from(env: &Env) -> Self {
        Self {
            branch: env.repo_branch.clone(),
            per_page: env.commits_per_page,
            delay: Duration::from_millis(env.file_lookup_delay_ms),
            trace_limit: env.debug_trace_limit as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutcome {
    Included,
    Skipped,
    Unscored,
    Failed,
}

/// Why a file was or wasn't counted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTrace {
    pub path: String,
    pub participant: Option<String>,
    pub outcome: FileOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    pub points: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub path: String,
    pub participant: String,
    pub sha: String,
    pub message: String,
    pub points: u32,
    pub date: DateTime<Utc>,
}

/// A file that needs a commit lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub participant: String,
}

/// Diagnostic trace that only keeps its first `limit` entries.
#[derive(Debug)]
pub struct Trace {
    entries: Vec<FileTrace>,
    limit: usize,
    dropped: usize,
}

impl Trace {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    pub fn push(&mut self, entry: FileTrace) {
        if self.entries.len() < self.limit {
            self.entries.push(entry);
        } else {
            self.dropped += 1;
        }
    }

    pub fn into_entries(self) -> Vec<FileTrace> {
        if self.dropped > 0 {
            tracing::debug!(kept = self.entries.len(), dropped = self.dropped, "trace truncated");
        }

        self.entries
    }

    fn skip(&mut self, path: &str, participant: Option<String>, reason: &str) {
        self.push(FileTrace {
            path: path.to_string(),
            participant,
            outcome: FileOutcome::Skipped,
            sha: None,
            points: 0,
            reason: reason.to_string(),
        });
    }
}

pub fn has_skipped_extension(path: &str) -> bool {
    let lowered = path.to_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// First stage: picks out the files in `tree` that belong to a participant folder and are worth
/// a lookup, in tree order.
#[instrument(skip_all, fields(entries = tree.tree.len()))]
pub fn enumerate(tree: &GitTree, roster: &Roster, trace: &mut Trace) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for entry in tree.tree.iter().filter(|e| e.kind == EntryKind::Blob) {
        let path = entry.path.as_str();

        let Some(participant) = roster.resolve_path(path) else {
            trace.skip(path, None, "not inside a participant folder");
            continue;
        };

        if path.starts_with('.') {
            trace.skip(path, None, "hidden folder");
        } else if has_skipped_extension(path) {
            trace.skip(path, Some(participant), "non-code extension");
        } else {
            candidates.push(Candidate {
                path: path.to_string(),
                participant,
            });
        }
    }

    tracing::debug!(candidates = candidates.len(), "enumerated participant files");
    candidates
}

/// Second stage: looks up each candidate's newest tagged commit, sequentially and with
/// `scan.delay` between requests.
///
/// A failed lookup is traced and that file skipped; it never fails the whole scan.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub async fn resolve(
    source: &dyn RepoSource,
    candidates: &[Candidate],
    scan: &FileScan,
    trace: &mut Trace,
) -> (Leaderboard, Vec<ProcessedFile>) {
    let mut board = Leaderboard::default();
    let mut processed = Vec::new();

    for (idx, candidate) in candidates.iter().enumerate() {
        if idx > 0 && !scan.delay.is_zero() {
            tokio::time::sleep(scan.delay).await;
        }

        let Candidate { path, participant } = candidate;
        let commits = match source.list_commits(Some(path.as_str()), scan.per_page).await {
            Ok(commits) => commits,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "commit lookup failed, skipping file");
                trace.push(FileTrace {
                    path: path.clone(),
                    participant: Some(participant.clone()),
                    outcome: FileOutcome::Failed,
                    sha: None,
                    points: 0,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let Some((commit, points)) = commits
            .iter()
            .map(|commit| (commit, points_for(commit.message())))
            .find(|(_, points)| *points > 0)
        else {
            trace.push(FileTrace {
                path: path.clone(),
                participant: Some(participant.clone()),
                outcome: FileOutcome::Unscored,
                sha: commits.first().map(|c| c.sha.clone()),
                points: 0,
                reason: String::from("no tagged commit touches this file"),
            });
            continue;
        };

        board.record(
            participant,
            DetailEntry {
                message: commit.message().to_string(),
                sha: commit.sha.clone(),
                points,
                date: commit.date(),
                path: Some(path.clone()),
            },
        );

        trace.push(FileTrace {
            path: path.clone(),
            participant: Some(participant.clone()),
            outcome: FileOutcome::Included,
            sha: Some(commit.sha.clone()),
            points,
            reason: format!("credited to folder owner (commit by {})", commit.author_name()),
        });

        processed.push(ProcessedFile {
            path: path.clone(),
            participant: participant.clone(),
            sha: commit.sha.clone(),
            message: commit.message().to_string(),
            points,
            date: commit.date(),
        });
    }

    (board, processed)
}

/// Scores the repository by file ownership. Only the tree listing can fail the whole scan.
#[instrument(skip(source, roster))]
pub async fn score_files(
    source: &dyn RepoSource,
    roster: &Roster,
    scan: &FileScan,
) -> GithubResult<LeaderboardResponse> {
    let tree = source.file_tree(&scan.branch).await?;
    let mut trace = Trace::new(scan.trace_limit);

    let candidates = enumerate(&tree, roster, &mut trace);
    let (board, processed) = resolve(source, &candidates, scan, &mut trace).await;

    tracing::info!(
        total_files = candidates.len(),
        scored_files = processed.len(),
        scores = ?board.scores,
        "leaderboard computed from files"
    );

    Ok(LeaderboardResponse {
        board,
        debug_info: Some(trace.into_entries()),
        total_files: Some(candidates.len()),
        scored_files: Some(processed.len()),
        processed_files: Some(processed),
        ..Default::default()
    })
}
