//! Static participant configuration: who is who, and what they look like.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{AVATAR_ROUTE, DEFAULT_AVATAR};
use crate::util::github::GitCommit;

/// Handles and spellings that belong to a known participant
const ALIASES: &[(&str, &str)] = &[
    ("lolidrk", "kalyani"),
    ("Kalyani", "kalyani"),
    ("Kalyani Deshmukh", "kalyani"),
    ("Tanmay-Kulkarni101", "tanmay"),
    ("Tanmay", "tanmay"),
    ("Tanmay Kulkarni", "tanmay"),
];

const AVATARS: &[(&str, &str)] = &[("kalyani", "kalyani.svg"), ("tanmay", "tanmay.svg")];

/// How a commit (or file) is attributed to a participant. Only one policy is ever active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// The github login; commits without a linked account are skipped
    Handle,
    /// The github login, falling back to the commit's author name
    HandleOrName,
    /// `HandleOrName`, collapsed through the alias table
    #[default]
    Aliased,
    /// The top-level folder of each file, collapsed through the alias table
    Folder,
}

impl Attribution {
    pub fn is_file_mode(&self) -> bool {
        matches!(self, Attribution::Folder)
    }
}

/// Read-only alias and avatar lookups, built once at startup.
#[derive(Debug, Clone)]
pub struct Roster {
    aliases: HashMap<String, String>,
    avatars: HashMap<String, String>,
}

impl Roster {
    /// Builds the roster, merging `alias=canonical` pairs over the built-in alias table.
    /// Malformed pairs are logged and ignored.
    pub fn with_extra_aliases(extra: &[String]) -> Self {
        let mut aliases: HashMap<String, String> = ALIASES
            .iter()
            .map(|(alias, canonical)| (alias.to_lowercase(), canonical.to_string()))
            .collect();

        for pair in extra {
            match pair.split_once('=') {
                Some((alias, canonical))
                    if !alias.trim().is_empty() && !canonical.trim().is_empty() =>
                {
                    aliases.insert(alias.trim().to_lowercase(), canonical.trim().to_string());
                }
                _ => tracing::warn!(pair = %pair, "ignoring malformed participant alias"),
            }
        }

        let avatars = AVATARS
            .iter()
            .map(|(name, file)| (name.to_string(), format!("{AVATAR_ROUTE}/{file}")))
            .collect();

        Self { aliases, avatars }
    }

    /// Canonical participant name for `name`; unknown names pass through unchanged.
    pub fn canonical(&self, name: &str) -> String {
        self.aliases
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Avatar URL for a participant, or the shared fallback image
    pub fn avatar(&self, participant: &str) -> &str {
        self.avatars
            .get(participant)
            .or_else(|| self.avatars.get(&self.canonical(participant)))
            .map(String::as_str)
            .unwrap_or(DEFAULT_AVATAR)
    }

    /// Resolves the participant a commit counts towards, or `None` when the policy can't
    /// attribute it.
    pub fn resolve_commit(&self, policy: Attribution, commit: &GitCommit) -> Option<String> {
        let name = Some(commit.author_name()).filter(|name| !name.trim().is_empty());

        match policy {
            Attribution::Handle => commit.login().map(str::to_owned),
            Attribution::HandleOrName => commit.login().or(name).map(str::to_owned),
            Attribution::Aliased => commit.login().or(name).map(|key| self.canonical(key)),
            Attribution::Folder => None,
        }
    }

    /// Resolves the participant owning `path`: its top-level folder, collapsed through the alias
    /// table. Files at the repository root have no owner.
    pub fn resolve_path(&self, path: &str) -> Option<String> {
        match path.split_once('/') {
            Some((folder, rest)) if !folder.is_empty() && !rest.is_empty() => {
                Some(self.canonical(folder))
            }
            _ => None,
        }
    }
}
