use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregated usage of one language across the counted repositories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub size: u64,
    pub occurrences: u32,
    pub color: Option<String>,
    /// Share of the total size, in percent
    pub prop: f64,
}

/// Everything the repository overview query yields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoOverview {
    pub name: String,
    pub stargazers: u64,
    pub forks: u64,
    pub languages: BTreeMap<String, LanguageStat>,
    pub repos: BTreeSet<String>,
}

impl RepoOverview {
    /// Recomputes every `prop` from the summed sizes.
    pub fn update_proportions(&mut self) {
        let total: u64 = self.languages.values().map(|l| l.size).sum();
        for lang in self.languages.values_mut() {
            lang.prop = if total == 0 {
                0.0
            } else {
                100.0 * lang.size as f64 / total as f64
            };
        }
    }

    /// Languages ordered by size, largest first. Ties fall back to name order.
    pub fn languages_by_size(&self) -> Vec<(&str, &LanguageStat)> {
        let mut langs: Vec<(&str, &LanguageStat)> = self
            .languages
            .iter()
            .map(|(name, stat)| (name.as_str(), stat))
            .collect();
        langs.sort_by(|a, b| b.1.size.cmp(&a.1.size));
        langs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesChanged {
    pub additions: u64,
    pub deletions: u64,
}

impl LinesChanged {
    pub fn total(&self) -> u64 {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyContribution {
    pub date: NaiveDate,
    pub count: u64,
}

/// A commit as shown on the recent commits card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentCommit {
    pub repo: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub sha: String,
}

/// `owner/repo@sha7`, the cheap identity of a pushed commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitFingerprint(String);

impl CommitFingerprint {
    pub const SHORT_SHA_LEN: usize = 7;

    pub fn new(repo: &str, sha: &str) -> Self {
        let short: String = sha.chars().take(Self::SHORT_SHA_LEN).collect();
        Self(format!("{}@{}", repo, short))
    }

    /// Splits into `(owner, repo, short_sha)`; `None` when malformed.
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        let (repo_full, sha) = self.0.rsplit_once('@')?;
        let (owner, repo) = repo_full.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') || sha.is_empty() {
            return None;
        }
        Some((owner, repo, sha))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitFingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Rate limit state as reported by the last response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u32,
    pub limit: u32,
    pub reset_time: DateTime<Utc>,
    pub is_limited: bool,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: 5000,
            limit: 5000,
            reset_time: Utc::now() + chrono::Duration::hours(1),
            is_limited: false,
        }
    }
}
