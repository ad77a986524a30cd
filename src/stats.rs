use crate::activity::{ActivitySeries, SlotStrategy};
use crate::cache::{CacheStore, LinesChangedEntry, RecentCommitsEntry};
use crate::error::{Result, StatsError};
use crate::github::GitHubClient;
use crate::models::{
    CommitFingerprint, DailyContribution, LanguageStat, LinesChanged, RecentCommit, RepoOverview,
};
use crate::queries;
use crate::render::format_thousands;
use crate::types::{
    CalendarViewer, CommitDetail, ContributionYearsViewer, ContributionsByYear, ContributorStats,
    GitHubEvent, OverviewViewer, TrafficViews, ViewerData,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Per-repository requests kept in flight; the client semaphore still applies
const REPO_CONCURRENCY: usize = 10;
pub const DEFAULT_RECENT_COMMITS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct StatsConfig {
    pub username: String,
    /// `owner/name` of repositories to leave out
    pub exclude_repos: HashSet<String>,
    /// Matched case-insensitively
    pub exclude_langs: HashSet<String>,
    /// Only count owned repositories, not the ones merely contributed to
    pub exclude_forked_repos: bool,
    /// Ignore cached totals and recompute everything
    pub refresh: bool,
}

/// Statistics about one account's GitHub usage.
///
/// Every statistic is fetched lazily and at most once, no matter how many
/// renderers ask for it concurrently.
pub struct Stats {
    config: StatsConfig,
    client: Arc<GitHubClient>,
    cache: Arc<CacheStore>,
    overview: OnceCell<RepoOverview>,
    total_contributions: OnceCell<u64>,
    lines_changed: OnceCell<LinesChanged>,
    views: OnceCell<u64>,
    events: OnceCell<Vec<GitHubEvent>>,
}

impl Stats {
    pub fn new(client: Arc<GitHubClient>, cache: Arc<CacheStore>, config: StatsConfig) -> Self {
        Self {
            config,
            client,
            cache,
            overview: OnceCell::new(),
            total_contributions: OnceCell::new(),
            lines_changed: OnceCell::new(),
            views: OnceCell::new(),
            events: OnceCell::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub async fn overview(&self) -> Result<&RepoOverview> {
        self.overview.get_or_try_init(|| self.fetch_overview()).await
    }

    pub async fn name(&self) -> Result<String> {
        Ok(self.overview().await?.name.clone())
    }

    pub async fn stargazers(&self) -> Result<u64> {
        Ok(self.overview().await?.stargazers)
    }

    pub async fn forks(&self) -> Result<u64> {
        Ok(self.overview().await?.forks)
    }

    /// Language name to usage, proportions included
    pub async fn languages(&self) -> Result<Vec<(String, LanguageStat)>> {
        Ok(self
            .overview()
            .await?
            .languages_by_size()
            .into_iter()
            .map(|(name, stat)| (name.to_string(), stat.clone()))
            .collect())
    }

    pub async fn repos(&self) -> Result<Vec<String>> {
        Ok(self.overview().await?.repos.iter().cloned().collect())
    }

    async fn fetch_overview(&self) -> Result<RepoOverview> {
        let exclude_langs: HashSet<String> = self
            .config
            .exclude_langs
            .iter()
            .map(|l| l.to_lowercase())
            .collect();

        let mut overview = RepoOverview::default();
        let mut owned_cursor: Option<String> = None;
        let mut contrib_cursor: Option<String> = None;

        loop {
            let query = queries::repos_overview(owned_cursor.as_deref(), contrib_cursor.as_deref());
            let data: ViewerData<OverviewViewer> = self.client.graphql(&query).await?;
            let OverviewViewer {
                login,
                name,
                repositories: owned,
                repositories_contributed_to: contrib,
            } = data.viewer;

            overview.name = name
                .filter(|n| !n.is_empty())
                .or(login)
                .unwrap_or_else(|| "No Name".to_string());

            let mut nodes = owned.nodes;
            if !self.config.exclude_forked_repos {
                nodes.extend(contrib.nodes);
            }

            for repo in nodes.into_iter().flatten() {
                let repo_name = repo.name_with_owner;
                if overview.repos.contains(&repo_name) || self.config.exclude_repos.contains(&repo_name) {
                    continue;
                }
                overview.stargazers += repo.stargazers.total_count;
                overview.forks += repo.fork_count;

                for edge in repo.languages.edges {
                    let (lang, color) = match edge.node {
                        Some(node) => (node.name.unwrap_or_else(|| "Other".to_string()), node.color),
                        None => ("Other".to_string(), None),
                    };
                    if exclude_langs.contains(&lang.to_lowercase()) {
                        continue;
                    }
                    let stat = overview.languages.entry(lang).or_insert(LanguageStat {
                        size: 0,
                        occurrences: 0,
                        color,
                        prop: 0.0,
                    });
                    stat.size += edge.size;
                    stat.occurrences += 1;
                }

                overview.repos.insert(repo_name);
            }

            if !(owned.page_info.has_next_page || contrib.page_info.has_next_page) {
                break;
            }

            let next_owned = owned.page_info.end_cursor.or_else(|| owned_cursor.clone());
            let next_contrib = contrib.page_info.end_cursor.or_else(|| contrib_cursor.clone());
            if next_owned == owned_cursor && next_contrib == contrib_cursor {
                warn!("Repository pagination did not advance. Stopping early.");
                break;
            }
            owned_cursor = next_owned;
            contrib_cursor = next_contrib;
        }

        overview.update_proportions();
        info!(
            repos = overview.repos.len(),
            stargazers = overview.stargazers,
            forks = overview.forks,
            languages = overview.languages.len(),
            "Fetched repository overview"
        );
        Ok(overview)
    }

    /// Count of contributions as defined by GitHub, over every year
    pub async fn total_contributions(&self) -> Result<u64> {
        self.total_contributions
            .get_or_try_init(|| async {
                let years: ViewerData<ContributionYearsViewer> =
                    self.client.graphql(&queries::contrib_years()).await?;
                let years = years.viewer.contributions_collection.contribution_years;
                if years.is_empty() {
                    return Ok::<_, StatsError>(0);
                }

                let by_year: ViewerData<ContributionsByYear> =
                    self.client.graphql(&queries::all_contribs(&years)).await?;
                let total = by_year
                    .viewer
                    .values()
                    .map(|y| y.contribution_calendar.total_contributions)
                    .sum::<u64>();

                debug!(years = years.len(), total, "Fetched total contributions");
                Ok::<_, StatsError>(total)
            })
            .await
            .copied()
    }

    /// Page views over the last 14 days, the window GitHub keeps
    pub async fn views(&self) -> Result<u64> {
        self.views
            .get_or_try_init(|| async {
                let repos = self.repos().await?;
                let client = &self.client;

                let results: Vec<(String, Result<Option<TrafficViews>>)> = stream::iter(repos)
                    .map(|repo| async move {
                        let path = format!("repos/{}/traffic/views", repo);
                        let result = client.rest::<TrafficViews>(&path, &[]).await;
                        (repo, result)
                    })
                    .buffer_unordered(REPO_CONCURRENCY)
                    .collect()
                    .await;

                let mut total = 0;
                for (repo, result) in results {
                    if let Some(traffic) = tolerate(&repo, "traffic views", result)? {
                        total += traffic.views.iter().map(|v| v.count).sum::<u64>();
                    }
                }
                Ok::<_, StatsError>(total)
            })
            .await
            .copied()
    }

    /// Lines added and deleted by the user.
    ///
    /// The first run scans every repository's contributor statistics. Later
    /// runs add the commits pushed since the newest commit already counted.
    pub async fn lines_changed(&self) -> Result<LinesChanged> {
        self.lines_changed
            .get_or_try_init(|| self.compute_lines_changed())
            .await
            .copied()
    }

    async fn compute_lines_changed(&self) -> Result<LinesChanged> {
        let cached = if self.config.refresh {
            None
        } else {
            self.cache.load().await.and_then(|c| c.lines_changed)
        };

        let Some(entry) = cached else {
            let totals = self.lines_changed_full().await?;
            let now = Utc::now();
            self.save_lines_changed(totals, now).await;
            return Ok(totals);
        };

        let (delta, newest) = self.lines_changed_since(entry.last_commit_date).await?;
        let totals = LinesChanged {
            additions: entry.additions + delta.additions,
            deletions: entry.deletions + delta.deletions,
        };

        if delta.total() == 0 {
            debug!("No new lines changed since {}", entry.last_commit_date);
            return Ok(totals);
        }

        info!(
            additions = delta.additions,
            deletions = delta.deletions,
            "Added new commits to cached lines changed"
        );
        self.save_lines_changed(totals, newest).await;
        Ok(totals)
    }

    async fn save_lines_changed(&self, totals: LinesChanged, last_commit_date: DateTime<Utc>) {
        let saved = self
            .cache
            .update(|cache| {
                cache.lines_changed = Some(LinesChangedEntry {
                    additions: totals.additions,
                    deletions: totals.deletions,
                    last_commit_date,
                });
            })
            .await;
        if let Err(e) = saved {
            warn!(error = %e, "Failed to save lines changed to the runtime cache");
        }
    }

    async fn lines_changed_full(&self) -> Result<LinesChanged> {
        let repos = self.repos().await?;
        let client = &self.client;

        let results: Vec<(String, Result<Option<Vec<ContributorStats>>>)> = stream::iter(repos)
            .map(|repo| async move {
                let path = format!("repos/{}/stats/contributors", repo);
                let result = client.rest::<Vec<ContributorStats>>(&path, &[]).await;
                (repo, result)
            })
            .buffer_unordered(REPO_CONCURRENCY)
            .collect()
            .await;

        let (totals, skipped) = sum_contributor_lines(&self.config.username, results)?;
        if !skipped.is_empty() {
            warn!(
                repos = ?skipped,
                "Contributor statistics unavailable, totals stay incomplete until the next --refresh"
            );
        }

        info!(
            additions = totals.additions,
            deletions = totals.deletions,
            "Scanned contributor statistics"
        );
        Ok(totals)
    }

    /// Lines changed by pushed commits authored after `since`, and the date of
    /// the newest such commit (`since` when there is none).
    pub async fn lines_changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(LinesChanged, DateTime<Utc>)> {
        let mut seen = HashSet::new();
        let mut pushed: Vec<(String, String)> = Vec::new();
        for event in self.events().await?.iter().filter(|e| e.is_push()) {
            let shas: Vec<&str> = if event.payload.commits.is_empty() {
                event.payload.head.as_deref().into_iter().collect()
            } else {
                event.payload.commits.iter().map(|c| c.sha.as_str()).collect()
            };
            for sha in shas {
                if seen.insert((event.repo.name.clone(), sha.to_string())) {
                    pushed.push((event.repo.name.clone(), sha.to_string()));
                }
            }
        }

        let client = &self.client;
        let results: Vec<(String, Result<Option<CommitDetail>>)> = stream::iter(pushed)
            .map(|(repo, sha)| async move {
                let path = format!("repos/{}/commits/{}", repo, sha);
                (repo, client.rest::<CommitDetail>(&path, &[]).await)
            })
            .buffer_unordered(REPO_CONCURRENCY)
            .collect()
            .await;

        let mut delta = LinesChanged::default();
        let mut newest = since;
        for (repo, result) in results {
            let Some(detail) = tolerate(&repo, "commit", result)? else {
                continue;
            };
            let Some(authored) = parse_timestamp(&detail.commit.author.date) else {
                warn!(repo = %repo, date = %detail.commit.author.date, "Unparseable commit date");
                continue;
            };
            if authored <= since {
                continue;
            }
            let Some(commit_stats) = detail.stats else {
                continue;
            };
            delta.additions += commit_stats.additions;
            delta.deletions += commit_stats.deletions;
            newest = newest.max(authored);
        }

        Ok((delta, newest))
    }

    /// The user's public events, fetched once per run
    async fn events(&self) -> Result<&Vec<GitHubEvent>> {
        self.events
            .get_or_try_init(|| async {
                let path = format!("users/{}/events", self.config.username);
                let events = self
                    .client
                    .rest::<Vec<GitHubEvent>>(&path, &[("per_page", "100")])
                    .await?
                    .unwrap_or_default();
                debug!(events = events.len(), "Fetched user events");
                Ok::<_, StatsError>(events)
            })
            .await
    }

    /// Daily contribution counts of `year`
    pub async fn daily_activity(&self, year: i32) -> Result<Vec<DailyContribution>> {
        let data: ViewerData<CalendarViewer> =
            self.client.graphql(&queries::daily_contributions(year)).await?;

        let days = data
            .viewer
            .contributions_collection
            .contribution_calendar
            .weeks
            .into_iter()
            .flat_map(|w| w.contribution_days)
            .filter_map(|d| match NaiveDate::parse_from_str(&d.date, "%Y-%m-%d") {
                Ok(date) => Some(DailyContribution {
                    date,
                    count: d.contribution_count,
                }),
                Err(e) => {
                    warn!(date = %d.date, error = %e, "Skipping calendar day");
                    None
                }
            })
            .filter(|d| d.date.year() == year)
            .collect();

        Ok(days)
    }

    /// The 48-slot activity series of `year`
    pub async fn activity_series(
        &self,
        year: i32,
        strategy: SlotStrategy,
        today: NaiveDate,
    ) -> Result<ActivitySeries> {
        let days = self.daily_activity(year).await?;
        Ok(ActivitySeries::build(strategy, &days, year, today))
    }

    /// Up to `limit` most recently pushed commits.
    ///
    /// Commit details are cached alongside their fingerprints, so a run that
    /// sees the same pushes as the previous one makes no commit API calls.
    pub async fn recent_commits(&self, limit: usize) -> Result<Vec<RecentCommit>> {
        let cached = if self.config.refresh {
            None
        } else {
            self.cache.load().await.and_then(|c| c.recent_commits)
        };
        let (old_fps, old_commits) = match cached {
            Some(entry) => (entry.fingerprints, entry.commits),
            None => (Vec::new(), Vec::new()),
        };

        let new_fps = self.recent_commit_fingerprints(limit).await?;

        let target = if new_fps.is_empty() && !old_fps.is_empty() {
            info!("No recent pushes in the events feed. Keeping cached recent commits.");
            old_fps.iter().take(limit).cloned().collect()
        } else {
            new_fps
        };

        if target.is_empty() {
            self.save_recent_commits(Vec::new(), Vec::new()).await;
            return Ok(Vec::new());
        }

        if target == old_fps && !old_commits.is_empty() {
            debug!("Recent commits unchanged. Using cached details.");
            return Ok(old_commits);
        }

        let commits = self.fetch_commit_details(&target).await?;
        self.save_recent_commits(target, commits.clone()).await;
        Ok(commits)
    }

    async fn save_recent_commits(&self, fingerprints: Vec<CommitFingerprint>, commits: Vec<RecentCommit>) {
        let saved = self
            .cache
            .update(|cache| {
                cache.recent_commits = Some(RecentCommitsEntry {
                    fingerprints,
                    commits,
                    last_checked: Utc::now(),
                });
            })
            .await;
        if let Err(e) = saved {
            warn!(error = %e, "Failed to save recent commits to the runtime cache");
        }
    }

    /// Fingerprints of the head commits of the latest pushes, newest first
    pub async fn recent_commit_fingerprints(&self, limit: usize) -> Result<Vec<CommitFingerprint>> {
        let mut fingerprints: Vec<CommitFingerprint> = Vec::new();

        for event in self.events().await?.iter().filter(|e| e.is_push()) {
            if fingerprints.len() >= limit {
                break;
            }
            let Some(head) = event.payload.head.as_deref().filter(|h| !h.is_empty()) else {
                continue;
            };
            let fp = CommitFingerprint::new(&event.repo.name, head);
            if !fingerprints.contains(&fp) {
                fingerprints.push(fp);
            }
        }

        Ok(fingerprints)
    }

    /// Looks up each fingerprint's commit; ones that cannot be fetched are skipped.
    pub async fn fetch_commit_details(
        &self,
        fingerprints: &[CommitFingerprint],
    ) -> Result<Vec<RecentCommit>> {
        let client = &self.client;

        let results: Vec<(CommitFingerprint, Result<Option<CommitDetail>>)> =
            stream::iter(fingerprints.iter().cloned())
                .map(|fp| async move {
                    let result = match fp.parts() {
                        Some((owner, repo, sha)) => {
                            let path = format!("repos/{}/{}/commits/{}", owner, repo, sha);
                            client.rest::<CommitDetail>(&path, &[]).await
                        }
                        None => Err(StatsError::InvalidRepoName(fp.to_string())),
                    };
                    (fp, result)
                })
                .buffered(REPO_CONCURRENCY)
                .collect()
                .await;

        let mut commits = Vec::new();
        for (fp, result) in results {
            let Some(detail) = tolerate(fp.as_str(), "commit", result)? else {
                continue;
            };
            let Some((owner, repo, sha)) = fp.parts() else {
                continue;
            };
            commits.push(RecentCommit {
                repo: format!("{}/{}", owner, repo),
                message: detail.commit.message.lines().next().unwrap_or_default().to_string(),
                author: detail.commit.author.name,
                date: detail.commit.author.date,
                sha: sha.to_string(),
            });
        }

        Ok(commits)
    }

    /// Plain-text summary of every statistic
    pub async fn summary(&self) -> Result<String> {
        let overview = self.overview().await?;
        let contributions = self.total_contributions().await?;
        let lines = self.lines_changed().await?;
        let views = self.views().await?;

        let languages: Vec<String> = overview
            .languages_by_size()
            .into_iter()
            .map(|(name, stat)| format!("{}: {:0.4}%", name, stat.prop))
            .collect();

        Ok(format!(
            "Name: {}\n\
             Stargazers: {}\n\
             Forks: {}\n\
             All-time contributions: {}\n\
             Repositories with contributions: {}\n\
             Lines of code added: {}\n\
             Lines of code deleted: {}\n\
             Lines of code changed: {}\n\
             Project page views: {}\n\
             Languages:\n  - {}\n",
            overview.name,
            format_thousands(overview.stargazers),
            format_thousands(overview.forks),
            format_thousands(contributions),
            overview.repos.len(),
            format_thousands(lines.additions),
            format_thousands(lines.deletions),
            format_thousands(lines.total()),
            format_thousands(views),
            languages.join("\n  - "),
        ))
    }
}

/// Per-repository failures only cost that repository's data. Rate limiting
/// and bad credentials affect every request and abort the run.
fn tolerate<T>(repo: &str, what: &str, result: Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(e @ (StatsError::RateLimitExceeded(_) | StatsError::AuthError(_))) => Err(e),
        Err(e) => {
            debug!(repo, what, error = %e, "Skipping unavailable data");
            Ok(None)
        }
    }
}

/// Sums the user's weekly additions and deletions across repositories.
/// Also returns the repositories whose statistics could not be read.
fn sum_contributor_lines(
    username: &str,
    results: Vec<(String, Result<Option<Vec<ContributorStats>>>)>,
) -> Result<(LinesChanged, Vec<String>)> {
    let mut totals = LinesChanged::default();
    let mut skipped = Vec::new();
    for (repo, result) in results {
        let Some(contributors) = tolerate(&repo, "contributor stats", result)? else {
            skipped.push(repo);
            continue;
        };
        for contributor in contributors {
            let is_user = contributor
                .author
                .as_ref()
                .is_some_and(|a| a.login.eq_ignore_ascii_case(username));
            if !is_user {
                continue;
            }
            for week in contributor.weeks {
                totals.additions += week.a;
                totals.deletions += week.d;
            }
        }
    }
    skipped.sort();
    Ok((totals, skipped))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContributorAuthor, ContributorWeek};

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-03-01T12:00:00Z").unwrap();
        assert_eq!(parsed.timestamp(), 1_709_294_400);
        assert!(parse_timestamp("yesterday").is_none());
    }

    fn contributor(login: &str, weeks: &[(u64, u64)]) -> ContributorStats {
        ContributorStats {
            author: Some(ContributorAuthor {
                login: login.to_string(),
            }),
            weeks: weeks
                .iter()
                .map(|&(a, d)| ContributorWeek { a, d })
                .collect(),
        }
    }

    #[test]
    fn test_sum_contributor_lines_reports_skipped_repos() {
        let results = vec![
            (
                "octocat/alpha".to_string(),
                Ok(Some(vec![
                    contributor("OctoCat", &[(10, 2), (5, 1)]),
                    contributor("someone", &[(100, 100)]),
                ])),
            ),
            ("octocat/beta".to_string(), Ok(None)),
            (
                "octocat/delta".to_string(),
                Err(StatsError::NotFound("octocat/delta".into())),
            ),
        ];

        let (totals, skipped) = sum_contributor_lines("octocat", results).unwrap();
        assert_eq!(totals.additions, 15);
        assert_eq!(totals.deletions, 3);
        assert_eq!(skipped, vec!["octocat/beta", "octocat/delta"]);
    }

    #[test]
    fn test_sum_contributor_lines_stops_on_rate_limit() {
        let results = vec![(
            "octocat/alpha".to_string(),
            Err(StatsError::RateLimitExceeded("reset soon".into())),
        )];
        match sum_contributor_lines("octocat", results) {
            Err(StatsError::RateLimitExceeded(_)) => {}
            other => panic!("Expected RateLimitExceeded, got: {:?}", other.map(|(t, _)| t)),
        }
    }

    #[test]
    fn test_tolerate_keeps_rate_limit_errors() {
        let skipped = tolerate::<u64>("o/r", "views", Err(StatsError::NotFound("o/r".into())));
        assert!(matches!(skipped, Ok(None)));

        let fatal = tolerate::<u64>("o/r", "views", Err(StatsError::RateLimitExceeded("x".into())));
        assert!(matches!(fatal, Err(StatsError::RateLimitExceeded(_))));
    }
}
