use serde::Deserialize;
use std::collections::HashMap;

// GitHub GraphQL response structures

/// Envelope every GraphQL response arrives in
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerData<T> {
    pub viewer: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewViewer {
    pub login: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub repositories: RepoConnection,
    #[serde(default)]
    pub repositories_contributed_to: RepoConnection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConnection {
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RepoNode>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoNode {
    pub name_with_owner: String,
    #[serde(default)]
    pub stargazers: TotalCount,
    #[serde(default)]
    pub fork_count: u64,
    #[serde(default)]
    pub languages: LanguageConnection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LanguageConnection {
    #[serde(default)]
    pub edges: Vec<LanguageEdge>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageEdge {
    #[serde(default)]
    pub size: u64,
    pub node: Option<LanguageNode>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageNode {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionYearsViewer {
    pub contributions_collection: ContributionYears,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionYears {
    #[serde(default)]
    pub contribution_years: Vec<i32>,
}

/// Per-year collections keyed by their `year<Y>` alias
pub type ContributionsByYear = HashMap<String, YearContributions>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearContributions {
    pub contribution_calendar: ContributionTotals,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionTotals {
    #[serde(default)]
    pub total_contributions: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarViewer {
    pub contributions_collection: CalendarCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCollection {
    pub contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Deserialize)]
pub struct ContributionCalendar {
    #[serde(default)]
    pub weeks: Vec<CalendarWeek>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarWeek {
    #[serde(default)]
    pub contribution_days: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: String,
    pub contribution_count: u64,
}

// GitHub REST response structures

#[derive(Debug, Deserialize)]
pub struct ContributorStats {
    pub author: Option<ContributorAuthor>,
    #[serde(default)]
    pub weeks: Vec<ContributorWeek>,
}

#[derive(Debug, Deserialize)]
pub struct ContributorAuthor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ContributorWeek {
    #[serde(default)]
    pub a: u64,
    #[serde(default)]
    pub d: u64,
}

#[derive(Debug, Deserialize)]
pub struct TrafficViews {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub views: Vec<TrafficView>,
}

#[derive(Debug, Deserialize)]
pub struct TrafficView {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct GitHubEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub repo: EventRepo,
    #[serde(default)]
    pub payload: EventPayload,
}

impl GitHubEvent {
    pub fn is_push(&self) -> bool {
        self.kind.as_deref() == Some("PushEvent")
    }
}

#[derive(Debug, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    pub head: Option<String>,
    #[serde(default)]
    pub commits: Vec<EventCommit>,
}

#[derive(Debug, Deserialize)]
pub struct EventCommit {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    pub sha: Option<String>,
    pub commit: CommitData,
    pub stats: Option<CommitStats>,
}

#[derive(Debug, Deserialize)]
pub struct CommitData {
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}
