#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use github_stats::cache::CacheStore;
use github_stats::github::GitHubClient;
use github_stats::stats::{Stats, StatsConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Mock server has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock server failed");
    });
    format!("http://{}/", addr)
}

pub fn test_client(base_url: &str) -> GitHubClient {
    GitHubClient::with_base_url("test_token".to_string(), base_url)
        .expect("Failed to create client")
        .with_retry_delay(Duration::from_millis(5))
}

/// Canned data the fake GitHub API answers with
#[derive(Debug, Default)]
pub struct MockData {
    /// Overview pages; page `i > 0` is served for `after: "cursor-i"`
    pub overview_pages: Vec<Value>,
    pub contribution_years: Vec<i32>,
    pub year_totals: HashMap<i32, u64>,
    pub calendar_days: Vec<(String, u64)>,
    /// Keyed by `owner/repo`; missing repos answer 404
    pub contributors: HashMap<String, Value>,
    /// Number of `202 Accepted` answers before contributor stats are ready
    pub contributors_pending: HashMap<String, usize>,
    /// Keyed by `owner/repo`; missing repos answer 403
    pub views: HashMap<String, Value>,
    pub events: Value,
    /// `(owner/repo, full sha, detail)`
    pub commits: Vec<(String, String, Value)>,
    /// Every REST path requested, in order
    pub requests: Vec<String>,
}

type Shared = Arc<Mutex<MockData>>;

pub struct MockGitHub {
    pub url: String,
    pub data: Shared,
}

impl MockGitHub {
    pub async fn start(data: MockData) -> Self {
        let data = Arc::new(Mutex::new(data));
        let router = Router::new()
            .route("/graphql", post(graphql))
            .route("/repos/:owner/:repo/stats/contributors", get(contributors))
            .route("/repos/:owner/:repo/traffic/views", get(views))
            .route("/repos/:owner/:repo/commits/:sha", get(commit))
            .route("/users/:user/events", get(events))
            .with_state(data.clone());

        let url = spawn_server(router).await;
        Self { url, data }
    }

    pub fn client(&self) -> Arc<GitHubClient> {
        Arc::new(test_client(&self.url))
    }

    pub fn stats(&self, cache: Arc<CacheStore>, config: StatsConfig) -> Stats {
        Stats::new(self.client(), cache, config)
    }

    /// Number of REST requests whose path contains `needle`
    pub fn request_count(&self, needle: &str) -> usize {
        let data = self.data.lock().unwrap();
        data.requests.iter().filter(|p| p.contains(needle)).count()
    }
}

pub fn octocat_config() -> StatsConfig {
    StatsConfig {
        username: "octocat".to_string(),
        ..Default::default()
    }
}

fn repo_node(name: &str, stars: u64, forks: u64, languages: &[(&str, u64, Option<&str>)]) -> Value {
    let edges: Vec<Value> = languages
        .iter()
        .map(|(lang, size, color)| json!({ "size": size, "node": { "name": lang, "color": color } }))
        .collect();
    json!({
        "nameWithOwner": name,
        "stargazers": { "totalCount": stars },
        "forkCount": forks,
        "languages": { "edges": edges }
    })
}

pub fn overview_page(name: Option<&str>, owned: Vec<Value>, owned_next: Option<&str>, contrib: Vec<Value>, contrib_next: Option<&str>) -> Value {
    json!({
        "data": {
            "viewer": {
                "login": "octocat",
                "name": name,
                "repositories": {
                    "pageInfo": { "hasNextPage": owned_next.is_some(), "endCursor": owned_next },
                    "nodes": owned
                },
                "repositoriesContributedTo": {
                    "pageInfo": { "hasNextPage": contrib_next.is_some(), "endCursor": contrib_next },
                    "nodes": contrib
                }
            }
        }
    })
}

/// An account with four repositories over two overview pages, one of them
/// only contributed to.
pub fn sample_data() -> MockData {
    let page_one = overview_page(
        Some("The Octocat"),
        vec![
            repo_node("octocat/alpha", 10, 2, &[("Rust", 3000, Some("#dea584")), ("HTML", 1000, Some("#e34c26"))]),
            repo_node("octocat/beta", 5, 1, &[("Rust", 1000, Some("#dea584"))]),
        ],
        Some("cursor-1"),
        vec![repo_node("other/gamma", 100, 50, &[("Python", 4000, Some("#3572A5"))])],
        None,
    );
    let page_two = overview_page(
        Some("The Octocat"),
        vec![
            repo_node("octocat/delta", 1, 0, &[("Go", 2000, None)]),
            repo_node("octocat/alpha", 10, 2, &[("Rust", 3000, Some("#dea584"))]),
        ],
        None,
        vec![],
        None,
    );

    let mut calendar_days: Vec<(String, u64)> = vec![("2023-12-31".to_string(), 9)];
    calendar_days.extend((1..=31).map(|d| (format!("2024-01-{:02}", d), 1)));
    calendar_days.push(("2024-02-01".to_string(), 4));

    MockData {
        overview_pages: vec![page_one, page_two],
        contribution_years: vec![2023, 2024],
        year_totals: HashMap::from([(2023, 500), (2024, 734)]),
        calendar_days,
        contributors: HashMap::from([
            (
                "octocat/alpha".to_string(),
                json!([
                    { "author": { "login": "octocat" }, "weeks": [ { "a": 100, "d": 10 }, { "a": 50, "d": 5 } ] },
                    { "author": { "login": "someone" }, "weeks": [ { "a": 999, "d": 999 } ] }
                ]),
            ),
            (
                "octocat/beta".to_string(),
                json!([ { "author": { "login": "OctoCat" }, "weeks": [ { "a": 7, "d": 3 } ] } ]),
            ),
            (
                "other/gamma".to_string(),
                json!([
                    { "author": null, "weeks": [ { "a": 1, "d": 1 } ] },
                    { "author": { "login": "octocat" }, "weeks": [ { "a": 20, "d": 2 } ] }
                ]),
            ),
        ]),
        contributors_pending: HashMap::from([("octocat/beta".to_string(), 2)]),
        views: HashMap::from([
            ("octocat/alpha".to_string(), json!({ "count": 7, "views": [ { "count": 3 }, { "count": 4 } ] })),
            ("octocat/beta".to_string(), json!({ "count": 10, "views": [ { "count": 10 } ] })),
            ("octocat/delta".to_string(), json!({ "count": 0, "views": [] })),
        ]),
        events: json!([
            {
                "type": "PushEvent",
                "repo": { "name": "octocat/alpha" },
                "payload": { "head": "aaaaaaa1111", "commits": [ { "sha": "aaaaaaa1111" } ] }
            },
            { "type": "WatchEvent", "repo": { "name": "other/gamma" }, "payload": {} },
            {
                "type": "PushEvent",
                "repo": { "name": "octocat/beta" },
                "payload": { "head": "bbbbbbb2222", "commits": [ { "sha": "bbbbbbb2222" }, { "sha": "ccccccc3333" } ] }
            },
            {
                "type": "PushEvent",
                "repo": { "name": "octocat/alpha" },
                "payload": { "head": "aaaaaaa1111", "commits": [ { "sha": "aaaaaaa1111" } ] }
            },
            {
                "type": "PushEvent",
                "repo": { "name": "other/gamma" },
                "payload": { "head": "ddddddd4444" }
            }
        ]),
        commits: vec![
            commit_detail("octocat/alpha", "aaaaaaa1111", "Add parser\n\nLong body", "2024-05-03T10:00:00Z", 30, 3),
            commit_detail("octocat/beta", "bbbbbbb2222", "Fix <overflow> & clean up", "2024-05-02T10:00:00Z", 12, 4),
            commit_detail("octocat/beta", "ccccccc3333", "Old work", "2024-04-01T00:00:00Z", 1000, 1000),
            commit_detail("other/gamma", "ddddddd4444", "Docs", "2024-05-01T09:00:00Z", 5, 5),
        ],
        requests: Vec::new(),
    }
}

pub fn commit_detail(repo: &str, sha: &str, message: &str, date: &str, additions: u64, deletions: u64) -> (String, String, Value) {
    let detail = json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": { "name": "Octo Cat", "date": date }
        },
        "stats": { "additions": additions, "deletions": deletions, "total": additions + deletions }
    });
    (repo.to_string(), sha.to_string(), detail)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
}

async fn graphql(State(data): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    let data = data.lock().unwrap();

    if query.contains("contributionYears") {
        return Json(json!({
            "data": { "viewer": { "contributionsCollection": { "contributionYears": data.contribution_years } } }
        }));
    }

    if query.contains("totalContributions") {
        let mut viewer = serde_json::Map::new();
        for (year, total) in &data.year_totals {
            if query.contains(&format!("year{}:", year)) {
                viewer.insert(
                    format!("year{}", year),
                    json!({ "contributionCalendar": { "totalContributions": total } }),
                );
            }
        }
        return Json(json!({ "data": { "viewer": viewer } }));
    }

    if query.contains("contributionDays") {
        let days: Vec<Value> = data
            .calendar_days
            .iter()
            .map(|(date, count)| json!({ "date": date, "contributionCount": count }))
            .collect();
        return Json(json!({
            "data": { "viewer": { "contributionsCollection": {
                "contributionCalendar": { "weeks": [ { "contributionDays": days } ] }
            } } }
        }));
    }

    let page = (1..data.overview_pages.len())
        .rev()
        .find(|i| query.contains(&format!("after: \"cursor-{}\"", i)))
        .unwrap_or(0);
    match data.overview_pages.get(page) {
        Some(page) => Json(page.clone()),
        None => Json(json!({ "data": null, "errors": [ { "message": "no overview" } ] })),
    }
}

async fn contributors(State(data): State<Shared>, Path((owner, repo)): Path<(String, String)>) -> Response {
    let full_name = format!("{}/{}", owner, repo);
    let mut data = data.lock().unwrap();
    data.requests.push(format!("/repos/{}/stats/contributors", full_name));

    if let Some(pending) = data.contributors_pending.get_mut(&full_name) {
        if *pending > 0 {
            *pending -= 1;
            return (StatusCode::ACCEPTED, Json(json!({}))).into_response();
        }
    }
    match data.contributors.get(&full_name) {
        Some(stats) => Json(stats.clone()).into_response(),
        None => not_found(),
    }
}

async fn views(State(data): State<Shared>, Path((owner, repo)): Path<(String, String)>) -> Response {
    let full_name = format!("{}/{}", owner, repo);
    let mut data = data.lock().unwrap();
    data.requests.push(format!("/repos/{}/traffic/views", full_name));

    match data.views.get(&full_name) {
        Some(views) => Json(views.clone()).into_response(),
        None => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Must have push access to repository" })),
        )
            .into_response(),
    }
}

async fn commit(State(data): State<Shared>, Path((owner, repo, sha)): Path<(String, String, String)>) -> Response {
    let full_name = format!("{}/{}", owner, repo);
    let mut data = data.lock().unwrap();
    data.requests.push(format!("/repos/{}/commits/{}", full_name, sha));

    data.commits
        .iter()
        .find(|(r, full_sha, _)| *r == full_name && full_sha.starts_with(&sha))
        .map(|(_, _, detail)| Json(detail.clone()).into_response())
        .unwrap_or_else(not_found)
}

async fn events(State(data): State<Shared>, Path(user): Path<String>) -> Json<Value> {
    let mut data = data.lock().unwrap();
    data.requests.push(format!("/users/{}/events", user));
    Json(data.events.clone())
}
