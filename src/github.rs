use crate::error::{Result, StatsError};
use crate::models::RateLimitState;
use crate::types::GraphQlResponse;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com/";
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;
const MAX_RETRIES: u32 = 3;
/// How often a `202 Accepted` is retried before giving up on the resource
const MAX_ACCEPTED_RETRIES: u32 = 60;
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
/// Short rate-limit waits allowed per request before giving up
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

pub struct GitHubClient {
    client: Client,
    token: String,
    base_url: Url,
    semaphore: Semaphore,
    retry_delay: Duration,
    rate_limit: Mutex<RateLimitState>,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, API_BASE_URL)
    }

    /// Client against another API root, e.g. GitHub Enterprise or a local stand-in.
    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("github-stats/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(GitHubClient {
            client,
            token,
            base_url,
            semaphore: Semaphore::new(DEFAULT_MAX_CONNECTIONS),
            retry_delay: Duration::from_secs(2),
            rate_limit: Mutex::new(RateLimitState::default()),
        })
    }

    /// Caps the number of requests in flight at once.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.semaphore = Semaphore::new(max_connections.max(1));
        self
    }

    /// Delay between retries of accepted, failed or server-errored requests.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Rate limit state seen on the most recent response
    pub fn rate_limit_state(&self) -> RateLimitState {
        match self.rate_limit.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn make_request<F>(&self, url: &Url, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut rate_limit_waits = 0;

        loop {
            let sent = {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|e| StatsError::ApiError(format!("Request limiter closed: {}", e)))?;
                build().send().await
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) if retries < MAX_RETRIES && !e.is_builder() => {
                    warn!(%url, error = %e, "Request failed. Retrying...");
                    sleep(self.retry_delay).await;
                    retries += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let rate_limit = get_rate_limit_state(response.headers());
            if let Ok(mut state) = self.rate_limit.lock() {
                *state = rate_limit.clone();
            }

            match response.status() {
                status if status.is_success() => {
                    if rate_limit.remaining < 10 {
                        warn!(
                            remaining = rate_limit.remaining,
                            "Rate limit low. Adding delay..."
                        );
                        sleep(Duration::from_secs(1)).await;
                    }
                    return Ok(response);
                }
                StatusCode::NOT_FOUND => {
                    return Err(StatsError::NotFound(url.path().to_string()));
                }
                StatusCode::UNAUTHORIZED => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(StatsError::AuthError(format!(
                        "Bad credentials for {}: {}",
                        url.path(),
                        error_text
                    )));
                }
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    let wait_time = match retry_after(response.headers()) {
                        Some(wait) => Some(wait),
                        None if rate_limit.is_limited => Some(time_until(rate_limit.reset_time)),
                        None => None,
                    };

                    match wait_time {
                        Some(wait) if wait > MAX_RATE_LIMIT_WAIT => {
                            return Err(StatsError::RateLimitExceeded(format!(
                                "API rate limit exceeded. Reset at: {}",
                                rate_limit.reset_time
                            )));
                        }
                        Some(_) if rate_limit_waits >= MAX_RATE_LIMIT_RETRIES => {
                            return Err(StatsError::RateLimitExceeded(format!(
                                "Still rate limited after {} waits for {}",
                                rate_limit_waits,
                                url.path()
                            )));
                        }
                        Some(wait) => {
                            warn!(
                                wait_seconds = wait.as_secs() + 1,
                                attempt = rate_limit_waits + 1,
                                "Rate limit reached. Waiting..."
                            );
                            sleep(wait + Duration::from_secs(1)).await;
                            rate_limit_waits += 1;
                            continue;
                        }
                        None => {
                            let status = response.status();
                            let error_text = response.text().await.unwrap_or_default();
                            return Err(StatsError::ApiError(format!(
                                "{}: {}",
                                status, error_text
                            )));
                        }
                    }
                }
                status if status.is_server_error() && retries < MAX_RETRIES => {
                    warn!(%status, %url, "Server error. Retrying...");
                    sleep(self.retry_delay).await;
                    retries += 1;
                    continue;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(StatsError::ApiError(format!(
                        "API request failed with status {}: {}",
                        status, error_text
                    )));
                }
            }
        }
    }

    /// Runs a GraphQL document against the v4 API and decodes its `data`.
    pub async fn graphql<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        let url = self.endpoint("graphql")?;
        let body = json!({ "query": query });

        let response = self
            .make_request(&url, || {
                self.client
                    .post(url.clone())
                    .header("Authorization", format!("Bearer {}", self.token))
                    .json(&body)
            })
            .await?;

        let decoded: GraphQlResponse<T> = response.json().await?;
        let messages: Vec<String> = decoded.errors.into_iter().map(|e| e.message).collect();

        match decoded.data {
            Some(data) => {
                if !messages.is_empty() {
                    warn!(errors = ?messages, "GraphQL query returned partial data");
                }
                Ok(data)
            }
            None => Err(StatsError::ApiError(format!(
                "GraphQL query returned no data: {}",
                messages.join("; ")
            ))),
        }
    }

    /// GET against the v3 REST API.
    ///
    /// GitHub answers `202 Accepted` while it computes statistics in the
    /// background. Those requests are polled; `Ok(None)` means the data never
    /// became available.
    pub async fn rest<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let mut url = self.endpoint(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        for _ in 0..MAX_ACCEPTED_RETRIES {
            let response = self
                .make_request(&url, || {
                    self.client
                        .get(url.clone())
                        .header("Accept", "application/vnd.github.v3+json")
                        .header("Authorization", format!("token {}", self.token))
                })
                .await?;

            if response.status() == StatusCode::ACCEPTED {
                debug!(path = url.path(), "Request accepted but not ready. Retrying...");
                sleep(self.retry_delay).await;
                continue;
            }

            return Ok(Some(response.json().await?));
        }

        warn!(
            path = url.path(),
            "There were too many 202s. Data for this repository will be incomplete."
        );
        Ok(None)
    }
}

/// Parses the `X-RateLimit-*` headers of a response
pub fn get_rate_limit_state(headers: &HeaderMap) -> RateLimitState {
    let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

    let remaining = header("X-RateLimit-Remaining").and_then(|s| s.parse::<u32>().ok());

    let limit = header("X-RateLimit-Limit")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(5000);

    let reset_time = header("X-RateLimit-Reset")
        .and_then(|s| s.parse::<i64>().ok())
        .map(|timestamp| DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

    RateLimitState {
        remaining: remaining.unwrap_or(limit),
        limit,
        reset_time,
        is_limited: remaining == Some(0),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn time_until(reset_time: DateTime<Utc>) -> Duration {
    let reset = SystemTime::from(reset_time);
    reset
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::from_secs(0))
}
