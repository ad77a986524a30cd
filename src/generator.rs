use crate::activity::SlotStrategy;
use crate::error::Result;
use crate::publish::Artifact;
use crate::render::{self, OverviewData, Templates};
use crate::stats::{Stats, DEFAULT_RECENT_COMMITS};
use chrono::{Datelike, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_OUTPUT_DIR: &str = "generated";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub recent_commits: usize,
    /// Year shown on the activity graph; the current year when unset
    pub year: Option<i32>,
    pub slot_strategy: SlotStrategy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            recent_commits: DEFAULT_RECENT_COMMITS,
            year: None,
            slot_strategy: SlotStrategy::default(),
        }
    }
}

/// Renders the four badges from one shared [`Stats`]
pub struct Generator {
    stats: Arc<Stats>,
    templates: Templates,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(stats: Arc<Stats>, templates: Templates, config: GeneratorConfig) -> Self {
        Self {
            stats,
            templates,
            config,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Generates every badge concurrently and returns the written paths.
    pub async fn generate_all(&self) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let (overview, languages, recent, activity) = tokio::try_join!(
            self.generate_overview(),
            self.generate_languages(),
            self.generate_recent_commits(),
            self.generate_activity_graph(),
        )?;

        Ok(vec![overview, languages, activity, recent])
    }

    pub async fn generate_overview(&self) -> Result<PathBuf> {
        let overview = self.stats.overview().await?;
        let (contributions, lines, views) = tokio::try_join!(
            self.stats.total_contributions(),
            self.stats.lines_changed(),
            self.stats.views(),
        )?;

        let data = OverviewData {
            name: overview.name.clone(),
            stars: overview.stargazers,
            forks: overview.forks,
            contributions,
            lines_changed: lines.total(),
            views,
            repos: overview.repos.len() as u64,
        };
        let svg = render::render_overview(&self.templates.overview, &data);
        self.write(Artifact::Overview, svg).await
    }

    pub async fn generate_languages(&self) -> Result<PathBuf> {
        let languages = self.stats.languages().await?;
        let svg = render::render_languages(&self.templates.languages, &languages);
        self.write(Artifact::Languages, svg).await
    }

    pub async fn generate_recent_commits(&self) -> Result<PathBuf> {
        let commits = self.stats.recent_commits(self.config.recent_commits).await?;
        let svg = render::render_recent_commits(&self.templates.recent_commits, &commits);
        self.write(Artifact::RecentCommits, svg).await
    }

    pub async fn generate_activity_graph(&self) -> Result<PathBuf> {
        let today: NaiveDate = Utc::now().date_naive();
        let year = self.config.year.unwrap_or_else(|| today.year());
        let series = self
            .stats
            .activity_series(year, self.config.slot_strategy, today)
            .await?;
        let svg = render::render_activity_graph(&self.templates.activity_graph, &series);
        self.write(Artifact::ActivityGraph, svg).await
    }

    async fn write(&self, artifact: Artifact, svg: String) -> Result<PathBuf> {
        let path = self.config.output_dir.join(artifact.file_name());
        tokio::fs::write(&path, svg).await?;
        info!(path = %path.display(), "Generated {}", artifact.title());
        Ok(path)
    }
}
