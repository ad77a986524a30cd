use crate::activity::SlotStrategy;
use crate::cache::DEFAULT_CACHE_PATH;
use crate::generator::{GeneratorConfig, DEFAULT_OUTPUT_DIR};
use crate::github::DEFAULT_MAX_CONNECTIONS;
use crate::publish::OUTPUT_BRANCH;
use crate::stats::{StatsConfig, DEFAULT_RECENT_COMMITS};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "github-stats")]
#[command(about = "Generates SVG badges summarizing a GitHub account")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Personal access token used for every API request
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Account the statistics are generated for
    #[arg(long, env = "GITHUB_ACTOR")]
    pub user: String,

    /// Comma-separated `owner/name` repositories to exclude
    #[arg(long, env = "EXCLUDED", value_delimiter = ',', value_parser = trimmed)]
    pub excluded: Vec<String>,

    /// Comma-separated languages to exclude, case-insensitive
    #[arg(long, env = "EXCLUDED_LANGS", value_delimiter = ',', value_parser = trimmed)]
    pub excluded_langs: Vec<String>,

    /// Only count owned repositories; anything but empty or "false" enables it
    #[arg(
        long,
        env = "EXCLUDE_FORKED_REPOS",
        action = clap::ArgAction::Set,
        value_parser = parse_truthy,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub exclude_forked_repos: bool,

    /// `owner/repo` hosting the badges; prints the Markdown to embed them
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Directory the SVG files are written to
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory with custom templates instead of the built-in ones
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Runtime cache file for incremental statistics
    #[arg(long, default_value = DEFAULT_CACHE_PATH)]
    pub cache_path: PathBuf,

    /// Ignore cached totals and recompute everything
    #[arg(long)]
    pub refresh: bool,

    /// Number of commits on the recent commits card
    #[arg(long, default_value_t = DEFAULT_RECENT_COMMITS)]
    pub recent_commits: usize,

    /// Maximum concurrent API requests
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Year shown on the activity graph, the current one by default
    #[arg(long)]
    pub year: Option<i32>,

    /// How days are bucketed on the activity graph
    #[arg(long, value_enum, default_value_t = SlotStrategy::Compressed)]
    pub activity_slots: SlotStrategy,

    /// Print a text summary instead of generating images
    #[arg(long)]
    pub summary: bool,

    /// Commit the generated files to the output branch
    #[arg(long)]
    pub publish: bool,

    /// Push the output branch after publishing
    #[arg(long, requires = "publish")]
    pub push: bool,

    /// Branch the generated files are committed to
    #[arg(long, default_value = OUTPUT_BRANCH)]
    pub branch: String,

    /// Remote the output branch is pushed to
    #[arg(long, default_value = "origin")]
    pub remote: String,
}

impl Cli {
    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            username: self.user.clone(),
            exclude_repos: self.excluded.iter().filter(|r| !r.is_empty()).cloned().collect(),
            exclude_langs: self.excluded_langs.iter().filter(|l| !l.is_empty()).cloned().collect(),
            exclude_forked_repos: self.exclude_forked_repos,
            refresh: self.refresh,
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            output_dir: self.output_dir.clone(),
            recent_commits: self.recent_commits,
            year: self.year,
            slot_strategy: self.activity_slots,
        }
    }
}

fn trimmed(value: &str) -> Result<String, String> {
    Ok(value.trim().to_string())
}

/// Any value other than empty or `false` (any case) counts as true.
pub fn parse_truthy(value: &str) -> Result<bool, String> {
    let value = value.trim();
    Ok(!value.is_empty() && !value.eq_ignore_ascii_case("false"))
}
