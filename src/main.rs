use anyhow::Context;
use clap::Parser;
use colored::*;
use github_stats::cache::CacheStore;
use github_stats::cli::Cli;
use github_stats::generator::Generator;
use github_stats::github::GitHubClient;
use github_stats::publish::{markdown_embed, parse_repository, Publisher};
use github_stats::render::Templates;
use github_stats::stats::Stats;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("{}", "GitHub Stats Generator".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let client = Arc::new(
        GitHubClient::new(cli.access_token.clone())
            .context("Failed to create GitHub client")?
            .with_max_connections(cli.max_connections),
    );
    let cache = Arc::new(CacheStore::new(&cli.cache_path));
    let stats = Arc::new(Stats::new(client.clone(), cache, cli.stats_config()));

    if cli.summary {
        let summary = stats.summary().await.context("Failed to collect statistics")?;
        println!("{}", summary);
        return Ok(());
    }

    // Checked before anything is generated or committed
    let embed = match &cli.repository {
        Some(repository) => {
            let (owner, repo) = parse_repository(repository).context("Invalid --repository")?;
            Some(markdown_embed(&owner, &repo, &cli.branch).context("Invalid --branch for embed URLs")?)
        }
        None => None,
    };

    let templates = match &cli.templates_dir {
        Some(dir) => Templates::from_dir(dir).context("Failed to load templates")?,
        None => Templates::embedded(),
    };

    println!("📊 Generating statistics for {}", cli.user.bold());
    let generator = Generator::new(stats.clone(), templates, cli.generator_config());
    let written = generator
        .generate_all()
        .await
        .context("Failed to generate images")?;
    for path in &written {
        println!("✅ {}", path.display().to_string().green());
    }

    let rate_limit = client.rate_limit_state();
    info!(
        remaining = rate_limit.remaining,
        limit = rate_limit.limit,
        "API rate limit after generation"
    );

    if cli.publish {
        let publisher = Publisher::new(".", cli.branch.clone());
        match publisher
            .publish(generator.output_dir())
            .await
            .context("Failed to publish generated files")?
        {
            Some(commit) => println!("📦 Committed {} to {}", commit.dimmed(), cli.branch.bold()),
            None => println!("{}", "Generated files unchanged, nothing to commit".yellow()),
        }

        if cli.push {
            publisher
                .push(&cli.remote)
                .await
                .context("Failed to push output branch")?;
            println!("🚀 Pushed {} to {}", cli.branch.bold(), cli.remote);
        }
    }

    if let Some(embed) = &embed {
        println!("\n{}\n{}", "Embed in your profile README:".bold(), embed);
    }

    Ok(())
}
