use github_stats::error::StatsError;
use github_stats::publish::{markdown_embed, raw_content_url, Artifact, Publisher};
use std::path::Path;
use tempfile::TempDir;
use tokio::process::Command;

#[test]
fn test_raw_content_url() {
    let url = raw_content_url("octocat", "octocat", "output", Artifact::ActivityGraph).unwrap();
    assert_eq!(
        url.as_str(),
        "https://raw.githubusercontent.com/octocat/octocat/output/generated/activity_graph.svg"
    );
}

#[test]
fn test_raw_content_url_escapes_segments() {
    let url = raw_content_url("octocat", "my stats", "output", Artifact::Overview).unwrap();
    assert_eq!(
        url.as_str(),
        "https://raw.githubusercontent.com/octocat/my%20stats/output/generated/overview.svg"
    );
}

#[test]
fn test_raw_content_url_rejects_bad_segments() {
    for (user, repo, branch) in [
        ("", "r", "output"),
        ("u", "a/b", "output"),
        ("u", "r", " "),
        ("u", "r", "feature//x"),
        ("u", "r", "output/"),
    ] {
        match raw_content_url(user, repo, branch, Artifact::Languages) {
            Err(StatsError::InvalidRepoName(_)) => {}
            other => panic!("Expected InvalidRepoName for {:?}, got: {:?}", (user, repo, branch), other),
        }
    }
}

#[test]
fn test_raw_content_url_with_nested_branch() {
    let url = raw_content_url("octocat", "profile", "feature/x", Artifact::Overview).unwrap();
    assert_eq!(
        url.as_str(),
        "https://raw.githubusercontent.com/octocat/profile/feature/x/generated/overview.svg"
    );

    let embed = markdown_embed("octocat", "profile", "stats/output").unwrap();
    assert!(embed
        .lines()
        .all(|line| line.contains("/octocat/profile/stats/output/generated/")));
}

#[test]
fn test_markdown_embed() {
    let embed = markdown_embed("octocat", "profile", "output").unwrap();
    let lines: Vec<&str> = embed.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "![Overview](https://raw.githubusercontent.com/octocat/profile/output/generated/overview.svg)"
    );
    assert!(lines[3].starts_with("![Recent Commits]("));
}

async fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).current_dir(dir).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn write_badges(dir: &Path, content: &str) {
    tokio::fs::create_dir_all(dir).await.unwrap();
    for artifact in Artifact::ALL {
        let svg = format!("<svg><text>{} {}</text></svg>", artifact.name(), content);
        tokio::fs::write(dir.join(artifact.file_name()), svg).await.unwrap();
    }
}

#[tokio::test]
async fn test_publish_commits_to_output_branch() {
    let repo = TempDir::new().unwrap();
    if git(repo.path(), &["init", "--quiet"]).await.is_none() {
        eprintln!("git is not available, skipping");
        return;
    }
    let out = repo.path().join("generated");
    write_badges(&out, "v1").await;

    let publisher = Publisher::new(repo.path(), "output").with_message("Update badges");

    let first = publisher
        .publish(&out)
        .await
        .expect("Publish failed")
        .expect("First publish should commit");

    let files = git(repo.path(), &["ls-tree", "-r", "--name-only", "refs/heads/output"])
        .await
        .unwrap();
    let files: Vec<&str> = files.lines().collect();
    assert_eq!(
        files,
        vec![
            "generated/activity_graph.svg",
            "generated/languages.svg",
            "generated/overview.svg",
            "generated/recent_commits.svg",
        ]
    );

    let author = git(repo.path(), &["log", "-1", "--format=%an|%s", "refs/heads/output"])
        .await
        .unwrap();
    assert_eq!(author, "github-actions[bot]|Update badges");

    // Same content: nothing to commit
    assert_eq!(publisher.publish(&out).await.unwrap(), None);

    write_badges(&out, "v2").await;
    let second = publisher
        .publish(&out)
        .await
        .unwrap()
        .expect("Changed files should commit");
    assert_ne!(second, first);

    let parent = git(repo.path(), &["rev-parse", "refs/heads/output^"]).await.unwrap();
    assert_eq!(parent, first);

    let overview = git(repo.path(), &["show", "refs/heads/output:generated/overview.svg"])
        .await
        .unwrap();
    assert_eq!(overview, "<svg><text>overview v2</text></svg>");
}

#[tokio::test]
async fn test_publish_without_generated_files() {
    let repo = TempDir::new().unwrap();
    if git(repo.path(), &["init", "--quiet"]).await.is_none() {
        eprintln!("git is not available, skipping");
        return;
    }

    let publisher = Publisher::new(repo.path(), "output");
    match publisher.publish(&repo.path().join("missing")).await {
        Err(StatsError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got: {:?}", other),
    }
}
