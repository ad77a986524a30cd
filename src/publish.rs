use crate::error::{Result, StatsError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

/// Branch the generated badges are committed to
pub const OUTPUT_BRANCH: &str = "output";
/// Directory holding the badges, on disk and on the output branch
pub const OUTPUT_DIR: &str = "generated";
pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com/";

const BOT_NAME: &str = "github-actions[bot]";
const BOT_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

/// One of the generated SVG documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Overview,
    Languages,
    ActivityGraph,
    RecentCommits,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Overview,
        Artifact::Languages,
        Artifact::ActivityGraph,
        Artifact::RecentCommits,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Overview => "overview",
            Artifact::Languages => "languages",
            Artifact::ActivityGraph => "activity_graph",
            Artifact::RecentCommits => "recent_commits",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.svg", self.name())
    }

    /// Path relative to the repository root, e.g. `generated/overview.svg`
    pub fn relative_path(&self) -> String {
        format!("{}/{}", OUTPUT_DIR, self.file_name())
    }

    pub fn title(&self) -> &'static str {
        match self {
            Artifact::Overview => "Overview",
            Artifact::Languages => "Languages",
            Artifact::ActivityGraph => "Activity Graph",
            Artifact::RecentCommits => "Recent Commits",
        }
    }
}

fn check_segment(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() || value.contains('/') {
        return Err(StatsError::InvalidRepoName(format!(
            "Invalid {}: {:?}",
            what, value
        )));
    }
    Ok(())
}

/// Splits `owner/repo`, as found in `GITHUB_REPOSITORY`.
pub fn parse_repository(full_name: &str) -> Result<(String, String)> {
    let (owner, repo) = full_name.split_once('/').ok_or_else(|| {
        StatsError::InvalidRepoName(format!("Expected owner/repo, got {:?}", full_name))
    })?;
    check_segment("owner", owner)?;
    check_segment("repository", repo)?;
    Ok((owner.to_string(), repo.to_string()))
}

/// Raw content URL an artifact is served from once published
pub fn raw_content_url(user: &str, repo: &str, branch: &str, artifact: Artifact) -> Result<Url> {
    check_segment("user", user)?;
    check_segment("repository", repo)?;
    // Branch names such as `feature/badges` span several path segments
    let branch_segments: Vec<&str> = branch.split('/').collect();
    for segment in &branch_segments {
        if segment.trim().is_empty() {
            return Err(StatsError::InvalidRepoName(format!(
                "Invalid branch: {:?}",
                branch
            )));
        }
    }

    let mut url = Url::parse(RAW_CONTENT_BASE)?;
    url.path_segments_mut()
        .map_err(|_| StatsError::ConfigError("Raw content base cannot hold a path".to_string()))?
        .pop_if_empty()
        .extend([user, repo])
        .extend(branch_segments)
        .extend([OUTPUT_DIR, artifact.file_name().as_str()]);
    Ok(url)
}

/// Markdown image lines embedding every artifact, ready for a profile README
pub fn markdown_embed(user: &str, repo: &str, branch: &str) -> Result<String> {
    let mut lines = Vec::with_capacity(Artifact::ALL.len());
    for artifact in Artifact::ALL {
        let url = raw_content_url(user, repo, branch, artifact)?;
        lines.push(format!("![{}]({})", artifact.title(), url));
    }
    Ok(lines.join("\n"))
}

/// Commits the generated badges onto a branch with git plumbing, leaving the
/// working tree and the checked out branch alone.
#[derive(Debug, Clone)]
pub struct Publisher {
    repo_dir: PathBuf,
    branch: String,
    message: String,
}

impl Publisher {
    pub fn new(repo_dir: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            branch: branch.into(),
            message: "Update generated statistics".to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    async fn git(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.repo_dir)
            .env("GIT_AUTHOR_NAME", BOT_NAME)
            .env("GIT_AUTHOR_EMAIL", BOT_EMAIL)
            .env("GIT_COMMITTER_NAME", BOT_NAME)
            .env("GIT_COMMITTER_EMAIL", BOT_EMAIL)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(StatsError::GitError(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(args = ?args, "git {}", stdout);
        Ok(stdout)
    }

    /// Commits `output_dir`'s artifacts as `generated/` on the branch.
    ///
    /// Returns the new commit, or `None` when the branch already holds
    /// identical files.
    pub async fn publish(&self, output_dir: &Path) -> Result<Option<String>> {
        let mut entries = String::new();
        for artifact in Artifact::ALL {
            let path = output_dir.join(artifact.file_name());
            let path = tokio::fs::canonicalize(&path)
                .await
                .map_err(|e| StatsError::NotFound(format!("{}: {}", path.display(), e)))?;
            let path = path.to_string_lossy().into_owned();
            let blob = self.git(&["hash-object", "-w", "--", path.as_str()], None).await?;
            entries.push_str(&format!("100644 blob {}\t{}\n", blob, artifact.file_name()));
        }

        let generated_tree = self.git(&["mktree"], Some(&entries)).await?;
        let root_tree = self
            .git(
                &["mktree"],
                Some(&format!("040000 tree {}\t{}\n", generated_tree, OUTPUT_DIR)),
            )
            .await?;

        let branch_ref = self.branch_ref();
        let branch_commit = format!("{}^{{commit}}", branch_ref);
        let parent = self
            .git(&["rev-parse", "--verify", "--quiet", branch_commit.as_str()], None)
            .await
            .ok()
            .filter(|sha| !sha.is_empty());

        let mut commit_args = vec!["commit-tree", root_tree.as_str(), "-m", self.message.as_str()];
        if let Some(parent) = parent.as_deref() {
            let parent_tree_spec = format!("{}^{{tree}}", parent);
            let parent_tree = self.git(&["rev-parse", parent_tree_spec.as_str()], None).await?;
            if parent_tree == root_tree {
                info!(branch = %self.branch, "Generated files unchanged. Nothing to publish.");
                return Ok(None);
            }
            commit_args.extend(["-p", parent]);
        }
        let commit = self.git(&commit_args, None).await?;

        let mut update_args = vec!["update-ref", branch_ref.as_str(), commit.as_str()];
        if let Some(parent) = parent.as_deref() {
            update_args.push(parent);
        }
        self.git(&update_args, None).await?;

        info!(branch = %self.branch, commit = %commit, "Published generated files");
        Ok(Some(commit))
    }

    pub async fn push(&self, remote: &str) -> Result<()> {
        let refspec = format!("{0}:{0}", self.branch_ref());
        self.git(&["push", remote, refspec.as_str()], None).await?;
        info!(remote, branch = %self.branch, "Pushed output branch");
        Ok(())
    }
}
