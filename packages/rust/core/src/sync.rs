//! Rebuild-and-commit flow for CI.
//!
//! Runs the batch driver, then commits and pushes the published directory if
//! the build changed it. Git is driven as a child process; any non-zero exit
//! aborts with that exit code and no retry.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument};

use rfcpub_convert::Converter;
use rfcpub_shared::{Result, RfcPubError, SyncConfig};

use crate::pipeline::{BatchReport, BuildOptions, Project, ProgressReporter, build_all};

// ---------------------------------------------------------------------------
// Git runner
// ---------------------------------------------------------------------------

/// Minimal git driver rooted at a working tree.
#[derive(Debug, Clone)]
pub struct Git {
    repo: PathBuf,
}

impl Git {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    /// Run `git <args>` in the repo and return trimmed stdout.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RfcPubError::io(&self.repo, e))?;

        if !output.status.success() {
            return Err(RfcPubError::Git {
                args: args.join(" "),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Whether `path` has staged, unstaged, or untracked changes.
    pub async fn has_changes(&self, path: &Path) -> Result<bool> {
        let path = path.to_string_lossy();
        let porcelain = self
            .run(&["status", "--porcelain", "--untracked-files=all", "--", &path])
            .await?;
        Ok(!porcelain.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Sync flow
// ---------------------------------------------------------------------------

/// Knobs for [`sync`], merged from `[sync]`, `[publish]`, and CLI flags.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub build: BuildOptions,
    pub commit_message: String,
    pub remote: String,
    pub push: bool,
}

impl SyncOptions {
    pub fn new(build: BuildOptions, config: &SyncConfig) -> Self {
        Self {
            build,
            commit_message: config.commit_message.clone(),
            remote: config.remote.clone(),
            push: config.push,
        }
    }
}

/// What [`sync`] did.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncOutcome {
    pub report: BatchReport,
    pub committed: bool,
    pub pushed: bool,
}

/// Rebuild every draft, then commit and push the published directory if it
/// changed. No changes means no commit.
#[instrument(skip_all, fields(root = %project.root.display(), push = options.push))]
pub async fn sync<C: Converter>(
    project: &Project,
    converter: &C,
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<SyncOutcome> {
    let report = build_all(project, converter, options.build, progress).await?;

    let git = Git::new(&project.root);
    let published = &project.config.paths.published_dir;

    if !git.has_changes(published).await? {
        info!("published output unchanged, nothing to commit");
        return Ok(SyncOutcome {
            report,
            committed: false,
            pushed: false,
        });
    }

    progress.phase("Committing published output");
    let published_arg = published.to_string_lossy();
    git.run(&["add", "--all", "--", &published_arg]).await?;
    // The pathspec keeps anything else already staged out of the commit.
    git.run(&[
        "commit",
        "--quiet",
        "-m",
        &options.commit_message,
        "--",
        &published_arg,
    ])
    .await?;
    info!(message = %options.commit_message, "committed published output");

    if options.push {
        progress.phase("Pushing");
        git.run(&["push", &options.remote, "HEAD"]).await?;
        info!(remote = %options.remote, "pushed");
    }

    Ok(SyncOutcome {
        report,
        committed: true,
        pushed: options.push,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeWiki, project_with_drafts};

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn init_repo(git: &Git) {
        let steps: [&[&str]; 6] = [
            &["init", "--quiet"],
            &["config", "user.email", "ci@example.com"],
            &["config", "user.name", "CI"],
            &["config", "commit.gpgsign", "false"],
            &["add", "--all"],
            &["commit", "--quiet", "-m", "Add drafts"],
        ];
        for args in steps {
            git.run(args).await.expect("git setup");
        }
    }

    fn options() -> SyncOptions {
        SyncOptions {
            build: BuildOptions::default(),
            commit_message: "Update published RFCs".into(),
            remote: "origin".into(),
            push: false,
        }
    }

    #[tokio::test]
    async fn commits_once_then_noops() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let (_dir, project) = project_with_drafts(&[("foo", "# Foo\n\nBody")]);
        let git = Git::new(&project.root);
        init_repo(&git).await;

        let first = sync(&project, &FakeWiki::default(), &options(), &SilentProgress)
            .await
            .expect("first sync");
        assert!(first.committed);
        assert!(!first.pushed);
        assert_eq!(git.run(&["rev-list", "--count", "HEAD"]).await.unwrap(), "2");
        assert_eq!(
            git.run(&["log", "-1", "--format=%s"]).await.unwrap(),
            "Update published RFCs"
        );

        let second = sync(&project, &FakeWiki::default(), &options(), &SilentProgress)
            .await
            .expect("second sync");
        assert!(!second.committed);
        assert_eq!(git.run(&["rev-list", "--count", "HEAD"]).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn commit_leaves_unrelated_staged_files_alone() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let (_dir, project) = project_with_drafts(&[("foo", "# Foo")]);
        let git = Git::new(&project.root);
        init_repo(&git).await;

        std::fs::write(project.root.join("notes.txt"), "local only").expect("write");
        git.run(&["add", "notes.txt"]).await.expect("stage");

        let outcome = sync(&project, &FakeWiki::default(), &options(), &SilentProgress)
            .await
            .expect("sync");
        assert!(outcome.committed);
        assert_eq!(
            git.run(&["show", "--name-only", "--format=", "HEAD"])
                .await
                .unwrap(),
            "published/foo.txt"
        );
        assert_eq!(
            git.run(&["diff", "--cached", "--name-only"]).await.unwrap(),
            "notes.txt"
        );
    }

    #[tokio::test]
    async fn push_failure_surfaces_git_error() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let (_dir, project) = project_with_drafts(&[("foo", "Foo")]);
        let git = Git::new(&project.root);
        init_repo(&git).await;

        let mut opts = options();
        opts.push = true;
        opts.remote = "no-such-remote".into();

        let err = sync(&project, &FakeWiki::default(), &opts, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, RfcPubError::Git { .. }));
        assert!(err.exit_code().is_some());
    }

    #[tokio::test]
    async fn failed_build_makes_no_commit() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let (_dir, project) = project_with_drafts(&[("bad", "FAIL")]);
        let git = Git::new(&project.root);
        init_repo(&git).await;

        assert!(sync(&project, &FakeWiki::default(), &options(), &SilentProgress)
            .await
            .is_err());
        assert_eq!(git.run(&["rev-list", "--count", "HEAD"]).await.unwrap(), "1");
    }
}
