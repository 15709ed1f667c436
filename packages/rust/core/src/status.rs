//! Draft/output state and orphan pruning.
//!
//! Compares each draft against its published file by modification time, the
//! same rule a make-style dependency runner uses, and finds published files
//! whose draft has gone away.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use rfcpub_shared::{PublishTarget, Result, RfcPubError, Slug};

use crate::pipeline::{Project, files_with_ext};

// ---------------------------------------------------------------------------
// Per-draft state
// ---------------------------------------------------------------------------

/// How a draft's published file relates to the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    /// No published file yet.
    Missing,
    /// Draft modified after the published file.
    Stale,
    /// Published file at least as new as the draft.
    Current,
}

/// State of one draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftStatus {
    pub slug: Slug,
    pub draft: PathBuf,
    pub published: PathBuf,
    pub state: DraftState,
}

/// Full status of the corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub drafts: Vec<DraftStatus>,
    /// Published files with no matching draft.
    pub orphans: Vec<PathBuf>,
}

impl StatusReport {
    pub fn count(&self, state: DraftState) -> usize {
        self.drafts.iter().filter(|d| d.state == state).count()
    }

    /// True when a batch run would have nothing to write or prune.
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.drafts.iter().all(|d| d.state == DraftState::Current)
    }
}

/// Classify a single target by comparing modification times.
pub fn draft_state(target: &PublishTarget) -> Result<DraftState> {
    let published = match std::fs::metadata(&target.published) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DraftState::Missing),
        Err(e) => return Err(RfcPubError::io(&target.published, e)),
    };

    let draft_mtime = modified(&target.draft)?;
    let published_mtime = published
        .modified()
        .map_err(|e| RfcPubError::io(&target.published, e))?;

    Ok(if published_mtime >= draft_mtime {
        DraftState::Current
    } else {
        DraftState::Stale
    })
}

fn modified(path: &Path) -> Result<std::time::SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| RfcPubError::io(path, e))
}

/// Build the status report for every draft plus orphans. Read-only.
#[instrument(skip_all, fields(root = %project.root.display()))]
pub fn status(project: &Project) -> Result<StatusReport> {
    let targets = project.targets()?;

    let mut drafts = Vec::with_capacity(targets.len());
    for target in &targets {
        drafts.push(DraftStatus {
            slug: target.slug.clone(),
            draft: target.draft.clone(),
            published: target.published.clone(),
            state: draft_state(target)?,
        });
    }

    let orphans = find_orphans(project, &targets)?;
    Ok(StatusReport { drafts, orphans })
}

// ---------------------------------------------------------------------------
// Orphans
// ---------------------------------------------------------------------------

/// Published files (with the published extension) whose stem matches no draft.
pub fn find_orphans(project: &Project, targets: &[PublishTarget]) -> Result<Vec<PathBuf>> {
    let dir = project.published_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let live: HashSet<&Path> = targets.iter().map(|t| t.published.as_path()).collect();

    Ok(files_with_ext(&dir, &project.config.paths.published_ext)?
        .into_iter()
        .filter(|p| !live.contains(p.as_path()))
        .collect())
}

/// Delete orphaned published files. With `dry_run`, only report them.
#[instrument(skip(project), fields(root = %project.root.display()))]
pub fn prune_orphans(project: &Project, dry_run: bool) -> Result<Vec<PathBuf>> {
    let targets = project.targets()?;
    let orphans = find_orphans(project, &targets)?;

    if !dry_run {
        for path in &orphans {
            std::fs::remove_file(path).map_err(|e| RfcPubError::io(path, e))?;
            info!(path = %path.display(), "removed orphaned output");
        }
    }

    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BuildOptions, SilentProgress, build_all};
    use crate::testing::{FakeWiki, project_with_drafts, set_mtime_ahead};

    #[tokio::test]
    async fn states_track_builds_and_edits() {
        let (_dir, project) = project_with_drafts(&[("foo", "Foo"), ("bar", "Bar")]);

        let before = status(&project).expect("status");
        assert_eq!(before.count(DraftState::Missing), 2);
        assert!(!before.is_clean());

        build_all(&project, &FakeWiki::default(), BuildOptions::default(), &SilentProgress)
            .await
            .expect("build");
        let after = status(&project).expect("status");
        assert_eq!(after.count(DraftState::Current), 2);
        assert!(after.is_clean());

        set_mtime_ahead(&project.drafts_dir().join("foo.md"));
        let edited = status(&project).expect("status");
        let foo = edited.drafts.iter().find(|d| d.slug.as_str() == "foo").unwrap();
        assert_eq!(foo.state, DraftState::Stale);
    }

    #[test]
    fn orphans_only_count_published_extension() {
        let (dir, project) = project_with_drafts(&[("live", "Live")]);
        let published = dir.path().join("published");
        std::fs::create_dir_all(&published).expect("mkdir");
        std::fs::write(published.join("live.txt"), "x").expect("write");
        std::fs::write(published.join("dead.txt"), "x").expect("write");
        std::fs::write(published.join("README.md"), "x").expect("write");

        let report = status(&project).expect("status");
        assert_eq!(report.orphans, vec![published.join("dead.txt")]);
    }

    #[test]
    fn dry_run_keeps_files() {
        let (dir, project) = project_with_drafts(&[]);
        let published = dir.path().join("published");
        std::fs::create_dir_all(&published).expect("mkdir");
        std::fs::write(published.join("old.txt"), "x").expect("write");

        let listed = prune_orphans(&project, true).expect("dry run");
        assert_eq!(listed.len(), 1);
        assert!(published.join("old.txt").exists());

        let removed = prune_orphans(&project, false).expect("prune");
        assert_eq!(removed, listed);
        assert!(!published.join("old.txt").exists());
    }

    #[test]
    fn no_published_dir_means_no_orphans() {
        let (_dir, project) = project_with_drafts(&[("foo", "Foo")]);
        assert!(find_orphans(&project, &[]).expect("orphans").is_empty());
    }
}
