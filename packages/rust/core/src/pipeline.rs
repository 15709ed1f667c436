//! Publish pipeline: drafts → converter → published files.
//!
//! [`convert_file`] is the single conversion step; [`build_all`] is the batch
//! driver that runs it once per draft, sequentially, stopping at the first
//! failure.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use rfcpub_convert::Converter;
use rfcpub_shared::{AppConfig, ConversionPass, DraftRef, PublishTarget, Result, RfcPubError, Slug};

use crate::status::{self, DraftState};

// ---------------------------------------------------------------------------
// Project layout
// ---------------------------------------------------------------------------

/// A corpus root plus its resolved configuration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory that `[paths]` entries are relative to.
    pub root: PathBuf,
    pub config: AppConfig,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.drafts_dir)
    }

    pub fn published_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.published_dir)
    }

    pub fn passes(&self) -> &[ConversionPass] {
        &self.config.converter.passes
    }

    /// All drafts in the draft store, sorted by path.
    ///
    /// A missing draft directory yields no drafts.
    pub fn discover_drafts(&self) -> Result<Vec<DraftRef>> {
        let dir = self.drafts_dir();
        if !dir.is_dir() {
            warn!(path = %dir.display(), "draft directory not found");
            return Ok(Vec::new());
        }

        let mut drafts = Vec::new();
        for path in files_with_ext(&dir, &self.config.paths.draft_ext)? {
            drafts.push(DraftRef::from_path(path)?);
        }
        Ok(drafts)
    }

    /// Every draft paired with its output path.
    pub fn targets(&self) -> Result<Vec<PublishTarget>> {
        let published_dir = self.published_dir();
        Ok(self
            .discover_drafts()?
            .iter()
            .map(|d| d.target(&published_dir, &self.config.paths.published_ext))
            .collect())
    }
}

/// Regular files directly inside `dir` with extension `ext`, sorted.
pub(crate) fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RfcPubError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RfcPubError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one draft during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Output was created or its content changed.
    Written,
    /// Converter ran; output was byte-identical and left in place.
    Unchanged,
    /// Incremental mode skipped the draft without running the converter.
    UpToDate,
}

/// Per-draft entry in a [`BatchReport`].
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub slug: Slug,
    pub published: PathBuf,
    pub outcome: FileOutcome,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Orphaned outputs deleted after conversion.
    pub pruned: Vec<PathBuf>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: std::time::Duration,
}

impl BatchReport {
    pub fn count(&self, outcome: FileOutcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }
}

fn serialize_millis<S: serde::Serializer>(
    d: &std::time::Duration,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each draft is handled.
    fn draft_done(&self, slug: &str, current: usize, total: usize);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn draft_done(&self, _slug: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Single conversion step
// ---------------------------------------------------------------------------

/// Convert one draft file into one published file.
///
/// Parent directories of `output` are created as needed. Nothing is written
/// unless every pass succeeds. When the new content matches the existing
/// output byte for byte, the file is left as is and only its mtime is
/// refreshed, so incremental runs treat it as current.
#[instrument(skip_all, fields(draft = %draft.display(), output = %output.display()))]
pub async fn convert_file<C: Converter>(
    converter: &C,
    passes: &[ConversionPass],
    draft: &Path,
    output: &Path,
) -> Result<FileOutcome> {
    let source = std::fs::read_to_string(draft).map_err(|e| RfcPubError::io(draft, e))?;

    let published = rfcpub_convert::convert_document(converter, &source, passes).await?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RfcPubError::io(parent, e))?;
    }

    let outcome = write_if_changed(output, &published)?;
    debug!(?outcome, bytes = published.len(), "draft converted");
    Ok(outcome)
}

/// SHA-256 of `bytes` as lowercase hex.
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write `content` to `path` atomically (temp file, then rename) unless the
/// existing file already holds the same bytes.
fn write_if_changed(path: &Path, content: &str) -> Result<FileOutcome> {
    if let Ok(existing) = std::fs::read(path) {
        if content_hash(&existing) == content_hash(content.as_bytes()) {
            touch(path)?;
            return Ok(FileOutcome::Unchanged);
        }
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RfcPubError::validation(format!("bad output path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| RfcPubError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RfcPubError::io(path, e))?;

    Ok(FileOutcome::Written)
}

fn touch(path: &Path) -> Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(SystemTime::now()))
        .map_err(|e| RfcPubError::io(path, e))
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Knobs for [`build_all`], merged from `[publish]` and CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Skip drafts whose output is at least as new as the draft.
    pub incremental: bool,
    /// Delete orphaned outputs after a successful batch.
    pub prune: bool,
}

impl From<&AppConfig> for BuildOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            incremental: config.publish.incremental,
            prune: config.publish.prune,
        }
    }
}

/// Run the conversion step for every draft.
///
/// 1. Let the converter prepare (image pull, if configured)
/// 2. Ensure the published directory exists
/// 3. Convert each draft in path order; the first failure aborts the batch
/// 4. Optionally prune orphaned outputs
#[instrument(skip_all, fields(root = %project.root.display(), incremental = options.incremental, prune = options.prune))]
pub async fn build_all<C: Converter>(
    project: &Project,
    converter: &C,
    options: BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let start = Instant::now();

    progress.phase("Preparing converter");
    converter.prepare().await?;

    let published_dir = project.published_dir();
    std::fs::create_dir_all(&published_dir).map_err(|e| RfcPubError::io(&published_dir, e))?;

    let targets = project.targets()?;
    let total = targets.len();
    info!(drafts = total, converter = %converter.describe(), "starting batch");

    progress.phase("Converting drafts");
    let mut report = BatchReport::default();

    for (i, target) in targets.iter().enumerate() {
        let outcome = if options.incremental
            && status::draft_state(target)? == DraftState::Current
        {
            debug!(slug = %target.slug, "output up to date, skipping");
            FileOutcome::UpToDate
        } else {
            convert_file(converter, project.passes(), &target.draft, &target.published).await?
        };

        progress.draft_done(target.slug.as_str(), i + 1, total);
        report.files.push(FileReport {
            slug: target.slug.clone(),
            published: target.published.clone(),
            outcome,
        });
    }

    if options.prune {
        progress.phase("Pruning orphaned outputs");
        report.pruned = status::prune_orphans(project, false)?;
    }

    report.elapsed = start.elapsed();
    progress.done(&report);

    info!(
        written = report.count(FileOutcome::Written),
        unchanged = report.count(FileOutcome::Unchanged),
        up_to_date = report.count(FileOutcome::UpToDate),
        pruned = report.pruned.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "batch complete"
    );

    Ok(report)
}
