//! Test fixtures shared by the pipeline, status, and sync tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use rfcpub_convert::Converter;
use rfcpub_shared::{AppConfig, ConversionPass, Result, RfcPubError};
use tempfile::TempDir;

use crate::pipeline::Project;

/// Imitates pandoc's DokuWiki writer closely enough to exercise cleanup:
/// headings become `======`, raw HTML gets wrapped in passthrough markers.
/// Any input containing `FAIL` exits with code 2.
#[derive(Default)]
pub(crate) struct FakeWiki {
    pub calls: AtomicUsize,
}

impl Converter for FakeWiki {
    fn describe(&self) -> String {
        "fake-wiki".into()
    }

    async fn run_pass(&self, input: &str, pass: &ConversionPass) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.contains("FAIL") {
            return Err(RfcPubError::ConverterFailed {
                program: "fake-wiki".into(),
                exit_code: Some(2),
                stderr: "simulated failure".into(),
            });
        }
        if pass.to != "dokuwiki" {
            return Ok(input.to_string());
        }
        Ok(input
            .lines()
            .map(|line| match line.strip_prefix("# ") {
                Some(title) => format!("====== {title} ======"),
                None if line.contains('<') => format!("<HTML>{line}</HTML>"),
                None => line.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// A temp project with `drafts/<slug>.md` for each `(slug, body)`.
pub(crate) fn project_with_drafts(drafts: &[(&str, &str)]) -> (TempDir, Project) {
    let dir = tempfile::tempdir().expect("tempdir");
    let drafts_dir = dir.path().join("drafts");
    std::fs::create_dir_all(&drafts_dir).expect("mkdir drafts");
    for (slug, body) in drafts {
        std::fs::write(drafts_dir.join(format!("{slug}.md")), body).expect("write draft");
    }
    let project = Project::new(dir.path(), AppConfig::default());
    (dir, project)
}

/// Push a file's mtime into the future so it reads as newer than anything
/// written during the test.
pub(crate) fn set_mtime_ahead(path: &Path) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(SystemTime::now() + Duration::from_secs(60)))
        .expect("set mtime");
}
