//! Project configuration for rfcpub.
//!
//! Config lives at `rfcpub.toml` in the corpus root. Every field has a
//! default, so a missing file behaves like the stock `drafts/` → `published/`
//! layout. CLI flags override config file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RfcPubError};
use crate::types::ConversionPass;

/// Default configuration file name, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "rfcpub.toml";

// ---------------------------------------------------------------------------
// Config structs (matching rfcpub.toml schema)
// ---------------------------------------------------------------------------

/// Top-level project config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Draft and publish directory layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External converter settings.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Batch behavior.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Commit-and-push settings for `sync`.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the markdown drafts, relative to the project root.
    #[serde(default = "default_drafts_dir")]
    pub drafts_dir: PathBuf,

    /// Directory receiving the converted output.
    #[serde(default = "default_published_dir")]
    pub published_dir: PathBuf,

    /// Extension of draft files (without the dot).
    #[serde(default = "default_draft_ext")]
    pub draft_ext: String,

    /// Extension of published files (without the dot).
    #[serde(default = "default_published_ext")]
    pub published_ext: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            drafts_dir: default_drafts_dir(),
            published_dir: default_published_dir(),
            draft_ext: default_draft_ext(),
            published_ext: default_published_ext(),
        }
    }
}

fn default_drafts_dir() -> PathBuf {
    "drafts".into()
}
fn default_published_dir() -> PathBuf {
    "published".into()
}
fn default_draft_ext() -> String {
    "md".into()
}
fn default_published_ext() -> String {
    "txt".into()
}

/// Where the converter binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterRuntime {
    /// Run `program` straight from `PATH`.
    Native,
    /// Run inside `docker run --rm -i <image>`.
    Docker,
}

/// `[converter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Native binary or container engine.
    #[serde(default = "default_runtime")]
    pub runtime: ConverterRuntime,

    /// Converter program for the native runtime.
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments placed before the per-pass format flags.
    #[serde(default)]
    pub args: Vec<String>,

    /// Container engine binary for the docker runtime.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Container image whose entrypoint is the converter.
    #[serde(default = "default_image")]
    pub image: String,

    /// Pull the image once before each batch.
    #[serde(default)]
    pub pull: bool,

    /// Format passes, applied in order, each piping into the next.
    #[serde(default = "default_passes")]
    pub passes: Vec<ConversionPass>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            program: default_program(),
            args: Vec::new(),
            engine: default_engine(),
            image: default_image(),
            pull: false,
            passes: default_passes(),
        }
    }
}

fn default_runtime() -> ConverterRuntime {
    ConverterRuntime::Docker
}
fn default_program() -> String {
    "pandoc".into()
}
fn default_engine() -> String {
    "docker".into()
}
fn default_image() -> String {
    "pandoc/core:3.1".into()
}
fn default_passes() -> Vec<ConversionPass> {
    vec![
        ConversionPass::new("gfm", "markdown"),
        ConversionPass::new("markdown", "dokuwiki"),
    ]
}

/// `[publish]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Skip drafts whose output is at least as new as the draft.
    #[serde(default)]
    pub incremental: bool,

    /// Delete published files whose draft no longer exists.
    #[serde(default)]
    pub prune: bool,
}

/// `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Commit message for automated publish commits.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Remote to push to.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Push after committing.
    #[serde(default = "default_true")]
    pub push: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            commit_message: default_commit_message(),
            remote: default_remote(),
            push: true,
        }
    }
}

fn default_commit_message() -> String {
    "Update published RFCs".into()
}
fn default_remote() -> String {
    "origin".into()
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Reject configs that cannot drive a conversion.
    pub fn validate(&self) -> Result<()> {
        if self.converter.passes.is_empty() {
            return Err(RfcPubError::config(
                "[converter] passes must list at least one pass",
            ));
        }
        for (name, ext) in [
            ("draft_ext", &self.paths.draft_ext),
            ("published_ext", &self.paths.published_ext),
        ] {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(RfcPubError::config(format!(
                    "[paths] {name} must be a bare extension, got '{ext}'"
                )));
            }
        }
        if self.paths.draft_ext == self.paths.published_ext
            && self.paths.drafts_dir == self.paths.published_dir
        {
            return Err(RfcPubError::config(
                "drafts and published files would overwrite each other",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the project config from `<root>/rfcpub.toml`. Returns defaults if the
/// file does not exist.
pub fn load_config(root: &Path) -> Result<AppConfig> {
    let path = root.join(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the project config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RfcPubError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        RfcPubError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Write a default `rfcpub.toml` into `root`. Refuses to clobber an existing
/// file. Returns the path to the created file.
pub fn init_config(root: &Path) -> Result<PathBuf> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(RfcPubError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| RfcPubError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RfcPubError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("published_dir"));
        assert!(toml_str.contains("dokuwiki"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[paths]
published_ext = "ptxt"

[converter]
runtime = "native"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.paths.published_ext, "ptxt");
        assert_eq!(config.paths.drafts_dir, PathBuf::from("drafts"));
        assert_eq!(config.converter.runtime, ConverterRuntime::Native);
        assert_eq!(config.converter.passes.len(), 2);
        assert!(config.sync.push);
    }

    #[test]
    fn custom_passes_parse() {
        let toml_str = r#"
[converter]
passes = [{ from = "markdown", to = "mediawiki" }]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.converter.passes, vec![ConversionPass::new("markdown", "mediawiki")]);
    }

    #[test]
    fn validate_rejects_empty_passes() {
        let mut config = AppConfig::default();
        config.converter.passes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_dotted_extension() {
        let mut config = AppConfig::default();
        config.paths.published_ext = ".txt".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("published_ext"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.paths.published_ext, "txt");
    }

    #[test]
    fn init_then_load_roundtrips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_config(dir.path()).expect("init");
        assert!(path.ends_with(CONFIG_FILE_NAME));

        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.sync.commit_message, "Update published RFCs");

        assert!(init_config(dir.path()).is_err());
    }
}
