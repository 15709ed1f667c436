//! Core domain types for the draft → published mapping.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RfcPubError};

// ---------------------------------------------------------------------------
// Slug
// ---------------------------------------------------------------------------

/// A proposal identifier: the draft's filename stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Accept any non-empty stem, as found on disk.
    pub fn from_stem(stem: impl Into<String>) -> Result<Self> {
        let stem = stem.into();
        if stem.is_empty() {
            return Err(RfcPubError::validation("empty file stem"));
        }
        Ok(Self(stem))
    }

    /// Accept only lowercase kebab/snake-case names, for newly created drafts.
    pub fn parse_strict(s: &str) -> Result<Self> {
        static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$").expect("valid regex")
        });

        if SLUG_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(RfcPubError::validation(format!(
                "slug '{s}' must be lowercase words joined by '-' or '_'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ConversionPass
// ---------------------------------------------------------------------------

/// One converter invocation: read `from`, write `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPass {
    pub from: String,
    pub to: String,
}

impl ConversionPass {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl std::fmt::Display for ConversionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// DraftRef / PublishTarget
// ---------------------------------------------------------------------------

/// A draft discovered in the draft store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftRef {
    pub slug: Slug,
    pub path: PathBuf,
}

impl DraftRef {
    /// Build a ref from a path, taking the slug from its file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                RfcPubError::validation(format!("no usable file stem in {}", path.display()))
            })?;
        Ok(Self {
            slug: Slug::from_stem(stem)?,
            path,
        })
    }

    /// The output location for this draft under `published_dir`.
    pub fn target(&self, published_dir: &Path, published_ext: &str) -> PublishTarget {
        PublishTarget {
            slug: self.slug.clone(),
            draft: self.path.clone(),
            published: published_dir.join(format!("{}.{published_ext}", self.slug)),
        }
    }
}

/// A draft paired with the file it publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishTarget {
    pub slug: Slug,
    pub draft: PathBuf,
    pub published: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_slug_accepts_kebab_and_snake() {
        assert!(Slug::parse_strict("nullsafe-operator").is_ok());
        assert!(Slug::parse_strict("enum_v2").is_ok());
    }

    #[test]
    fn strict_slug_rejects_odd_names() {
        for bad in ["", "Foo", "a--b", "-lead", "trail-", "has space", "dot.md"] {
            assert!(Slug::parse_strict(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn draft_ref_takes_stem_as_slug() {
        let draft = DraftRef::from_path("drafts/pipe-operator.md").expect("ref");
        assert_eq!(draft.slug.as_str(), "pipe-operator");

        let target = draft.target(Path::new("published"), "txt");
        assert_eq!(target.published, PathBuf::from("published/pipe-operator.txt"));
        assert_eq!(target.draft, PathBuf::from("drafts/pipe-operator.md"));
    }

    #[test]
    fn pass_display() {
        assert_eq!(
            ConversionPass::new("markdown", "dokuwiki").to_string(),
            "markdown -> dokuwiki"
        );
    }
}
