//! New-draft scaffolding from the conventional RFC outline.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use rfcpub_shared::{Result, RfcPubError, Slug};

use crate::pipeline::Project;

/// Section headings every RFC draft starts with.
const OUTLINE: &[&str] = &[
    "Introduction",
    "Proposal",
    "Backward Incompatible Changes",
    "Proposed PHP Version(s)",
    "RFC Impact",
    "Open Issues",
    "Unaffected PHP Functionality",
    "Future Scope",
    "Proposed Voting Choices",
    "Patches and Tests",
    "Implementation",
    "References",
    "Rejected Features",
];

/// Inputs for [`new_draft`].
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub slug: String,
    /// Defaults to the slug with words capitalized.
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: NaiveDate,
}

/// Create `drafts/<slug>.<ext>` with the standard header and outline.
///
/// Fails if the slug is not kebab/snake-case or the draft already exists.
pub fn new_draft(project: &Project, draft: &NewDraft) -> Result<PathBuf> {
    let slug = Slug::parse_strict(&draft.slug)?;

    let dir = project.drafts_dir();
    std::fs::create_dir_all(&dir).map_err(|e| RfcPubError::io(&dir, e))?;

    let path = dir.join(format!("{slug}.{}", project.config.paths.draft_ext));
    let mut file = match std::fs::File::options()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(RfcPubError::validation(format!(
                "draft {} already exists",
                path.display()
            )));
        }
        Err(e) => return Err(RfcPubError::io(&path, e)),
    };

    let body = render(&slug, draft);
    file.write_all(body.as_bytes())
        .map_err(|e| RfcPubError::io(&path, e))?;

    info!(path = %path.display(), "created draft");
    Ok(path)
}

fn render(slug: &Slug, draft: &NewDraft) -> String {
    let title = draft.title.clone().unwrap_or_else(|| title_from_slug(slug));
    let author = draft.author.as_deref().unwrap_or("Your Name <you@example.com>");

    let mut out = format!(
        "# PHP RFC: {title}\n\n\
         - Version: 0.1\n\
         - Date: {date}\n\
         - Author: {author}\n\
         - Status: Draft\n\
         - Implementation: TBD\n",
        date = draft.date.format("%Y-%m-%d"),
    );
    for section in OUTLINE {
        out.push_str(&format!("\n## {section}\n\n"));
    }
    out
}

fn title_from_slug(slug: &Slug) -> String {
    slug.as_str()
        .split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::project_with_drafts;

    fn request(slug: &str) -> NewDraft {
        NewDraft {
            slug: slug.into(),
            title: None,
            author: Some("Jane Doe".into()),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }

    #[test]
    fn creates_draft_with_outline() {
        let (_dir, project) = project_with_drafts(&[]);
        let path = new_draft(&project, &request("pipe-operator")).expect("create");

        assert!(path.ends_with("drafts/pipe-operator.md"));
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("# PHP RFC: Pipe Operator\n"));
        assert!(text.contains("- Date: 2026-03-14"));
        assert!(text.contains("- Author: Jane Doe"));
        assert!(text.contains("- Status: Draft"));
        assert!(text.contains("## Backward Incompatible Changes"));
        assert!(text.contains("## Proposed Voting Choices"));
    }

    #[test]
    fn explicit_title_wins() {
        let (_dir, project) = project_with_drafts(&[]);
        let mut req = request("enums");
        req.title = Some("Enumerations".into());
        let path = new_draft(&project, &req).expect("create");
        let text = std::fs::read_to_string(path).expect("read");
        assert!(text.starts_with("# PHP RFC: Enumerations\n"));
    }

    #[test]
    fn refuses_to_overwrite() {
        let (_dir, project) = project_with_drafts(&[("enums", "original")]);
        let err = new_draft(&project, &request("enums")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let text = std::fs::read_to_string(project.drafts_dir().join("enums.md")).expect("read");
        assert_eq!(text, "original");
    }

    #[test]
    fn rejects_bad_slug() {
        let (_dir, project) = project_with_drafts(&[]);
        assert!(new_draft(&project, &request("Not A Slug")).is_err());
    }

    #[test]
    fn title_from_snake_and_kebab() {
        let slug = Slug::parse_strict("readonly_props-v2").unwrap();
        assert_eq!(title_from_slug(&slug), "Readonly Props V2");
    }
}
