//! Entry-point planning.
//!
//! Turns the page mapping into the two structures a multi-page build needs:
//!
//! ```text
//! [home]  title = "Home"     →  entries: home  → {src}/home
//! [about] title = "About"    →           about → {src}/about
//!                               html:    home/index.html  (chunks: [home])
//!                                        about/index.html (chunks: [about])
//! ```
//!
//! Planning is a pure, single pass over the mapping: no I/O, no hidden state,
//! output order equals input order. Each page's document references only the
//! page's own chunk, so code from one page never loads in another.

use crate::manifest::MANIFEST_FILE_NAME;
use crate::types::{EntryMap, HtmlDirective, PageConfig, PageMap, Plan};
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("page '{id}' has no title")]
    MissingTitle { id: String },
    #[error("page id '{id}' is not a single relative path segment")]
    InvalidPageId { id: String },
    #[error("page id '{id}' collides with a file the build writes")]
    ReservedPageId { id: String },
}

/// Plan entries and HTML documents for `pages`.
///
/// `source_root` is the directory entry modules live under; each page's entry
/// is `source_root/{id}`, with extension resolution left to the bundler.
/// `template` is attached to every directive unchanged.
///
/// Fails on the first page without a title, or whose id cannot be used as a
/// directory name in the output root. Nothing is returned on failure.
pub fn plan(
    pages: &PageMap,
    source_root: &Path,
    template: Option<&Path>,
) -> Result<Plan, PlanError> {
    if pages.is_empty() {
        tracing::warn!("no pages configured; the build has no entry points");
    }

    let mut entries = EntryMap::with_capacity(pages.len());
    let mut html = Vec::with_capacity(pages.len());

    for (id, settings) in pages {
        check_page_id(id)?;
        let title = settings
            .title
            .clone()
            .ok_or_else(|| PlanError::MissingTitle { id: id.clone() })?;

        entries.insert(id.clone(), source_root.join(id));
        html.push(HtmlDirective {
            page: PageConfig {
                id: id.clone(),
                title,
            },
            filename: format!("{id}/index.html"),
            template: template.map(Path::to_path_buf),
            chunks: vec![id.clone()],
        });
    }

    tracing::debug!(pages = html.len(), "planned entries");
    Ok(Plan { entries, html })
}

/// An id must name exactly one ordinary path component.
fn check_page_id(id: &str) -> Result<(), PlanError> {
    let mut components = Path::new(id).components();
    let valid = !id.contains(['/', '\\'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !valid {
        return Err(PlanError::InvalidPageId { id: id.to_string() });
    }
    // `{output}/manifest.json` is a file; a page would need it as a directory.
    if id.eq_ignore_ascii_case(MANIFEST_FILE_NAME) {
        return Err(PlanError::ReservedPageId { id: id.to_string() });
    }
    Ok(())
}
