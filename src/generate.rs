//! HTML document generation.
//!
//! Writes one document per [`HtmlDirective`] and the files around them:
//!
//! ```text
//! dist/
//! ├── manifest.json          # Build manifest for the bundler
//! ├── home/
//! │   └── index.html         # loads only the `home` chunk
//! ├── about/
//! │   └── index.html         # loads only the `about` chunk
//! ├── images/
//! │   └── hero.1a2b3c4d.png  # Images at or above the inline limit
//! └── fonts/
//!     └── icons.9f8e7d6c.woff2
//! ```
//!
//! ## Templates
//!
//! When a directive carries a template, the template text is used as-is with:
//!
//! - every `{{ title }}` replaced by the escaped page title
//! - `<link rel="stylesheet">` tags inserted before `</head>`
//! - `<script defer>` tags inserted before `</body>`
//!
//! Tags are appended at the end of the document when the closing tag is
//! missing. Without a template, a minimal document is built with
//! [maud](https://maud.lambda.xyz/), which escapes the title automatically.

use crate::assets::AssetOutput;
use crate::manifest::{self, BuildManifest, ChunkFiles, ManifestError, Project};
use crate::types::HtmlDirective;
use maud::{DOCTYPE, Markup, html};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Placeholder replaced with the page title in templates.
pub const TITLE_PLACEHOLDER: &str = "{{ title }}";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read template {path}: {source}")]
    Template {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Refusing to write to {output}: it contains {input}")]
    UnsafeOutput { output: PathBuf, input: PathBuf },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// One written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub id: String,
    pub title: String,
    /// Path relative to the output root.
    pub filename: String,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

#[derive(Debug)]
pub struct GenerateResult {
    pub output_dir: PathBuf,
    pub cleaned: bool,
    pub documents: Vec<GeneratedDocument>,
    /// Image and font files copied into the output root.
    pub emitted_assets: Vec<String>,
    pub manifest_path: PathBuf,
}

/// Write every document, emitted asset and the manifest.
///
/// Asset paths in the manifest are relative to the project's source root.
/// Nothing is written or removed when the output root is, or contains, the
/// project root or one of its inputs.
pub fn generate(
    manifest: &BuildManifest,
    project: &Project<'_>,
) -> Result<GenerateResult, GenerateError> {
    let output_dir = manifest.output.path.as_path();
    let source_root = project.config.source_root(project.root);
    check_output_root(output_dir, project)?;

    let cleaned = manifest.output.clean && clean_output(output_dir)?;
    fs::create_dir_all(output_dir)?;

    let templates = load_templates(&manifest.html)?;
    let empty = ChunkFiles::default();

    let documents = manifest
        .html
        .par_iter()
        .map(|directive| -> Result<GeneratedDocument, GenerateError> {
            let files = directive_files(directive, &manifest.chunk_files, &empty);
            let template = directive
                .template
                .as_ref()
                .and_then(|p| templates.get(p))
                .map(String::as_str);
            let public_path = &manifest.output.public_path;
            let document = render_document(directive, &files, public_path, template);

            let path = output_dir.join(&directive.filename);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, document)?;
            tracing::debug!(path = %path.display(), "wrote document");

            Ok(GeneratedDocument {
                id: directive.id().to_string(),
                title: directive.title().to_string(),
                filename: directive.filename.clone(),
                scripts: files.scripts,
                styles: files.styles,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut emitted_assets = Vec::new();
    for record in &manifest.assets {
        if let AssetOutput::Emit { file_name } = &record.output {
            let dst = output_dir.join(file_name);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source_root.join(&record.source), &dst)?;
            emitted_assets.push(file_name.clone());
        }
    }

    let manifest_path = manifest::write_manifest(manifest, output_dir)?;

    Ok(GenerateResult {
        output_dir: output_dir.to_path_buf(),
        cleaned,
        documents,
        emitted_assets,
        manifest_path,
    })
}

/// Refuse an output root that would cover the project or any of its inputs.
///
/// Paths are made absolute and `..` is folded before comparing, so
/// `src/..` is caught as the project root.
fn check_output_root(output_dir: &Path, project: &Project<'_>) -> Result<(), GenerateError> {
    let config = project.config;
    let output = normalize(output_dir)?;
    let inputs = [
        project.root.to_path_buf(),
        config.source_root(project.root),
        project.root.join(&config.pages_dir),
        project.root.join(&config.template),
    ];
    for input in inputs {
        if normalize(&input)?.starts_with(&output) {
            return Err(GenerateError::UnsafeOutput {
                output: output_dir.to_path_buf(),
                input,
            });
        }
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` folded lexically.
fn normalize(path: &Path) -> std::io::Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Remove the output directory if it exists. Returns whether anything was removed.
pub fn clean_output(dir: &Path) -> std::io::Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(dir)?;
    Ok(true)
}

fn load_templates(
    directives: &[HtmlDirective],
) -> Result<BTreeMap<PathBuf, String>, GenerateError> {
    let mut templates = BTreeMap::new();
    for path in directives.iter().filter_map(|d| d.template.as_ref()) {
        if templates.contains_key(path) {
            continue;
        }
        let text = fs::read_to_string(path).map_err(|source| GenerateError::Template {
            path: path.clone(),
            source,
        })?;
        templates.insert(path.clone(), text);
    }
    Ok(templates)
}

/// Files loaded by a document: those of its own chunks, in chunk order.
fn directive_files(
    directive: &HtmlDirective,
    chunk_files: &indexmap::IndexMap<String, ChunkFiles>,
    empty: &ChunkFiles,
) -> ChunkFiles {
    let mut files = ChunkFiles::default();
    for chunk in &directive.chunks {
        let own = chunk_files.get(chunk).unwrap_or(empty);
        files.scripts.extend(own.scripts.iter().cloned());
        files.styles.extend(own.styles.iter().cloned());
    }
    files
}

/// URL of an emitted file under `public_path`.
pub fn public_url(public_path: &str, file: &str) -> String {
    if public_path.is_empty() {
        return file.to_string();
    }
    format!("{}/{}", public_path.trim_end_matches('/'), file)
}

/// Render the document for one directive.
pub fn render_document(
    directive: &HtmlDirective,
    files: &ChunkFiles,
    public_path: &str,
    template: Option<&str>,
) -> String {
    let scripts: Vec<String> = files
        .scripts
        .iter()
        .map(|f| public_url(public_path, f))
        .collect();
    let styles: Vec<String> = files
        .styles
        .iter()
        .map(|f| public_url(public_path, f))
        .collect();

    match template {
        Some(text) => render_template(text, directive.title(), &styles, &scripts),
        None => default_document(directive.title(), &styles, &scripts).into_string(),
    }
}

fn render_template(text: &str, title: &str, styles: &[String], scripts: &[String]) -> String {
    let escaped_title = html! { (title) }.into_string();
    let document = text.replace(TITLE_PLACEHOLDER, &escaped_title);
    let document = insert_before(&document, "</head>", &style_tags(styles).into_string());
    insert_before(&document, "</body>", &script_tags(scripts).into_string())
}

/// Insert `tags` before the last `marker`, or append when there is none.
fn insert_before(document: &str, marker: &str, tags: &str) -> String {
    if tags.is_empty() {
        return document.to_string();
    }
    match document.rfind(marker) {
        Some(pos) => format!("{}{}{}", &document[..pos], tags, &document[pos..]),
        None => format!("{document}{tags}"),
    }
}

fn style_tags(styles: &[String]) -> Markup {
    html! {
        @for href in styles {
            link rel="stylesheet" href=(href);
        }
    }
}

fn script_tags(scripts: &[String]) -> Markup {
    html! {
        @for src in scripts {
            script src=(src) defer {}
        }
    }
}

fn default_document(title: &str, styles: &[String], scripts: &[String]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                (style_tags(styles))
            }
            body {
                div id="root" {}
                (script_tags(scripts))
            }
        }
    }
}
