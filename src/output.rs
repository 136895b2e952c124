//! CLI output formatting.
//!
//! Every entity is shown by identity first (positional index + page id or
//! title), with paths as indented context lines.
//!
//! ## Plan
//!
//! ```text
//! Mode: development
//!
//! Entries
//! 001 home → src/home
//! 002 about → src/about
//!
//! Documents
//! 001 Home → home/index.html
//!     Chunks: home
//!     Template: tpl/index.html
//! 002 About → about/index.html
//!     Chunks: about
//!
//! Dev server
//!     Port: 9000
//!     Open: dist/home
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Home → home/index.html
//!     Script: /dist/home.3f2a….js
//!     Style: /dist/home.3f2a….css
//! Assets
//!     images/hero.1a2b3c4d.png
//!
//! Generated 2 documents, 1 asset
//! ```
//!
//! Each `format_*` function is pure and returns lines; `print_*` writes them
//! to stdout.

use crate::assets::AssetKind;
use crate::generate::{GenerateResult, public_url};
use crate::manifest::BuildManifest;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Show `path` relative to `root` when it lives under it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// plan
// ============================================================================

pub fn format_plan_output(manifest: &BuildManifest, root: &Path) -> Vec<String> {
    let mut lines = vec![format!("Mode: {}", manifest.mode), String::new()];

    if manifest.entries.is_empty() {
        lines.push("No pages configured".to_string());
        return lines;
    }

    lines.push("Entries".to_string());
    for (i, (id, path)) in manifest.entries.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            id,
            display_path(path, root)
        ));
    }

    lines.push(String::new());
    lines.push("Documents".to_string());
    for (i, directive) in manifest.html.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            directive.title(),
            directive.filename
        ));
        lines.push(format!(
            "{}Chunks: {}",
            indent(1),
            directive.chunks.join(", ")
        ));
        if let Some(template) = &directive.template {
            lines.push(format!(
                "{}Template: {}",
                indent(1),
                display_path(template, root)
            ));
        }
    }

    if let Some(server) = &manifest.dev_server {
        lines.push(String::new());
        lines.push("Dev server".to_string());
        lines.push(format!("{}Port: {}", indent(1), server.port));
        if let Some(page) = &server.open_page {
            lines.push(format!("{}Open: {}", indent(1), page));
        }
    }

    lines
}

pub fn print_plan_output(manifest: &BuildManifest, root: &Path) {
    for line in format_plan_output(manifest, root) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

pub fn format_build_output(result: &GenerateResult, public_path: &str) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, doc) in result.documents.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            doc.title,
            doc.filename
        ));
        for script in &doc.scripts {
            lines.push(format!(
                "{}Script: {}",
                indent(1),
                public_url(public_path, script)
            ));
        }
        for style in &doc.styles {
            lines.push(format!(
                "{}Style: {}",
                indent(1),
                public_url(public_path, style)
            ));
        }
    }

    if !result.emitted_assets.is_empty() {
        lines.push("Assets".to_string());
        for asset in &result.emitted_assets {
            lines.push(format!("{}{}", indent(1), asset));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {}",
        plural(result.documents.len(), "document", "documents"),
        plural(result.emitted_assets.len(), "asset", "assets")
    ));
    lines
}

pub fn print_build_output(result: &GenerateResult, public_path: &str) {
    for line in format_build_output(result, public_path) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

pub fn format_check_output(
    manifest: &BuildManifest,
    unresolved: &[&str],
    counts: &[(AssetKind, usize)],
) -> Vec<String> {
    let mut lines = vec![format!("Pages: {}", manifest.html.len())];

    lines.push("Sources".to_string());
    for (kind, count) in counts {
        lines.push(format!("{}{}: {}", indent(1), kind, count));
    }

    if !unresolved.is_empty() {
        lines.push("Unresolved entries".to_string());
        for id in unresolved {
            lines.push(format!(
                "{}{} (tried {})",
                indent(1),
                id,
                manifest.resolve.extensions.join(", ")
            ));
        }
    }
    lines
}

pub fn print_check_output(
    manifest: &BuildManifest,
    unresolved: &[&str],
    counts: &[(AssetKind, usize)],
) {
    for line in format_check_output(manifest, unresolved, counts) {
        println!("{}", line);
    }
}
