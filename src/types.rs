//! Shared types passed between planning, manifest assembly, and generation.
//!
//! Everything here serializes into the build manifest, so field names are part
//! of the contract with the external bundler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Page mapping as read from `config/index.toml`: page id → settings.
///
/// Backed by an `IndexMap` so iteration follows the order pages appear in the
/// file. Keys are unique by construction; a duplicate table in the TOML source
/// is a parse error, never a planning concern.
pub type PageMap = IndexMap<String, PageSettings>;

/// Raw settings of one page table.
///
/// `title` is optional at parse time so that a missing title surfaces as
/// [`PlanError::MissingTitle`](crate::plan::PlanError::MissingTitle) naming the
/// page, instead of a generic deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PageSettings {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

/// One buildable page once its settings have been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Output directory name and chunk name.
    pub id: String,
    /// Document title.
    pub title: String,
}

/// Chunk name → source module path handed to the bundler.
pub type EntryMap = IndexMap<String, PathBuf>;

/// Instruction to emit one HTML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlDirective {
    #[serde(flatten)]
    pub page: PageConfig,
    /// Output path relative to the output root: `{id}/index.html`.
    pub filename: String,
    /// Shared template, when one is configured and present on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Chunks this document loads. Always exactly the page's own chunk.
    pub chunks: Vec<String>,
}

impl HtmlDirective {
    pub fn id(&self) -> &str {
        &self.page.id
    }

    pub fn title(&self) -> &str {
        &self.page.title
    }
}

/// Result of planning: what to compile and which documents to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub entries: EntryMap,
    pub html: Vec<HtmlDirective>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Id of the first planned page, in configuration order.
    pub fn first_page(&self) -> Option<&str> {
        self.html.first().map(HtmlDirective::id)
    }
}
