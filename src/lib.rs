//! # multipage
//!
//! Build planning for multi-page front-end projects. A project lists its pages
//! as `id → title`; multipage turns that list into the entry points a bundler
//! compiles and the HTML documents that load them, one document per page.
//!
//! # Pipeline
//!
//! ```text
//! 1. Load     multipage.toml + config/index[.dev].toml  →  BuildConfig, PageMap
//! 2. Plan     PageMap                                    →  EntryMap + HtmlDirectives
//! 3. Scan     src/                                       →  classified assets
//! 4. Assemble plan + settings + assets                   →  BuildManifest
//! 5. Generate manifest                                   →  dist/{id}/index.html, manifest.json
//! ```
//!
//! Compiling the entries is the bundler's job. multipage hands it everything it
//! needs in `dist/manifest.json` and writes the documents that reference the
//! resulting chunks.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `multipage.toml` loading and merging, [`config::Mode`], page mappings |
//! | [`types`] | Pages, entries, HTML directives, plans |
//! | [`plan`] | The entry-point planner |
//! | [`assets`] | Extension-based [`assets::AssetKind`] classification and per-kind rules |
//! | [`naming`] | `[name].[hash].js`-style output file names |
//! | [`manifest`] | Assembles the bundler-facing build manifest |
//! | [`generate`] | Writes HTML documents, emitted assets and the manifest |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Mode Is a Value
//!
//! Production and development builds differ in which page mapping is read, the
//! devtool, and whether dev-server settings are produced. The mode is chosen
//! once, from the `--dev` flag, and passed down explicitly. Nothing reads it
//! from the environment later, so every stage can be tested in either mode.
//!
//! ## One Chunk per Document
//!
//! Each page gets exactly one entry and one document, and the document lists
//! only that page's chunk. Pages never pick up each other's code.
//!
//! ## Closed Asset Kinds
//!
//! Files are sorted into script, style, image or font by extension, and each
//! kind has one handler. Adding a kind means adding an enum variant, which the
//! compiler then forces every match to handle.

pub mod assets;
pub mod config;
pub mod generate;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod plan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
