//! Build configuration.
//!
//! Two kinds of files drive a build:
//!
//! ```text
//! project/
//! ├── multipage.toml        # Build settings (optional, overrides stock defaults)
//! └── config/
//!     ├── index.toml        # Pages built in production mode
//!     └── index.dev.toml    # Pages built in development mode
//! ```
//!
//! ## Build Settings
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "src"          # Entry modules live at {source_dir}/{page id}
//! pages_dir = "config"        # Directory holding the page mappings
//! template = "tpl/index.html" # Shared HTML template (ignored if missing)
//!
//! [output]
//! dir = "dist"
//! public_path = "/dist/"
//! filename = "[name].[hash].js"
//! css_filename = "[name].[hash].css"
//! css_chunk_filename = "[name].[hash].css"
//! clean = true
//!
//! [assets]
//! inline_limit = 10000        # Images and fonts below this size are inlined
//! image_name = "images/[name].[hash:8].[ext]"
//! font_name = "fonts/[name].[hash:8].[ext]"
//! exclude = ["node_modules"]
//!
//! [resolve]
//! extensions = [".tsx", ".ts", ".js", ".jsx"]
//!
//! [resolve.alias]
//! "@" = "src/"
//! "%" = "src/public/"
//!
//! [dev_server]
//! content_base = "./dist"
//! port = 9000
//! open = true
//! hot = false
//! ```
//!
//! Settings files are sparse and merged over the stock defaults with
//! [`merge_toml`]. Unknown keys are rejected to catch typos early.
//!
//! ## Page Mappings
//!
//! ```toml
//! [home]
//! title = "Home"
//!
//! [about]
//! title = "About"
//! ```
//!
//! Which file is read depends on the [`Mode`], chosen once at process entry.

use crate::types::PageMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the optional build settings file at the project root.
pub const CONFIG_FILE_NAME: &str = "multipage.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Page configuration not found: {0}")]
    MissingPages(PathBuf),
}

/// Build mode. Selects the page mapping, devtool and dev-server settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

impl Mode {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
        }
    }

    /// Page mapping file read in this mode, relative to `pages_dir`.
    pub fn pages_file_name(self) -> &'static str {
        match self {
            Mode::Production => "index.toml",
            Mode::Development => "index.dev.toml",
        }
    }

    pub fn is_dev(self) -> bool {
        self == Mode::Development
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build settings loaded from `multipage.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Root of the entry modules, relative to the project root.
    pub source_dir: String,
    /// Directory holding `index.toml` / `index.dev.toml`.
    pub pages_dir: String,
    /// Shared HTML template, relative to the project root.
    pub template: String,
    pub output: OutputConfig,
    pub assets: AssetsConfig,
    pub resolve: ResolveConfig,
    pub dev_server: DevServerConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: "src".to_string(),
            pages_dir: "config".to_string(),
            template: "tpl/index.html".to_string(),
            output: OutputConfig::default(),
            assets: AssetsConfig::default(),
            resolve: ResolveConfig::default(),
            dev_server: DevServerConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_output_dir(&self.output.dir)?;
        for (key, pattern) in [
            ("output.filename", &self.output.filename),
            ("output.css_filename", &self.output.css_filename),
            ("output.css_chunk_filename", &self.output.css_chunk_filename),
            ("assets.image_name", &self.assets.image_name),
            ("assets.font_name", &self.assets.font_name),
        ] {
            if !pattern.contains("[name]") {
                return Err(ConfigError::Validation(format!(
                    "{key} must contain [name]"
                )));
            }
        }
        if self.dev_server.port == 0 {
            return Err(ConfigError::Validation("dev_server.port must be non-zero".into()));
        }
        if let Some(ext) = self
            .resolve
            .extensions
            .iter()
            .find(|ext| !ext.starts_with('.'))
        {
            return Err(ConfigError::Validation(format!(
                "resolve.extensions entry {ext:?} must start with '.'"
            )));
        }
        Ok(())
    }

    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.source_dir)
    }

    pub fn output_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.output.dir)
    }

    /// The template path if one is configured and exists.
    pub fn template_path(&self, project_root: &Path) -> Option<PathBuf> {
        if self.template.is_empty() {
            return None;
        }
        let path = project_root.join(&self.template);
        path.is_file().then_some(path)
    }
}

/// `output.dir` must name a directory strictly below the project root.
fn check_output_dir(dir: &str) -> Result<(), ConfigError> {
    let path = Path::new(dir);
    if dir.trim().is_empty() {
        return Err(ConfigError::Validation("output.dir must not be empty".into()));
    }
    if path.is_absolute() || path.has_root() {
        return Err(ConfigError::Validation(format!(
            "output.dir {dir:?} must be relative to the project root"
        )));
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(ConfigError::Validation(format!(
            "output.dir {dir:?} must not contain '..'"
        )));
    }
    if !path.components().any(|c| matches!(c, Component::Normal(_))) {
        return Err(ConfigError::Validation(format!(
            "output.dir {dir:?} must name a directory below the project root"
        )));
    }
    Ok(())
}

/// Output naming and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output root, relative to the project root.
    pub dir: String,
    /// URL prefix under which emitted files are served.
    pub public_path: String,
    /// Entry chunk file name pattern.
    pub filename: String,
    /// Extracted stylesheet pattern for entry chunks.
    pub css_filename: String,
    /// Extracted stylesheet pattern for split chunks.
    pub css_chunk_filename: String,
    /// Remove the output root before building.
    pub clean: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "dist".to_string(),
            public_path: "/dist/".to_string(),
            filename: "[name].[hash].js".to_string(),
            css_filename: "[name].[hash].css".to_string(),
            css_chunk_filename: "[name].[hash].css".to_string(),
            clean: true,
        }
    }
}

/// Image, font and script handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Images and fonts smaller than this many bytes become data URIs.
    pub inline_limit: u64,
    /// Emitted image name pattern, relative to the output root.
    pub image_name: String,
    /// Emitted font name pattern, relative to the output root.
    pub font_name: String,
    /// Path segments whose contents are never compiled as scripts.
    pub exclude: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            inline_limit: 10_000,
            image_name: "images/[name].[hash:8].[ext]".to_string(),
            font_name: "fonts/[name].[hash:8].[ext]".to_string(),
            exclude: vec!["node_modules".to_string()],
        }
    }
}

/// Module resolution settings passed through to the bundler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Extensions tried in order when an import has none.
    pub extensions: Vec<String>,
    /// Import prefix → directory, relative to the project root.
    pub alias: IndexMap<String, String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        let mut alias = IndexMap::new();
        alias.insert("@".to_string(), "src/".to_string());
        alias.insert("%".to_string(), "src/public/".to_string());
        Self {
            extensions: [".tsx", ".ts", ".js", ".jsx"]
                .into_iter()
                .map(String::from)
                .collect(),
            alias,
        }
    }
}

/// Development server settings. Only used in [`Mode::Development`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevServerConfig {
    /// Directory the server exposes as static files.
    pub content_base: String,
    pub port: u16,
    /// Open a browser once the server is up.
    pub open: bool,
    /// Hot module replacement. Full reloads are used when disabled.
    pub hot: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            content_base: "./dist".to_string(),
            port: 9000,
            open: true,
            hot: false,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `multipage.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load build settings for a project: stock defaults, then `multipage.toml`.
pub fn load_config(root: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(root = %root.display(), "loaded build config");
    Ok(config)
}

/// Path of the page mapping used in `mode`.
pub fn pages_path(root: &Path, config: &BuildConfig, mode: Mode) -> PathBuf {
    root.join(&config.pages_dir).join(mode.pages_file_name())
}

/// Read the page mapping for `mode`, preserving file order.
pub fn load_pages(
    root: &Path,
    config: &BuildConfig,
    mode: Mode,
) -> Result<PageMap, ConfigError> {
    let path = pages_path(root, config, mode);
    if !path.is_file() {
        return Err(ConfigError::MissingPages(path));
    }
    let content = fs::read_to_string(&path)?;
    let pages: PageMap = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), count = pages.len(), %mode, "loaded pages");
    Ok(pages)
}

/// Returns a fully-commented stock `multipage.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# multipage configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Pages are not listed here. They live in {pages_dir}/index.toml
# (production) and {pages_dir}/index.dev.toml (development):
#
#   [home]
#   title = "Home"

# Entry modules are resolved at {source_dir}/{page id}.
source_dir = "src"

# Directory holding the page mappings.
pages_dir = "config"

# HTML template shared by every page. Use {{ title }} where the page title
# goes. Ignored when the file does not exist.
template = "tpl/index.html"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Relative to the project root, without "..". Removed before each build
# when clean = true, so it must not hold sources, page files or the template.
dir = "dist"

# URL prefix for every emitted file referenced from HTML.
public_path = "/dist/"

# Placeholders: [name], [hash], [hash:N], [ext]
filename = "[name].[hash].js"
css_filename = "[name].[hash].css"
css_chunk_filename = "[name].[hash].css"

# Remove the output directory before each build.
clean = true

# ---------------------------------------------------------------------------
# Assets
# ---------------------------------------------------------------------------
[assets]
# Images and fonts smaller than this (bytes) are inlined as data URIs.
inline_limit = 10000
image_name = "images/[name].[hash:8].[ext]"
font_name = "fonts/[name].[hash:8].[ext]"

# Path segments never compiled as scripts.
exclude = ["node_modules"]

# ---------------------------------------------------------------------------
# Module resolution
# ---------------------------------------------------------------------------
[resolve]
extensions = [".tsx", ".ts", ".js", ".jsx"]

[resolve.alias]
"@" = "src/"
"%" = "src/public/"

# ---------------------------------------------------------------------------
# Development server (only used with --dev)
# ---------------------------------------------------------------------------
[dev_server]
content_base = "./dist"
port = 9000
open = true
hot = false
"##
}
