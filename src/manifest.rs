//! Build manifest: everything the external bundler needs, in one document.
//!
//! The manifest combines the [`Plan`] with the settings around it:
//!
//! - output location and file name patterns
//! - module rules, one set per [`AssetKind`](crate::assets::AssetKind)
//! - define replacements (`process.env.NODE_ENV`)
//! - resolve extensions and aliases
//! - devtool and dev-server settings for the selected [`Mode`]
//! - resolved images and fonts
//! - the build hash and the files each chunk emits
//!
//! It is written as `manifest.json` in the output root.
//!
//! ## Build Hash
//!
//! `[hash]` in entry file names is a build hash: the SHA-256 of the manifest
//! serialized without its hash and chunk file names, with project paths made
//! relative to the project root. Identical inputs give an identical hash
//! wherever the project is checked out, and any change to pages, settings or
//! assets changes it.

use crate::assets::{self, AssetEntry, AssetError, AssetKind, AssetRecord, ModuleRule};
use crate::config::{self, BuildConfig, ConfigError, Mode};
use crate::naming::{self, FilenameParts};
use crate::plan::{self, PlanError};
use crate::types::{EntryMap, HtmlDirective, Plan};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// File name of the manifest within the output root.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A project on disk and the mode it is built in.
#[derive(Debug, Clone, Copy)]
pub struct Project<'a> {
    pub root: &'a Path,
    pub config: &'a BuildConfig,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub mode: Mode,
    pub entries: EntryMap,
    pub html: Vec<HtmlDirective>,
    pub output: OutputSettings,
    pub rules: Vec<ModuleRule>,
    pub define: IndexMap<String, String>,
    pub resolve: ResolveSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerSettings>,
    pub assets: Vec<AssetRecord>,
    pub build_hash: String,
    /// Chunk name → files it emits, relative to the output root.
    pub chunk_files: IndexMap<String, ChunkFiles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Absolute output root.
    pub path: PathBuf,
    pub public_path: String,
    pub filename: String,
    pub css_filename: String,
    pub css_chunk_filename: String,
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveSettings {
    pub extensions: Vec<String>,
    /// Alias → absolute directory.
    pub alias: IndexMap<String, PathBuf>,
}

/// Settings handed to the external dev server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevServerSettings {
    pub content_base: String,
    pub port: u16,
    pub open: bool,
    pub hot: bool,
    /// Path opened in the browser: `{output dir}/{first page id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFiles {
    pub scripts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
}

/// Load pages, plan, and scan the sources of `project`.
///
/// `node_env` is the value of `NODE_ENV` in the caller's environment, if set.
pub fn prepare(
    project: &Project<'_>,
    node_env: Option<&str>,
) -> Result<BuildManifest, ManifestError> {
    prepare_with_sources(project, node_env).map(|(manifest, _)| manifest)
}

/// Like [`prepare`], also returning the classified files of the source root.
pub fn prepare_with_sources(
    project: &Project<'_>,
    node_env: Option<&str>,
) -> Result<(BuildManifest, Vec<AssetEntry>), ManifestError> {
    let config = project.config;
    let pages = config::load_pages(project.root, config, project.mode)?;
    let source_root = config.source_root(project.root);
    let template = config.template_path(project.root);
    let plan = plan::plan(&pages, &source_root, template.as_deref())?;

    let scanned = assets::scan_assets(&source_root, &config.assets)?;
    let resolved = assets::resolve_assets(&source_root, &scanned, &config.assets)?;
    let manifest = assemble(project, plan, &scanned, resolved, node_env)?;
    Ok((manifest, scanned))
}

/// Combine a plan, scanned sources and resolved assets into a manifest.
pub fn assemble(
    project: &Project<'_>,
    plan: Plan,
    scanned: &[AssetEntry],
    resolved: Vec<AssetRecord>,
    node_env: Option<&str>,
) -> Result<BuildManifest, ManifestError> {
    let config = project.config;
    let mode = project.mode;

    let mut manifest = BuildManifest {
        mode,
        dev_server: dev_server_settings(config, mode, &plan),
        output: OutputSettings {
            path: config.output_root(project.root),
            public_path: config.output.public_path.clone(),
            filename: config.output.filename.clone(),
            css_filename: config.output.css_filename.clone(),
            css_chunk_filename: config.output.css_chunk_filename.clone(),
            clean: config.output.clean,
        },
        rules: assets::module_rules(&config.assets),
        define: define_env(mode, node_env),
        resolve: ResolveSettings {
            extensions: config.resolve.extensions.clone(),
            alias: config
                .resolve
                .alias
                .iter()
                .map(|(k, v)| (k.clone(), project.root.join(v)))
                .collect(),
        },
        devtool: mode.is_dev().then(|| "source-map".to_string()),
        entries: plan.entries,
        html: plan.html,
        assets: resolved,
        build_hash: String::new(),
        chunk_files: IndexMap::new(),
    };

    manifest.build_hash = build_hash(&manifest, project.root)?;
    manifest.chunk_files = chunk_files(&manifest, config, scanned);
    tracing::debug!(hash = %manifest.build_hash, "assembled build manifest");
    Ok(manifest)
}

/// Hash of `manifest` with every project path made relative to `root`.
fn build_hash(manifest: &BuildManifest, root: &Path) -> Result<String, serde_json::Error> {
    let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let mut portable = manifest.clone();
    portable.output.path = relative(&portable.output.path);
    for path in portable.entries.values_mut() {
        *path = relative(path);
    }
    for path in portable.resolve.alias.values_mut() {
        *path = relative(path);
    }
    for template in portable.html.iter_mut().filter_map(|d| d.template.as_mut()) {
        *template = relative(template);
    }
    Ok(naming::content_hash(&serde_json::to_vec(&portable)?))
}

/// `process.env.NODE_ENV` replacement, as a JSON string literal.
///
/// Falls back to the mode name when `NODE_ENV` is not set.
pub fn define_env(mode: Mode, node_env: Option<&str>) -> IndexMap<String, String> {
    let value = node_env.unwrap_or(mode.as_str());
    let mut define = IndexMap::new();
    define.insert(
        "process.env.NODE_ENV".to_string(),
        serde_json::Value::from(value).to_string(),
    );
    define
}

/// Dev-server settings, present only in development mode.
pub fn dev_server_settings(
    config: &BuildConfig,
    mode: Mode,
    plan: &Plan,
) -> Option<DevServerSettings> {
    if !mode.is_dev() {
        return None;
    }
    let server = &config.dev_server;
    Some(DevServerSettings {
        content_base: server.content_base.clone(),
        port: server.port,
        open: server.open,
        hot: server.hot,
        open_page: plan
            .first_page()
            .map(|id| format!("{}/{id}", config.output.dir.trim_end_matches('/'))),
    })
}

fn chunk_files(
    manifest: &BuildManifest,
    config: &BuildConfig,
    scanned: &[AssetEntry],
) -> IndexMap<String, ChunkFiles> {
    let hash = manifest.build_hash.as_str();
    manifest
        .entries
        .keys()
        .map(|id| {
            let parts = FilenameParts {
                name: id,
                ext: "",
                hash,
            };
            let mut files = ChunkFiles {
                scripts: vec![naming::render_filename(&config.output.filename, &parts)],
                styles: Vec::new(),
            };
            if has_styles(id, scanned) {
                let parts = FilenameParts { ext: "css", ..parts };
                files
                    .styles
                    .push(naming::render_filename(&config.output.css_filename, &parts));
            }
            (id.clone(), files)
        })
        .collect()
}

/// Whether the page's source directory contains a stylesheet.
fn has_styles(id: &str, scanned: &[AssetEntry]) -> bool {
    scanned.iter().any(|e| {
        e.kind == AssetKind::Style
            && matches!(e.path.components().next(), Some(Component::Normal(first)) if first == id)
    })
}

/// Find the file an entry resolves to.
///
/// Tries `{entry}{ext}` for every extension in order, then `{entry}/index{ext}`.
pub fn resolve_entry(entry: &Path, extensions: &[String]) -> Option<PathBuf> {
    let with_ext = extensions.iter().map(|ext| {
        let mut candidate = OsString::from(entry.as_os_str());
        candidate.push(ext);
        PathBuf::from(candidate)
    });
    let index = extensions.iter().map(|ext| entry.join(format!("index{ext}")));
    with_ext.chain(index).find(|candidate| candidate.is_file())
}

/// Ids whose entry does not resolve to a file.
pub fn unresolved_entries(manifest: &BuildManifest) -> Vec<&str> {
    let extensions = &manifest.resolve.extensions;
    manifest
        .entries
        .iter()
        .filter(|(_, path)| resolve_entry(path, extensions).is_none())
        .map(|(id, _)| id.as_str())
        .collect()
}

/// Write the manifest as pretty JSON into `dir`, returning the file path.
pub fn write_manifest(manifest: &BuildManifest, dir: &Path) -> Result<PathBuf, ManifestError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(MANIFEST_FILE_NAME);
    fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::{PageMap, PageSettings};
    use tempfile::TempDir;

    fn two_pages() -> PageMap {
        let mut pages = PageMap::new();
        pages.insert("home".to_string(), PageSettings::titled("Home"));
        pages.insert("about".to_string(), PageSettings::titled("About"));
        pages
    }

    fn manifest_for(
        root: &Path,
        config: &BuildConfig,
        mode: Mode,
        pages: &PageMap,
    ) -> BuildManifest {
        let project = Project { root, config, mode };
        let plan = plan::plan(pages, &config.source_root(root), None).unwrap();
        assemble(&project, plan, &[], Vec::new(), None).unwrap()
    }

    #[test]
    fn define_uses_mode_when_unset() {
        let define = define_env(Mode::Production, None);
        assert_eq!(define["process.env.NODE_ENV"], r#""production""#);
        let define = define_env(Mode::Development, None);
        assert_eq!(define["process.env.NODE_ENV"], r#""development""#);
    }

    #[test]
    fn define_prefers_environment_value() {
        let define = define_env(Mode::Production, Some("staging"));
        assert_eq!(define["process.env.NODE_ENV"], r#""staging""#);
    }

    #[test]
    fn define_escapes_value() {
        let define = define_env(Mode::Production, Some(r#"a"b"#));
        assert_eq!(define["process.env.NODE_ENV"], r#""a\"b""#);
    }

    #[test]
    fn production_has_no_dev_server_or_devtool() {
        let config = BuildConfig::default();
        let manifest = manifest_for(Path::new("/p"), &config, Mode::Production, &two_pages());
        assert_eq!(manifest.dev_server, None);
        assert_eq!(manifest.devtool, None);
    }

    #[test]
    fn development_opens_first_page() {
        let config = BuildConfig::default();
        let manifest = manifest_for(Path::new("/p"), &config, Mode::Development, &two_pages());
        let server = manifest.dev_server.unwrap();
        assert_eq!(server.open_page.as_deref(), Some("dist/home"));
        assert_eq!(server.port, 9000);
        assert!(server.open);
        assert!(!server.hot);
        assert_eq!(server.content_base, "./dist");
        assert_eq!(manifest.devtool.as_deref(), Some("source-map"));
    }

    #[test]
    fn development_without_pages_has_no_open_page() {
        let config = BuildConfig::default();
        let manifest = manifest_for(Path::new("/p"), &config, Mode::Development, &PageMap::new());
        assert_eq!(manifest.dev_server.unwrap().open_page, None);
    }

    #[test]
    fn aliases_are_absolute() {
        let config = BuildConfig::default();
        let manifest = manifest_for(Path::new("/p"), &config, Mode::Production, &two_pages());
        assert_eq!(manifest.resolve.alias["@"], PathBuf::from("/p/src/"));
        assert_eq!(manifest.resolve.alias["%"], PathBuf::from("/p/src/public/"));
    }

    #[test]
    fn build_hash_is_stable_and_input_sensitive() {
        let config = BuildConfig::default();
        let a = manifest_for(Path::new("/p"), &config, Mode::Production, &two_pages());
        let b = manifest_for(Path::new("/p"), &config, Mode::Production, &two_pages());
        assert_eq!(a.build_hash, b.build_hash);
        assert_eq!(a.build_hash.len(), 64);

        let mut pages = two_pages();
        pages.insert("contact".to_string(), PageSettings::titled("Contact"));
        let c = manifest_for(Path::new("/p"), &config, Mode::Production, &pages);
        assert_ne!(a.build_hash, c.build_hash);
    }

    #[test]
    fn build_hash_ignores_project_location() {
        let mut config = BuildConfig::default();
        config.template = "tpl/index.html".to_string();
        let hash_at = |root: &str| {
            let root = Path::new(root);
            let project = Project {
                root,
                config: &config,
                mode: Mode::Production,
            };
            let template = root.join(&config.template);
            let source_root = config.source_root(root);
            let plan = plan::plan(&two_pages(), &source_root, Some(&template)).unwrap();
            assemble(&project, plan, &[], Vec::new(), None).unwrap()
        };

        let here = hash_at("/home/alice/site");
        let there = hash_at("/srv/checkouts/site");
        assert_ne!(here.output.path, there.output.path);
        assert_eq!(here.build_hash, there.build_hash);
        assert_eq!(here.chunk_files, there.chunk_files);
    }

    #[test]
    fn chunk_files_use_output_pattern() {
        let config = BuildConfig::default();
        let manifest = manifest_for(Path::new("/p"), &config, Mode::Production, &two_pages());
        let short = &manifest.build_hash[..20];
        assert_eq!(
            manifest.chunk_files["home"].scripts,
            vec![format!("home.{short}.js")]
        );
        assert!(manifest.chunk_files["home"].styles.is_empty());
        let ids: Vec<&str> = manifest.chunk_files.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["home", "about"]);
    }

    #[test]
    fn styles_only_for_pages_with_stylesheets() {
        let config = BuildConfig::default();
        let root = Path::new("/p");
        let project = Project {
            root,
            config: &config,
            mode: Mode::Production,
        };
        let plan = plan::plan(&two_pages(), &config.source_root(root), None).unwrap();
        let scanned = vec![AssetEntry {
            path: PathBuf::from("about/about.less"),
            kind: AssetKind::Style,
            size: 10,
        }];
        let manifest = assemble(&project, plan, &scanned, Vec::new(), None).unwrap();
        assert!(manifest.chunk_files["home"].styles.is_empty());
        let short = &manifest.build_hash[..20];
        assert_eq!(
            manifest.chunk_files["about"].styles,
            vec![format!("about.{short}.css")]
        );
    }

    #[test]
    fn resolve_entry_tries_extensions_then_index() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("home")).unwrap();
        fs::write(src.join("home/index.ts"), "").unwrap();
        fs::write(src.join("solo.jsx"), "").unwrap();
        let exts = BuildConfig::default().resolve.extensions;

        assert_eq!(
            resolve_entry(&src.join("home"), &exts),
            Some(src.join("home/index.ts"))
        );
        assert_eq!(
            resolve_entry(&src.join("solo"), &exts),
            Some(src.join("solo.jsx"))
        );
        assert_eq!(resolve_entry(&src.join("missing"), &exts), None);
    }

    #[test]
    fn prepare_reads_fixture_project() {
        let tmp = setup_fixtures();
        let config = config::load_config(tmp.path()).unwrap();
        let project = Project {
            root: tmp.path(),
            config: &config,
            mode: Mode::Production,
        };
        let manifest = prepare(&project, None).unwrap();

        assert_eq!(directive_ids(&manifest), vec!["home", "about", "contact"]);
        assert_eq!(find_directive(&manifest, "about").title(), "About us");
        assert!(unresolved_entries(&manifest).is_empty());
        assert_eq!(manifest.chunk_files["home"].styles.len(), 1);
        assert!(manifest.html.iter().all(|d| d.template.is_some()));
    }

    #[test]
    fn prepare_with_sources_returns_the_scan() {
        let tmp = setup_fixtures();
        let config = config::load_config(tmp.path()).unwrap();
        let project = Project {
            root: tmp.path(),
            config: &config,
            mode: Mode::Production,
        };
        let (manifest, scanned) = prepare_with_sources(&project, None).unwrap();

        assert_eq!(manifest, prepare(&project, None).unwrap());
        let counts = assets::count_by_kind(&scanned);
        assert_eq!(
            counts,
            [
                (AssetKind::Script, 3),
                (AssetKind::Style, 1),
                (AssetKind::Image, 1),
                (AssetKind::Font, 0),
            ]
        );
    }

    #[test]
    fn prepare_dev_mode_uses_dev_pages() {
        let tmp = setup_fixtures();
        let config = config::load_config(tmp.path()).unwrap();
        let project = Project {
            root: tmp.path(),
            config: &config,
            mode: Mode::Development,
        };
        let manifest = prepare(&project, None).unwrap();

        assert_eq!(directive_ids(&manifest), vec!["home"]);
        let server = manifest.dev_server.unwrap();
        assert_eq!(server.open_page.as_deref(), Some("dist/home"));
    }

    #[test]
    fn prepare_reports_missing_title() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("config/index.toml"), "[page1]\n").unwrap();
        let config = config::load_config(tmp.path()).unwrap();
        let project = Project {
            root: tmp.path(),
            config: &config,
            mode: Mode::Production,
        };
        let err = prepare(&project, None).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Plan(PlanError::MissingTitle { ref id }) if id == "page1"
        ));
    }

    #[test]
    fn write_manifest_roundtrips() {
        let tmp = TempDir::new().unwrap();
        let config = BuildConfig::default();
        let manifest = manifest_for(tmp.path(), &config, Mode::Development, &two_pages());
        let path = write_manifest(&manifest, &tmp.path().join("dist")).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let back: BuildManifest = serde_json::from_str(&content).unwrap();
        assert_eq!(back, manifest);
    }
}
