//! Asset classification and per-kind handling.
//!
//! Every file the build touches falls into one of four kinds, decided by its
//! extension alone:
//!
//! | Kind | Extensions | Handling |
//! |------|------------|----------|
//! | [`AssetKind::Script`] | `ts tsx js jsx` | compiled by the bundler (`ts-loader` / `babel-loader`) |
//! | [`AssetKind::Style`] | `css less` | compiled and extracted to a per-chunk stylesheet |
//! | [`AssetKind::Image`] | `png jpg jpeg gif svg` | inlined below the size limit, emitted otherwise |
//! | [`AssetKind::Font`] | `woff woff2 eot ttf otf` | inlined below the size limit, emitted otherwise |
//!
//! Files with any other extension are not assets and are ignored.
//!
//! Scripts and styles are only described here (as [`ModuleRule`]s for the
//! bundler); images and fonts are resolved to their final form by
//! [`emit_asset`].

use crate::config::AssetsConfig;
use crate::naming::{self, FilenameParts};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Style,
    Image,
    Font,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Script,
        AssetKind::Style,
        AssetKind::Image,
        AssetKind::Font,
    ];

    /// Classify a path or import specifier by extension.
    ///
    /// Case-insensitive; a trailing `?query` or `#fragment` is ignored so that
    /// `icons.woff2?v=3` is still a font.
    pub fn classify(path: impl AsRef<Path>) -> Option<AssetKind> {
        let name = path.as_ref().file_name()?.to_str()?;
        let (_, ext) = naming::split_file_name(name);
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<AssetKind> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "js" | "jsx" => Some(AssetKind::Script),
            "css" | "less" => Some(AssetKind::Style),
            "png" | "jpg" | "jpeg" | "gif" | "svg" => Some(AssetKind::Image),
            "woff" | "woff2" | "eot" | "ttf" | "otf" => Some(AssetKind::Font),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Script => "script",
            AssetKind::Style => "style",
            AssetKind::Image => "image",
            AssetKind::Font => "font",
        }
    }

    /// Bundler rules for this kind.
    pub fn rules(self, config: &AssetsConfig) -> Vec<ModuleRule> {
        match self {
            AssetKind::Script => vec![
                ModuleRule {
                    kind: self,
                    test: extensions(&["ts", "tsx"]),
                    loaders: vec![LoaderUse::plain("ts-loader")],
                    exclude: config.exclude.clone(),
                },
                ModuleRule {
                    kind: self,
                    test: extensions(&["js", "jsx"]),
                    loaders: vec![LoaderUse::plain("babel-loader")],
                    exclude: config.exclude.clone(),
                },
            ],
            AssetKind::Style => vec![ModuleRule {
                kind: self,
                test: extensions(&["css", "less"]),
                // Applied last to first.
                loaders: vec![
                    LoaderUse::plain("mini-css-extract"),
                    LoaderUse::plain("css-loader"),
                    LoaderUse::plain("less-loader"),
                    LoaderUse {
                        loader: "postcss-loader".to_string(),
                        options: Some(json!({
                            "plugins": [
                                "postcss-flexbugs-fixes",
                                {
                                    "autoprefixer": {
                                        "browsers": [
                                            ">1%",
                                            "last 4 versions",
                                            "Firefox ESR",
                                            "not ie < 9"
                                        ],
                                        "flexbox": "no-2009"
                                    }
                                }
                            ]
                        })),
                    },
                ],
                exclude: Vec::new(),
            }],
            AssetKind::Image => vec![url_rule(
                self,
                &["png", "jpg", "jpeg", "gif", "svg"],
                config.inline_limit,
                &config.image_name,
            )],
            AssetKind::Font => vec![url_rule(
                self,
                &["woff", "woff2", "eot", "ttf", "otf"],
                config.inline_limit,
                &config.font_name,
            )],
        }
    }

    /// Name pattern for emitted files of this kind, if it emits files itself.
    fn emit_pattern(self, config: &AssetsConfig) -> Option<&str> {
        match self {
            AssetKind::Image => Some(&config.image_name),
            AssetKind::Font => Some(&config.font_name),
            AssetKind::Script | AssetKind::Style => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn extensions(exts: &[&str]) -> Vec<String> {
    exts.iter().map(|e| format!(".{e}")).collect()
}

fn url_rule(kind: AssetKind, exts: &[&str], limit: u64, name: &str) -> ModuleRule {
    ModuleRule {
        kind,
        test: extensions(exts),
        loaders: vec![LoaderUse {
            loader: "url-loader".to_string(),
            options: Some(json!({ "limit": limit, "name": name })),
        }],
        exclude: Vec::new(),
    }
}

/// All bundler rules, in [`AssetKind::ALL`] order.
pub fn module_rules(config: &AssetsConfig) -> Vec<ModuleRule> {
    AssetKind::ALL
        .into_iter()
        .flat_map(|kind| kind.rules(config))
        .collect()
}

/// Which files a loader chain applies to and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRule {
    pub kind: AssetKind,
    /// Extensions matched, with leading dot.
    pub test: Vec<String>,
    pub loaders: Vec<LoaderUse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderUse {
    pub loader: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl LoaderUse {
    fn plain(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            options: None,
        }
    }
}

/// Final form of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output", rename_all = "lowercase")]
pub enum AssetOutput {
    /// Compiled into a chunk by the bundler.
    Bundled,
    /// Embedded where referenced.
    Inline { data_uri: String },
    /// Written to the output root under this relative name.
    Emit { file_name: String },
}

/// Decide how `bytes` (the contents of `file_name`) end up in the output.
pub fn emit_asset(
    kind: AssetKind,
    file_name: &str,
    bytes: &[u8],
    config: &AssetsConfig,
) -> AssetOutput {
    let Some(pattern) = kind.emit_pattern(config) else {
        return AssetOutput::Bundled;
    };
    let (name, ext) = naming::split_file_name(file_name);

    if (bytes.len() as u64) < config.inline_limit {
        let encoded = base64_simd::STANDARD.encode_to_string(bytes);
        return AssetOutput::Inline {
            data_uri: format!("data:{};base64,{encoded}", mime_type(ext)),
        };
    }

    let hash = naming::content_hash(bytes);
    AssetOutput::Emit {
        file_name: naming::render_filename(pattern, &FilenameParts { name, ext, hash: &hash }),
    }
}

fn mime_type(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

/// A classified file under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Path relative to the scanned directory.
    pub path: PathBuf,
    pub kind: AssetKind,
    pub size: u64,
}

/// An asset together with its resolved output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub source: PathBuf,
    pub kind: AssetKind,
    #[serde(flatten)]
    pub output: AssetOutput,
}

/// Walk `dir` and classify every file, skipping excluded path segments.
///
/// A missing directory yields no assets. Results are sorted by path.
pub fn scan_assets(dir: &Path, config: &AssetsConfig) -> Result<Vec<AssetEntry>, AssetError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let is_excluded = |name: &str| config.exclude.iter().any(|ex| ex == name);
    let mut found = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_str().is_some_and(is_excluded));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = AssetKind::classify(entry.path()) else {
            continue;
        };
        let path = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        found.push(AssetEntry {
            path,
            kind,
            size: entry.metadata()?.len(),
        });
    }
    Ok(found)
}

/// Resolve the output of every image and font in `entries`.
///
/// Files are read and hashed in parallel; the result keeps `entries` order.
pub fn resolve_assets(
    source_root: &Path,
    entries: &[AssetEntry],
    config: &AssetsConfig,
) -> Result<Vec<AssetRecord>, AssetError> {
    entries
        .par_iter()
        .filter(|e| matches!(e.kind, AssetKind::Image | AssetKind::Font))
        .map(|e| -> Result<AssetRecord, AssetError> {
            let bytes = fs::read(source_root.join(&e.path))?;
            let file_name = e
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            Ok(AssetRecord {
                source: e.path.clone(),
                kind: e.kind,
                output: emit_asset(e.kind, file_name, &bytes, config),
            })
        })
        .collect()
}

/// Number of entries of each kind, in [`AssetKind::ALL`] order.
pub fn count_by_kind(entries: &[AssetEntry]) -> [(AssetKind, usize); 4] {
    AssetKind::ALL.map(|kind| (kind, entries.iter().filter(|e| e.kind == kind).count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classify_scripts() {
        for name in ["a.ts", "a.tsx", "a.js", "a.jsx", "dir/B.TSX"] {
            assert_eq!(
                AssetKind::classify(name),
                Some(AssetKind::Script),
                "{name}"
            );
        }
    }

    #[test]
    fn classify_styles_images_fonts() {
        assert_eq!(AssetKind::classify("main.less"), Some(AssetKind::Style));
        assert_eq!(AssetKind::classify("main.css"), Some(AssetKind::Style));
        assert_eq!(AssetKind::classify("logo.svg"), Some(AssetKind::Image));
        assert_eq!(AssetKind::classify("photo.JPEG"), Some(AssetKind::Image));
        assert_eq!(AssetKind::classify("icons.woff2"), Some(AssetKind::Font));
        assert_eq!(AssetKind::classify("icons.eot"), Some(AssetKind::Font));
    }

    #[test]
    fn classify_ignores_query_suffix() {
        assert_eq!(
            AssetKind::classify("icons.woff2?v=4.7.0"),
            Some(AssetKind::Font)
        );
        assert_eq!(
            AssetKind::classify("icons.svg#iefix"),
            Some(AssetKind::Image)
        );
    }

    #[test]
    fn classify_unknown() {
        assert_eq!(AssetKind::classify("README.md"), None);
        assert_eq!(AssetKind::classify("Makefile"), None);
        assert_eq!(AssetKind::classify("data.json"), None);
    }

    #[test]
    fn script_rules_split_ts_and_babel() {
        let rules = AssetKind::Script.rules(&AssetsConfig::default());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].loaders[0].loader, "ts-loader");
        assert_eq!(rules[0].test, vec![".ts", ".tsx"]);
        assert_eq!(rules[1].loaders[0].loader, "babel-loader");
        assert_eq!(rules[1].exclude, vec!["node_modules"]);
    }

    #[test]
    fn style_rule_loader_chain() {
        let rules = AssetKind::Style.rules(&AssetsConfig::default());
        let chain: Vec<&str> = rules[0]
            .loaders
            .iter()
            .map(|l| l.loader.as_str())
            .collect();
        assert_eq!(
            chain,
            vec!["mini-css-extract", "css-loader", "less-loader", "postcss-loader"]
        );
    }

    #[test]
    fn url_rules_carry_limit_and_name() {
        let config = AssetsConfig::default();
        let rule = &AssetKind::Font.rules(&config)[0];
        let options = rule.loaders[0].options.as_ref().unwrap();
        assert_eq!(options["limit"], 10_000);
        assert_eq!(options["name"], "fonts/[name].[hash:8].[ext]");
    }

    #[test]
    fn module_rules_cover_every_kind() {
        let rules = module_rules(&AssetsConfig::default());
        for kind in AssetKind::ALL {
            assert!(rules.iter().any(|r| r.kind == kind), "no rule for {kind}");
        }
        assert_eq!(rules.len(), 5);
    }

    #[test]
    fn small_image_is_inlined() {
        let out = emit_asset(AssetKind::Image, "dot.png", b"abc", &AssetsConfig::default());
        assert_eq!(
            out,
            AssetOutput::Inline {
                data_uri: "data:image/png;base64,YWJj".to_string()
            }
        );
    }

    #[test]
    fn image_at_limit_is_emitted() {
        let config = AssetsConfig {
            inline_limit: 4,
            ..AssetsConfig::default()
        };
        let out = emit_asset(AssetKind::Image, "logo.png", b"abcd", &config);
        let hash = naming::content_hash(b"abcd");
        assert_eq!(
            out,
            AssetOutput::Emit {
                file_name: format!("images/logo.{}.png", &hash[..8])
            }
        );
    }

    #[test]
    fn font_is_emitted_under_fonts() {
        let config = AssetsConfig {
            inline_limit: 0,
            ..AssetsConfig::default()
        };
        match emit_asset(AssetKind::Font, "icons.woff2?v=3", b"font", &config) {
            AssetOutput::Emit { file_name } => {
                assert!(file_name.starts_with("fonts/icons."));
                assert!(file_name.ends_with(".woff2"));
            }
            other => panic!("expected Emit, got {other:?}"),
        }
    }

    #[test]
    fn scripts_and_styles_are_bundled() {
        let config = AssetsConfig::default();
        for (kind, name) in [(AssetKind::Script, "a.ts"), (AssetKind::Style, "a.css")] {
            assert_eq!(emit_asset(kind, name, b"", &config), AssetOutput::Bundled);
        }
    }

    #[test]
    fn scan_classifies_and_skips_excluded() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("home/img")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::write(root.join("home/index.tsx"), "export {}").unwrap();
        fs::write(root.join("home/style.less"), "a {}").unwrap();
        fs::write(root.join("home/img/logo.png"), [0u8; 16]).unwrap();
        fs::write(root.join("home/notes.md"), "# notes").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "").unwrap();

        let entries = scan_assets(root, &AssetsConfig::default()).unwrap();
        let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("home/img/logo.png"),
                PathBuf::from("home/index.tsx"),
                PathBuf::from("home/style.less"),
            ]
        );
        assert_eq!(entries[0].size, 16);

        let counts = count_by_kind(&entries);
        assert_eq!(
            counts,
            [
                (AssetKind::Script, 1),
                (AssetKind::Style, 1),
                (AssetKind::Image, 1),
                (AssetKind::Font, 0),
            ]
        );
    }

    #[test]
    fn scan_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let entries = scan_assets(&tmp.path().join("nope"), &AssetsConfig::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn resolve_assets_only_images_and_fonts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("index.ts"), "").unwrap();
        fs::write(root.join("a.png"), b"tiny").unwrap();
        fs::write(root.join("b.ttf"), b"font bytes").unwrap();

        let entries = scan_assets(root, &AssetsConfig::default()).unwrap();
        let records = resolve_assets(root, &entries, &AssetsConfig::default()).unwrap();
        let sources: Vec<&Path> = records.iter().map(|r| r.source.as_path()).collect();
        assert_eq!(sources, vec![Path::new("a.png"), Path::new("b.ttf")]);
        assert!(matches!(records[0].output, AssetOutput::Inline { .. }));
    }
}
