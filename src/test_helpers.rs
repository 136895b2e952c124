//! Shared test utilities.
//!
//! `fixtures/project/` is a small three-page project:
//!
//! ```text
//! fixtures/project/
//! ├── config/index.toml       # home, about, contact
//! ├── config/index.dev.toml   # home
//! ├── src/home/               # index.tsx + home.less
//! ├── src/about/index.tsx
//! ├── src/contact/index.jsx
//! ├── src/public/logo.svg     # below the inline limit
//! └── tpl/index.html
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::manifest::BuildManifest;
use crate::types::HtmlDirective;

/// Copy `fixtures/project/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/project");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Page ids of all directives, in plan order.
pub fn directive_ids(manifest: &BuildManifest) -> Vec<&str> {
    manifest.html.iter().map(HtmlDirective::id).collect()
}

/// Find a directive by page id. Panics if not found.
pub fn find_directive<'a>(manifest: &'a BuildManifest, id: &str) -> &'a HtmlDirective {
    manifest
        .html
        .iter()
        .find(|d| d.id() == id)
        .unwrap_or_else(|| {
            let ids = directive_ids(manifest);
            panic!("page '{id}' not found. Available: {ids:?}")
        })
}
