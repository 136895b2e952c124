//! Output file naming.
//!
//! Emitted files are named from patterns with bracketed placeholders:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `[name]` | chunk name or asset file stem |
//! | `[ext]` | asset extension, without the dot |
//! | `[hash]` | first 20 hex chars of the hash |
//! | `[hash:N]` | first `N` hex chars of the hash |
//!
//! - `"[name].[hash].js"` with name `home` → `home.3f2a…(20 chars).js`
//! - `"images/[name].[hash:8].[ext]"` for `logo.png` → `images/logo.1a2b3c4d.png`
//!
//! Unknown placeholders are copied through unchanged.

use sha2::{Digest, Sha256};

/// Length of `[hash]` when no explicit length is given.
pub const DEFAULT_HASH_LENGTH: usize = 20;

/// Values substituted into a filename pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameParts<'a> {
    pub name: &'a str,
    pub ext: &'a str,
    pub hash: &'a str,
}

/// SHA-256 of `bytes` as a lowercase hex string.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Render `pattern`, replacing every known placeholder.
pub fn render_filename(pattern: &str, parts: &FilenameParts<'_>) -> String {
    let mut out = String::with_capacity(pattern.len() + parts.hash.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find(']') else {
            out.push_str(tail);
            return out;
        };
        let token = &tail[1..close];
        match expand(token, parts) {
            Some(value) => out.push_str(value),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

fn expand<'a>(token: &str, parts: &FilenameParts<'a>) -> Option<&'a str> {
    match token {
        "name" => Some(parts.name),
        "ext" => Some(parts.ext),
        "hash" => Some(truncate(parts.hash, DEFAULT_HASH_LENGTH)),
        _ => {
            let len = token.strip_prefix("hash:")?.parse::<usize>().ok()?;
            Some(truncate(parts.hash, len))
        }
    }
}

fn truncate(hash: &str, len: usize) -> &str {
    // Hashes are hex, so byte slicing is on char boundaries.
    &hash[..len.min(hash.len())]
}

/// Split a file name into stem and extension, the way `[name]`/`[ext]` see it.
///
/// - `"logo.png"` → `("logo", "png")`
/// - `"font.woff2?v=3"` → `("font", "woff2")`
/// - `"archive.tar.gz"` → `("archive.tar", "gz")`
/// - `"README"` → `("README", "")`
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let clean = strip_query(file_name);
    match clean.rfind('.') {
        Some(0) | None => (clean, ""),
        Some(dot) => (&clean[..dot], &clean[dot + 1..]),
    }
}

/// Drop a `?query` or `#fragment` suffix from an import specifier.
pub fn strip_query(specifier: &str) -> &str {
    let end = specifier.find(['?', '#']).unwrap_or(specifier.len());
    &specifier[..end]
}
