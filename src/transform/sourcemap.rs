// src/transform/sourcemap.rs

//! Source-map stripping, rewriting and loading.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tracing::debug;

use crate::errors::Result;
use crate::fsutil::to_file_uri;
use crate::item::{Item, SourceMap};

/// A `//# sourceMappingURL=` comment on its own line, including the leading
/// newline so stripping does not leave blank lines behind.
static SOURCE_MAPPING_URL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\n//# sourceMappingURL=(.*)$").expect("hard-coded regex")
});

/// Any `//# sourceMappingURL=` comment, used when locating the last
/// reference in a file.
static SOURCE_MAPPING_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//# sourceMappingURL=(.*)$").expect("hard-coded regex"));

/// Remove all sourceMappingURL comments from the item's contents.
pub fn strip_source_mapping_url(item: &mut Item) {
    let contents = item.contents_utf8().into_owned();
    let stripped = SOURCE_MAPPING_URL_LINE.replace_all(&contents, "");
    item.contents = stripped.into_owned().into_bytes();
}

/// Rewrite sourceMappingURL comments to point below `base`, preserving the
/// item's relative directory and the original map file name.
pub fn rewrite_source_mapping_url(item: &mut Item, base: &str) {
    let relative = item.relative_str();
    let dirname = match relative.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::from("."),
    };

    let contents = item.contents_utf8().into_owned();
    let replacement = format!("//# sourceMappingURL={base}/{dirname}/$1");
    let rewritten = SOURCE_MAPPING_URL_LINE.replace_all(&contents, replacement.as_str());
    item.contents = rewritten.into_owned().into_bytes();
}

/// Append a `//# sourceURL=` comment carrying the item's own path, so debug
/// locations map back to the original file.
pub fn append_own_path_source_url(item: &mut Item) {
    let uri = to_file_uri(&item.path);
    item.contents
        .extend_from_slice(format!("\n//# sourceURL={uri}").as_bytes());
}

/// Attach a source map to the item.
///
/// If the item already carries one (or has no contents), this is a no-op.
/// Otherwise the last sourceMappingURL comment is resolved against the
/// item's directory, read and parsed, and the comment is stripped from the
/// contents. Items without any sourceMappingURL comment get a synthesized
/// identity map.
pub fn load_source_map(item: &mut Item) -> Result<()> {
    if item.source_map.is_some() || item.contents.is_empty() {
        return Ok(());
    }

    let contents = item.contents_utf8().into_owned();

    let last_match = SOURCE_MAPPING_URL
        .captures_iter(&contents)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());

    let Some(url) = last_match else {
        item.source_map = Some(SourceMap::identity(&item.relative_str(), &contents));
        return Ok(());
    };

    let stripped = SOURCE_MAPPING_URL_LINE.replace_all(&contents, "");
    item.contents = stripped.into_owned().into_bytes();

    let map_path = item
        .path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&url);
    debug!(path = %map_path.display(), "loading adjacent source map");

    let raw = fs::read_to_string(&map_path)
        .with_context(|| format!("reading source map at {map_path:?}"))?;
    item.source_map = Some(serde_json::from_str(&raw)?);

    Ok(())
}
