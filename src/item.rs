// src/item.rs

//! The unit of work flowing through stages.
//!
//! An [`Item`] is an opaque file-like value: a storage path (its identity
//! key), the byte contents, and optional metadata a transform may care about
//! (source map, file mode, directory flag). The runners never interpret any
//! of it beyond the path.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A file-like unit of work.
///
/// `path` is the item's identity: the incremental runner's buffer is keyed by
/// it, so two items with the same path coalesce (last write wins).
#[derive(Debug, Clone)]
pub struct Item {
    /// Root directory the relative path is computed against.
    pub base: PathBuf,

    /// Storage path of the item; unique identity key.
    pub path: PathBuf,

    /// Raw byte contents.
    pub contents: Vec<u8>,

    /// Parsed source map, if a transform has attached one.
    pub source_map: Option<SourceMap>,

    /// File mode bits, if a transform has set them (e.g. the executable bit).
    pub mode: Option<u32>,

    /// Whether this entry refers to a directory rather than a file.
    pub is_dir: bool,
}

impl Item {
    pub fn new(
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
            contents: contents.into(),
            source_map: None,
            mode: None,
            is_dir: false,
        }
    }

    /// The identity key used for buffering and deduplication.
    pub fn key(&self) -> &Path {
        &self.path
    }

    /// Path relative to `base`; falls back to the full path when the item
    /// does not live under its base.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }

    /// Relative path as a forward-slash string, for glob matching and
    /// source-map URL construction.
    pub fn relative_str(&self) -> String {
        self.relative().to_string_lossy().replace('\\', "/")
    }

    /// Contents decoded as UTF-8 (lossy).
    pub fn contents_utf8(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }
}

/// Source-map metadata carried alongside an item's contents.
///
/// Field names follow the JSON source-map format (camelCase) so adjacent
/// `.map` files deserialize directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default)]
    pub mappings: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
}

impl SourceMap {
    /// An identity map for an item with no existing source map: the item's
    /// own relative path and contents, no mappings.
    pub fn identity(relative: &str, contents: &str) -> Self {
        Self {
            version: 3,
            sources: vec![relative.to_string()],
            names: Vec::new(),
            mappings: String::new(),
            sources_content: Some(vec![contents.to_string()]),
            file: None,
            source_root: None,
        }
    }
}
