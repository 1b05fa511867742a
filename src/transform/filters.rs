// src/transform/filters.rs

//! Batch-level filters and path rewrites.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::Result;
use crate::item::Item;

/// Drop directory entries from a batch, keeping only files.
pub fn skip_directories(items: impl IntoIterator<Item = Item>) -> Vec<Item> {
    items.into_iter().filter(|item| !item.is_dir).collect()
}

/// Drop the first `count` components of the item's relative directory,
/// re-rooting the item directly under its base.
pub fn rebase(item: &mut Item, count: usize) {
    let relative = item.relative().to_path_buf();
    let dirname: PathBuf = match relative.parent() {
        Some(dir) => dir.components().skip(count).collect(),
        None => PathBuf::new(),
    };

    let rebased = match relative.file_name() {
        Some(name) => dirname.join(name),
        None => dirname,
    };
    item.path = item.base.join(rebased);
}

/// Split a batch by predicate: items matching `pred` in the first vector,
/// the rest preserved (in order) in the second so the caller can restore
/// them after an intermediate transform.
pub fn partition<F>(items: Vec<Item>, pred: F) -> (Vec<Item>, Vec<Item>)
where
    F: Fn(&Item) -> bool,
{
    items.into_iter().partition(pred)
}

/// Rule-based filter for pruning vendored dependency trees.
///
/// The rule file is line-based: blank lines and `#` comments are skipped,
/// plain lines name `node_modules` sub-paths to drop, and `!`-prefixed lines
/// re-include sub-paths that a drop rule would otherwise remove.
#[derive(Debug)]
pub struct CleanRules {
    drop: GlobSet,
    keep: GlobSet,
}

impl CleanRules {
    pub fn from_file(rule_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(rule_path)
            .with_context(|| format!("reading clean rules at {rule_path:?}"))?;

        let rules: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        let drop_patterns: Vec<String> = rules
            .iter()
            .filter(|line| !line.starts_with('!'))
            .map(|line| format!("**/node_modules/{line}"))
            .collect();

        let keep_patterns: Vec<String> = rules
            .iter()
            .filter_map(|line| line.strip_prefix('!'))
            .map(|line| format!("**/node_modules/{line}"))
            .collect();

        debug!(
            drop = drop_patterns.len(),
            keep = keep_patterns.len(),
            "compiled clean rules"
        );

        Ok(Self {
            drop: build_globset(&drop_patterns)?,
            keep: build_globset(&keep_patterns)?,
        })
    }

    /// Whether an item with this relative path survives the rules.
    pub fn keeps(&self, rel_path: &str) -> bool {
        self.keep.is_match(rel_path) || !self.drop.is_match(rel_path)
    }

    /// Apply the rules to a batch.
    pub fn apply(&self, items: impl IntoIterator<Item = Item>) -> Vec<Item> {
        items
            .into_iter()
            .filter(|item| self.keeps(&item.relative_str()))
            .collect()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().map_err(anyhow::Error::from)?)
}
