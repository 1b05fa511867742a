#![allow(dead_code)]

use std::path::PathBuf;

use stagepipe::item::{Item, SourceMap};

/// Builder for `Item` to simplify test setup.
pub struct ItemBuilder {
    relative: PathBuf,
    item: Item,
}

impl ItemBuilder {
    /// New file item rooted at `/project` with empty contents.
    pub fn new(path: &str) -> Self {
        let base = PathBuf::from("/project");
        Self {
            relative: PathBuf::from(path),
            item: Item::new(base.clone(), base.join(path), Vec::new()),
        }
    }

    /// Re-root the item at a different base, keeping its relative path.
    pub fn base(mut self, base: &str) -> Self {
        self.item.base = PathBuf::from(base);
        self.item.path = self.item.base.join(&self.relative);
        self
    }

    pub fn contents(mut self, contents: &str) -> Self {
        self.item.contents = contents.as_bytes().to_vec();
        self
    }

    pub fn dir(mut self) -> Self {
        self.item.is_dir = true;
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.item.mode = Some(mode);
        self
    }

    pub fn source_map(mut self, map: SourceMap) -> Self {
        self.item.source_map = Some(map);
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
